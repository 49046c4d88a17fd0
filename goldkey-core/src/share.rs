//! Share/export seam. The platform share sheet lives on the host side.

use anyhow::Result;

pub trait ShareTarget {
    fn share(&mut self, text: &str, title: &str) -> Result<()>;
}

impl<F> ShareTarget for F
where
    F: FnMut(&str, &str) -> Result<()>,
{
    fn share(&mut self, text: &str, title: &str) -> Result<()> {
        self(text, title)
    }
}
