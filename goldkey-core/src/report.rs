//! Consultation report text.
//!
//! Pure string templating. The only branching is the two default
//! substitutions: missing name/job/generation fall back to fixed labels, and
//! a non-positive gap renders as a "needs further check" placeholder.

use crate::generation::Generation;

pub const REPORT_HEADER: &str = "[GoldKey AI Consultation Report]";
pub const DEFAULT_PERSON_LABEL: &str = "customer";
pub const UNCONFIRMED_LABEL: &str = "unconfirmed";
pub const GAP_PLACEHOLDER: &str = "needs further check";

/// Everything the renderer reads, captured at the moment generation is requested.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportInputs {
    pub name: String,
    pub job: String,
    pub generation: Generation,
    pub hoffmann_gap: i64,
}

/// Group an integer with commas every three digits: `18447` -> `18,447`.
pub fn group_thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

pub fn gap_text(hoffmann_gap: i64) -> String {
    if hoffmann_gap > 0 {
        format!("approx. {} x 10,000 KRW", group_thousands(hoffmann_gap))
    } else {
        GAP_PLACEHOLDER.to_string()
    }
}

fn or_default<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.is_empty() { fallback } else { value }
}

pub fn render_report(inputs: &ReportInputs) -> String {
    let name = or_default(&inputs.name, DEFAULT_PERSON_LABEL);
    let job = or_default(&inputs.job, DEFAULT_PERSON_LABEL);
    let generation = inputs.generation.label().unwrap_or(UNCONFIRMED_LABEL);
    let gap = gap_text(inputs.hoffmann_gap);

    let mut s = String::new();
    s.push_str(REPORT_HEADER);
    s.push_str("\n\n");
    s.push_str(&format!("Hello, {name}.\n\n"));
    s.push_str(&format!("Occupation: {job}\n"));
    s.push_str(&format!("Indemnity generation: {generation}\n"));
    s.push_str(&format!("Coverage gap (Hoffmann present value): {gap}\n\n"));
    s.push_str(&format!(
        "Your current {generation} indemnity policy has its own coverage scope and deductible structure.\n"
    ));
    s.push_str(&format!(
        "Given a coverage gap of {gap}, now is the time to review additional coverage.\n\n"
    ));
    s.push_str("Recommended actions:\n");
    s.push_str("1. Review switching indemnity plans or adding a supplementary product\n");
    s.push_str("2. Re-check that premiums are proportionate to income\n");
    s.push_str("3. Confirm any remaining diagnosis-coverage gaps\n\n");
    s.push_str("Contact: your GoldKey partner agent\n");
    s.push_str("──────────────────────");
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1_000), "1,000");
        assert_eq!(group_thousands(18_447), "18,447");
        assert_eq!(group_thousands(1_234_567), "1,234,567");
        assert_eq!(group_thousands(-4_500), "-4,500");
    }

    #[test]
    fn defaults_when_fields_absent() {
        let text = render_report(&ReportInputs::default());
        assert!(text.starts_with(REPORT_HEADER));
        assert!(text.contains("Hello, customer."));
        assert!(text.contains("Occupation: customer"));
        assert!(text.contains("Indemnity generation: unconfirmed"));
        assert!(text.contains("Hoffmann present value): needs further check"));
    }

    #[test]
    fn renders_filled_fields() {
        let text = render_report(&ReportInputs {
            name: "Kim Minji".into(),
            job: "nurse".into(),
            generation: Generation::Gen3,
            hoffmann_gap: 18_447,
        });
        assert!(text.contains("Hello, Kim Minji."));
        assert!(text.contains("Occupation: nurse"));
        assert!(text.contains("3rd generation (good-value indemnity)"));
        assert!(text.contains("approx. 18,447 x 10,000 KRW"));
        assert!(!text.contains(GAP_PLACEHOLDER));
    }

    #[test]
    fn rendering_is_deterministic() {
        let inputs = ReportInputs {
            name: "Lee".into(),
            hoffmann_gap: 5,
            ..Default::default()
        };
        assert_eq!(render_report(&inputs), render_report(&inputs));
    }
}
