//! Customer intake record.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Gender {
    #[default]
    #[serde(rename = "")]
    Unset,
    #[serde(rename = "male")]
    Male,
    #[serde(rename = "female")]
    Female,
}

impl Gender {
    /// Parse the stored tag. Anything but `male`/`female` is `None`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "" => Some(Gender::Unset),
            "male" => Some(Gender::Male),
            "female" => Some(Gender::Female),
            _ => None,
        }
    }
}

/// One customer per session. Every field is free text.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomerRecord {
    pub name: String,
    pub job: String,
    pub phone: String,
    pub birth_year: String,
    pub gender: Gender,
    pub subscription_date: String,
}

/// Partial update for [`CustomerRecord`]. `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerPatch {
    pub name: Option<String>,
    pub job: Option<String>,
    pub phone: Option<String>,
    pub birth_year: Option<String>,
    pub gender: Option<Gender>,
    pub subscription_date: Option<String>,
}

impl CustomerPatch {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn job(mut self, job: impl Into<String>) -> Self {
        self.job = Some(job.into());
        self
    }

    pub fn phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn gender(mut self, gender: Gender) -> Self {
        self.gender = Some(gender);
        self
    }
}

impl CustomerRecord {
    pub fn merged(&self, patch: &CustomerPatch) -> Self {
        let pick = |new: &Option<String>, old: &String| new.clone().unwrap_or_else(|| old.clone());
        Self {
            name: pick(&patch.name, &self.name),
            job: pick(&patch.job, &self.job),
            phone: pick(&patch.phone, &self.phone),
            birth_year: pick(&patch.birth_year, &self.birth_year),
            gender: patch.gender.unwrap_or(self.gender),
            subscription_date: pick(&patch.subscription_date, &self.subscription_date),
        }
    }
}
