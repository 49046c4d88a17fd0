use anyhow::{Context, Result};
use chrono::Duration;
use chrono_tz::Tz;
use goldkey_core::FeatureFlags;
use goldkey_core::store::{DEFAULT_PUBLISH_DELAY_MS, DEFAULT_SHARE_TITLE, StoreSettings};
use goldkey_upload::{DEFAULT_DOC_TYPE, UploadSettings};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::state::ensure_goldkey_home;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub features: FeatureFlags,
    pub report: ReportSection,
    pub upload: UploadSection,
    pub calendar: CalendarSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSection {
    pub publish_delay_ms: i64,
    pub share_title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadSection {
    pub api_endpoint: String,
    /// Sent as X-API-Key; leave empty for an open endpoint.
    pub api_key: String,
    pub insurer: String,
    pub doc_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarSection {
    /// IANA zone used to place 09:00 due-date events.
    pub timezone: String,
}

impl Default for ReportSection {
    fn default() -> Self {
        Self {
            publish_delay_ms: DEFAULT_PUBLISH_DELAY_MS,
            share_title: DEFAULT_SHARE_TITLE.to_string(),
        }
    }
}

impl Default for UploadSection {
    fn default() -> Self {
        let base = UploadSettings::default();
        Self {
            api_endpoint: base.api_endpoint,
            api_key: base.api_key,
            insurer: base.insurer,
            doc_type: DEFAULT_DOC_TYPE.to_string(),
        }
    }
}

impl Default for CalendarSection {
    fn default() -> Self {
        Self {
            timezone: "Asia/Seoul".to_string(),
        }
    }
}

impl Config {
    pub fn store_settings(&self) -> StoreSettings {
        StoreSettings {
            publish_delay: Duration::milliseconds(self.report.publish_delay_ms.max(0)),
            share_title: self.report.share_title.clone(),
        }
    }

    pub fn upload_settings(&self) -> UploadSettings {
        UploadSettings {
            api_endpoint: self.upload.api_endpoint.clone(),
            api_key: self.upload.api_key.clone(),
            insurer: self.upload.insurer.clone(),
        }
    }

    pub fn timezone(&self) -> Result<Tz> {
        self.calendar
            .timezone
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid timezone: {}", self.calendar.timezone))
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_goldkey_home()?.join("config.toml"))
}

pub fn load_config() -> Result<Config> {
    let p = config_path()?;
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    toml::from_str(&s).context("parse config.toml")
}

pub fn save_config(cfg: &Config) -> Result<()> {
    let p = config_path()?;
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_config(&Config::default())?;
    println!("Wrote {}", p.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let cfg: Config = toml::from_str(
            r#"
[features]
calendar_sync_enabled = true

[upload]
api_key = "k"
"#,
        )
        .unwrap();
        assert!(cfg.features.calendar_sync_enabled);
        assert!(cfg.features.report_enabled);
        assert_eq!(cfg.upload.api_key, "k");
        assert_eq!(cfg.upload.doc_type, DEFAULT_DOC_TYPE);
        assert_eq!(cfg.report.publish_delay_ms, 600);
        assert_eq!(cfg.timezone().unwrap(), chrono_tz::Asia::Seoul);
    }

    #[test]
    fn default_config_round_trips_through_toml() {
        let s = toml::to_string_pretty(&Config::default()).unwrap();
        let back: Config = toml::from_str(&s).unwrap();
        assert_eq!(back.upload.api_endpoint, Config::default().upload.api_endpoint);
        assert_eq!(back.features, FeatureFlags::default());
    }

    #[test]
    fn negative_delay_is_clamped() {
        let mut cfg = Config::default();
        cfg.report.publish_delay_ms = -5;
        assert_eq!(cfg.store_settings().publish_delay, Duration::zero());
    }
}
