use anyhow::{Context, Result};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

pub fn goldkey_home() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".goldkey"))
}

pub fn ensure_goldkey_home() -> Result<PathBuf> {
    let dir = goldkey_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

pub fn read_snapshot(path: &Path) -> Result<Value> {
    let s = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&s).with_context(|| format!("parse {}", path.display()))
}

pub fn write_snapshot(path: &Path, snapshot: &Value) -> Result<()> {
    let s = serde_json::to_string_pretty(snapshot)?;
    fs::write(path, s).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}
