use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{BursarError, Result};
use crate::months::{validate_session, AcademicYear};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub data_dir: String,
    #[serde(default)]
    pub school_id: String,
    #[serde(default)]
    pub school_name: String,
    #[serde(default = "default_session_start_month")]
    pub session_start_month: String,
    #[serde(default)]
    pub current_session: Option<String>,
}

fn default_session_start_month() -> String {
    "04".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir().to_string_lossy().to_string(),
            school_id: String::new(),
            school_name: String::new(),
            session_start_month: default_session_start_month(),
            current_session: None,
        }
    }
}

impl Settings {
    pub fn academic_year(&self) -> Result<AcademicYear> {
        AcademicYear::from_setting(&self.session_start_month)
    }

    /// An explicit session wins, then the configured one, then the session containing `today`.
    pub fn session_or_default(&self, explicit: Option<&str>, today: NaiveDate) -> Result<String> {
        let session = match explicit.or(self.current_session.as_deref()) {
            Some(s) => s.to_string(),
            None => self.academic_year()?.session_for(today),
        };
        validate_session(&session)?;
        Ok(session)
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("bursar")
}

fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Documents")
        .join("bursar")
}

pub fn load_settings() -> Settings {
    let path = settings_path();
    if path.exists() {
        let content = std::fs::read_to_string(&path).unwrap_or_default();
        serde_json::from_str(&content).unwrap_or_default()
    } else {
        Settings::default()
    }
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    let dir = config_dir();
    std::fs::create_dir_all(&dir)?;
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| BursarError::Settings(e.to_string()))?;
    std::fs::write(settings_path(), format!("{json}\n"))?;
    Ok(())
}

pub fn get_data_dir() -> PathBuf {
    PathBuf::from(&load_settings().data_dir)
}

pub fn db_path() -> PathBuf {
    get_data_dir().join("bursar.db")
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    std::fs::canonicalize(path)
        .unwrap_or_else(|_| PathBuf::from(path))
        .to_string_lossy()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::months::AcademicMonth;

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = Settings {
            data_dir: "/tmp/test".to_string(),
            school_id: "SCH-01".to_string(),
            school_name: "Hillside".to_string(),
            session_start_month: "07".to_string(),
            current_session: Some("2024-25".to_string()),
        };
        let json = serde_json::to_string_pretty(&settings).unwrap();
        std::fs::write(&path, &json).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        let loaded: Settings = serde_json::from_str(&content).unwrap();
        assert_eq!(loaded.school_id, "SCH-01");
        assert_eq!(loaded.session_start_month, "07");
        assert_eq!(loaded.current_session.as_deref(), Some("2024-25"));
    }

    #[test]
    fn test_load_merges_with_defaults() {
        let json = r#"{"data_dir": "/tmp/test"}"#;
        let s: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(s.session_start_month, "04");
        assert!(s.school_id.is_empty());
        assert!(s.current_session.is_none());
        assert_eq!(s.academic_year().unwrap().start, AcademicMonth::April);
    }

    #[test]
    fn test_session_resolution_order() {
        let today = NaiveDate::from_ymd_opt(2025, 2, 10).unwrap();
        let mut s = Settings::default();
        assert_eq!(s.session_or_default(None, today).unwrap(), "2024-25");
        s.current_session = Some("2023-24".to_string());
        assert_eq!(s.session_or_default(None, today).unwrap(), "2023-24");
        assert_eq!(s.session_or_default(Some("2025-26"), today).unwrap(), "2025-26");
        assert!(s.session_or_default(Some("2025"), today).is_err());
    }
}
