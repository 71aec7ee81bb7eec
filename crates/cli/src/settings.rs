use std::path::Path;

use anyhow::{Context, Result};
use hotspot_core::manager::ReportOptions;
use serde::{Deserialize, Serialize};

/// Settings section name when the file holds editor-style settings.
pub const SECTION: &str = "codewindProfiling";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Directory under each project that holds load-test results.
    pub profiling_folder: String,
    /// When off, every request yields no diagnostics.
    pub show_profiling: bool,
    /// Root of the profiled application inside its container.
    pub app_root: String,
    #[serde(flatten)]
    pub report: ReportOptions,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            profiling_folder: "load-test".to_string(),
            show_profiling: true,
            app_root: "/app/".to_string(),
            report: ReportOptions::default(),
        }
    }
}

impl Settings {
    /// Parse settings JSON, either bare or nested under `codewindProfiling`.
    /// Missing keys keep their defaults.
    pub fn from_json(data: &[u8]) -> Result<Self> {
        let mut value: serde_json::Value = serde_json::from_slice(data)?;
        if let Some(section) = value.get_mut(SECTION) {
            value = section.take();
        }
        Ok(serde_json::from_value(value)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)
            .with_context(|| format!("reading settings from {}", path.display()))?;
        Self::from_json(&data).with_context(|| format!("parsing settings in {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use hotspot_core::report::HotspotSort;

    use super::*;

    #[test]
    fn defaults() {
        let s = Settings::from_json(b"{}").unwrap();
        assert_eq!(s, Settings::default());
        assert_eq!(s.profiling_folder, "load-test");
        assert!(s.show_profiling);
        assert!(s.report.related_information);
    }

    #[test]
    fn nested_section_is_used() {
        let s = Settings::from_json(
            br#"{"codewindProfiling": {"profilingFolder": "perf", "showProfiling": false, "sort": "line"}}"#,
        )
        .unwrap();
        assert_eq!(s.profiling_folder, "perf");
        assert!(!s.show_profiling);
        assert_eq!(s.report.sort, HotspotSort::Line);
    }

    #[test]
    fn flat_keys_are_accepted() {
        let s = Settings::from_json(br#"{"appRoot": "/srv/", "relatedInformation": false}"#).unwrap();
        assert_eq!(s.app_root, "/srv/");
        assert!(!s.report.related_information);
    }

    #[test]
    fn bad_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Settings::load(&dir.path().join("missing.json")).is_err());
        let path = dir.path().join("bad.json");
        std::fs::write(&path, b"{ nope").unwrap();
        assert!(Settings::load(&path).is_err());
    }
}
