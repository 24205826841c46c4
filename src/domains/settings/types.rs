use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Settings record name holding the targets of the Versandtool export
pub const VERSANDTOOL_EXPORTS: &str = "versandtool_exports";

/// Target used when an export does not ask for a specific one
pub const DEFAULT_TARGET: &str = "default";

/// Where one export writes to.
///
/// `file` is the base name of the generated CSV; `remote` is the
/// destination prefix the generated file name is appended to
/// (e.g. `https://transfer.example.org/inbox/` or `file:///srv/outbox/`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportTarget {
    pub file: String,
    pub remote: String,
}

/// Named export targets as stored in the CRM settings table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExportSettings {
    pub targets: HashMap<String, ExportTarget>,
}

impl ExportSettings {
    pub fn target(&self, name: &str) -> Option<&ExportTarget> {
        self.targets.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_settings_value() {
        let raw = r#"{"default": {"file": "versandtool", "remote": "file:///srv/outbox/"}}"#;
        let settings: ExportSettings = serde_json::from_str(raw).unwrap();

        let target = settings.target(DEFAULT_TARGET).unwrap();
        assert_eq!(target.file, "versandtool");
        assert_eq!(target.remote, "file:///srv/outbox/");
        assert!(settings.target("weekly").is_none());
    }
}
