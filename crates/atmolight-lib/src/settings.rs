//! Read-only access to the helper's `settings.xml`.
//!
//! The helper keeps its light groups and named static colors in an XML file
//! next to its executable:
//!
//! ```xml
//! <Settings>
//!   <LedLocation><Location>Living room</Location></LedLocation>
//!   <LedStaticColor><Name>Warm white</Name></LedStaticColor>
//! </Settings>
//! ```
//!
//! Lookups never fail: a missing file yields an empty list, and read or parse
//! errors are logged and also yield an empty list.

use std::fmt;
use std::path::{Path, PathBuf};

/// File name of the helper settings, next to the helper executable.
pub const SETTINGS_FILE: &str = "settings.xml";

/// Helper settings errors.
#[derive(Debug)]
pub enum SettingsError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, String),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::Io(p, e) => write!(f, "Cannot read {}: {e}", p.display()),
            SettingsError::Parse(p, e) => write!(f, "Invalid XML in {}: {e}", p.display()),
        }
    }
}

impl std::error::Error for SettingsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SettingsError::Io(_, e) => Some(e),
            SettingsError::Parse(..) => None,
        }
    }
}

/// Location of `settings.xml` for a helper executable path.
pub fn settings_path(helper_path: &Path) -> PathBuf {
    helper_path
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .join(SETTINGS_FILE)
}

/// Collect the text of the first `field` descendant of every `element`.
///
/// Returns `Ok(vec![])` if the file does not exist.
pub fn read_names(path: &Path, element: &str, field: &str) -> Result<Vec<String>, SettingsError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let text =
        std::fs::read_to_string(path).map_err(|e| SettingsError::Io(path.to_path_buf(), e))?;
    let doc = roxmltree::Document::parse(&text)
        .map_err(|e| SettingsError::Parse(path.to_path_buf(), e.to_string()))?;

    Ok(doc
        .descendants()
        .filter(|n| n.has_tag_name(element))
        .filter_map(|n| n.descendants().find(|d| d.has_tag_name(field)))
        .filter_map(|d| d.text())
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect())
}

fn load_or_empty(helper_path: &Path, element: &str, field: &str, what: &str) -> Vec<String> {
    let path = settings_path(helper_path);
    match read_names(&path, element, field) {
        Ok(names) => names,
        Err(e) => {
            log::warn!("could not load {what}: {e}");
            Vec::new()
        }
    }
}

/// Light group names defined in the helper settings.
pub fn load_groups(helper_path: &Path) -> Vec<String> {
    load_or_empty(helper_path, "LedLocation", "Location", "groups")
}

/// Named static colors defined in the helper settings.
pub fn load_static_colors(helper_path: &Path) -> Vec<String> {
    load_or_empty(helper_path, "LedStaticColor", "Name", "static colors")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<Settings>
  <LedLocations>
    <LedLocation><Location>Living room</Location><Lights>1,2</Lights></LedLocation>
    <LedLocation><Location> TV </Location></LedLocation>
    <LedLocation><Location></Location></LedLocation>
  </LedLocations>
  <LedStaticColors>
    <LedStaticColor><Name>Warm white</Name><R>255</R></LedStaticColor>
    <LedStaticColor><Name>Ocean</Name></LedStaticColor>
  </LedStaticColors>
</Settings>"#;

    fn helper_dir_with(contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(SETTINGS_FILE), contents).unwrap();
        let exe = dir.path().join("AtmoHue.exe");
        (dir, exe)
    }

    #[test]
    fn settings_path_is_next_to_helper() {
        let p = settings_path(Path::new("/opt/atmohue/AtmoHue.exe"));
        assert_eq!(p, Path::new("/opt/atmohue/settings.xml"));
    }

    #[test]
    fn loads_groups_in_document_order() {
        let (_dir, exe) = helper_dir_with(SAMPLE);
        assert_eq!(load_groups(&exe), vec!["Living room", "TV"]);
    }

    #[test]
    fn loads_static_colors() {
        let (_dir, exe) = helper_dir_with(SAMPLE);
        assert_eq!(load_static_colors(&exe), vec!["Warm white", "Ocean"]);
    }

    #[test]
    fn missing_file_is_empty_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        assert!(read_names(&path, "LedLocation", "Location").unwrap().is_empty());
        assert!(load_groups(&dir.path().join("AtmoHue.exe")).is_empty());
    }

    #[test]
    fn malformed_xml_is_parse_error() {
        let (_dir, exe) = helper_dir_with("<Settings><LedLocation>");
        let err = read_names(&settings_path(&exe), "LedLocation", "Location").unwrap_err();
        assert!(matches!(err, SettingsError::Parse(..)), "got: {err}");
        // The lenient loaders swallow it
        assert!(load_groups(&exe).is_empty());
        assert!(load_static_colors(&exe).is_empty());
    }
}
