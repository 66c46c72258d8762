//! Plain-text `key = value` configuration store.

use crate::{ConfigError, ConfigValue};
use indexmap::IndexMap;
use serde::Serialize;
use std::path::Path;

/// Ordered, immutable mapping of configuration keys to typed values.
///
/// Built once by the coordinator, then only read. Keys keep the order in
/// which they first appeared in the source.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ConfigStore {
    entries: IndexMap<String, ConfigValue>,
}

impl ConfigStore {
    /// Parse configuration text.
    ///
    /// One `key = value` per line. Blank lines, lines starting with `#`, and
    /// lines without `=` are skipped. The first `=` separates key from value,
    /// and a repeated key overwrites the earlier value.
    pub fn parse(text: &str) -> Self {
        let mut entries = IndexMap::new();

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                continue;
            };

            entries.insert(key.trim().to_string(), ConfigValue::parse(value));
        }

        Self { entries }
    }

    /// Load and parse a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::parse(&text))
    }

    /// Load from an optional path, mapping an absent path to
    /// [`ConfigError::Missing`].
    pub fn load_optional(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Err(ConfigError::Missing),
        }
    }

    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConfigValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Typed accessors used by validation
    // ═══════════════════════════════════════════════════════════════════════

    pub(crate) fn required(&self, key: &'static str) -> Result<&ConfigValue, ConfigError> {
        match self.entries.get(key) {
            Some(value) if !value.is_null() => Ok(value),
            _ => Err(ConfigError::MissingKey(key)),
        }
    }

    pub(crate) fn required_str(&self, key: &'static str) -> Result<&str, ConfigError> {
        let value = self.required(key)?;
        value
            .as_str()
            .ok_or_else(|| ConfigError::invalid(key, "string", value.type_name()))
    }

    pub(crate) fn required_f64(&self, key: &'static str) -> Result<f64, ConfigError> {
        let value = self.required(key)?;
        value
            .as_f64()
            .ok_or_else(|| ConfigError::invalid(key, "number", value.type_name()))
    }

    /// Absent and `none` both read as `None`.
    pub(crate) fn optional_str(&self, key: &'static str) -> Result<Option<String>, ConfigError> {
        match self.entries.get(key) {
            None | Some(ConfigValue::Null) => Ok(None),
            Some(ConfigValue::Str(s)) => Ok(Some(s.clone())),
            // Numeric-looking file names are still names.
            Some(ConfigValue::Int(i)) => Ok(Some(i.to_string())),
            Some(other) => Err(ConfigError::invalid(key, "string", other.type_name())),
        }
    }

    pub(crate) fn optional_f64(&self, key: &'static str, default: f64) -> Result<f64, ConfigError> {
        match self.entries.get(key) {
            None | Some(ConfigValue::Null) => Ok(default),
            Some(value) => value
                .as_f64()
                .ok_or_else(|| ConfigError::invalid(key, "number", value.type_name())),
        }
    }

    pub(crate) fn optional_bool(&self, key: &'static str, default: bool) -> Result<bool, ConfigError> {
        match self.entries.get(key) {
            None | Some(ConfigValue::Null) => Ok(default),
            Some(value) => value
                .as_bool()
                .ok_or_else(|| ConfigError::invalid(key, "bool", value.type_name())),
        }
    }
}

impl FromIterator<(String, ConfigValue)> for ConfigStore {
    fn from_iter<I: IntoIterator<Item = (String, ConfigValue)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = "\
# medium
gasfile = ar_100_5bar_25C.gas
ionfile = IonMobility_Ar+_Ar.txt

voltage = 200
tmax=2000
trackE = 5.5e6
straggle = True
f_charge_hist = none
not a key value line
label = a=b
";

    #[test]
    fn test_parse_skips_comments_and_blank_lines() {
        let store = ConfigStore::parse(SAMPLE);
        assert_eq!(store.len(), 8);
        assert!(!store.contains_key("# medium"));
        assert!(!store.contains_key("not a key value line"));
    }

    #[test]
    fn test_parse_types_values() {
        let store = ConfigStore::parse(SAMPLE);
        assert_eq!(
            store.get("gasfile"),
            Some(&ConfigValue::Str("ar_100_5bar_25C.gas".into()))
        );
        assert_eq!(store.get("voltage"), Some(&ConfigValue::Int(200)));
        assert_eq!(store.get("tmax"), Some(&ConfigValue::Int(2000)));
        assert_eq!(store.get("trackE"), Some(&ConfigValue::Float(5.5e6)));
        assert_eq!(store.get("straggle"), Some(&ConfigValue::Bool(true)));
        assert_eq!(store.get("f_charge_hist"), Some(&ConfigValue::Null));
        // Only the first '=' splits.
        assert_eq!(store.get("label"), Some(&ConfigValue::Str("a=b".into())));
    }

    #[test]
    fn test_parse_preserves_order_and_overwrites() {
        let store = ConfigStore::parse("b = 1\na = 2\nb = 3\n");
        let keys: Vec<_> = store.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(store.get("b"), Some(&ConfigValue::Int(3)));
    }

    #[test]
    fn test_load_missing_source() {
        assert!(matches!(
            ConfigStore::load_optional(None),
            Err(ConfigError::Missing)
        ));
        assert!(matches!(
            ConfigStore::load("/definitely/not/here.txt"),
            Err(ConfigError::Unreadable { .. })
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "n_events = 10\ndrift_mode = MC\n").unwrap();

        let store = ConfigStore::load(file.path()).unwrap();
        assert_eq!(store.get("n_events"), Some(&ConfigValue::Int(10)));
        assert_eq!(store.get("drift_mode"), Some(&ConfigValue::Str("MC".into())));
    }
}
