//! Auto-typed configuration values.

use serde::Serialize;
use std::fmt;

/// A single configuration value.
///
/// Values are typed from their text when the store is parsed; see
/// [`ConfigValue::parse`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl ConfigValue {
    /// Type a raw value string.
    ///
    /// `none` is null, `true`/`false` are booleans (case-insensitive).
    /// Text containing `.`, `e` or `E` is tried as a float, anything else
    /// as an integer. Whatever fails to parse stays a string.
    pub fn parse(raw: &str) -> Self {
        let v = raw.trim();
        let lower = v.to_ascii_lowercase();

        match lower.as_str() {
            "none" => return ConfigValue::Null,
            "true" => return ConfigValue::Bool(true),
            "false" => return ConfigValue::Bool(false),
            _ => {}
        }

        if lower.contains('.') || lower.contains('e') {
            if let Ok(f) = v.parse::<f64>() {
                return ConfigValue::Float(f);
            }
        } else if let Ok(i) = v.parse::<i64>() {
            return ConfigValue::Int(i);
        }

        ConfigValue::Str(v.to_string())
    }

    /// Name of the value's type, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            ConfigValue::Null => "none",
            ConfigValue::Bool(_) => "bool",
            ConfigValue::Int(_) => "int",
            ConfigValue::Float(_) => "float",
            ConfigValue::Str(_) => "string",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ConfigValue::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ConfigValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view; integers widen to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ConfigValue::Int(i) => Some(*i as f64),
            ConfigValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Null => write!(f, "None"),
            ConfigValue::Bool(b) => write!(f, "{}", b),
            ConfigValue::Int(i) => write!(f, "{}", i),
            ConfigValue::Float(x) => write!(f, "{}", x),
            ConfigValue::Str(s) => write!(f, "{}", s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keywords() {
        assert_eq!(ConfigValue::parse("none"), ConfigValue::Null);
        assert_eq!(ConfigValue::parse(" None "), ConfigValue::Null);
        assert_eq!(ConfigValue::parse("TRUE"), ConfigValue::Bool(true));
        assert_eq!(ConfigValue::parse("False"), ConfigValue::Bool(false));
    }

    #[test]
    fn test_parse_numbers() {
        assert_eq!(ConfigValue::parse("100"), ConfigValue::Int(100));
        assert_eq!(ConfigValue::parse("-3"), ConfigValue::Int(-3));
        assert_eq!(ConfigValue::parse("2000.0"), ConfigValue::Float(2000.0));
        assert_eq!(ConfigValue::parse("5.5e6"), ConfigValue::Float(5.5e6));
        assert_eq!(ConfigValue::parse("1E3"), ConfigValue::Float(1000.0));
    }

    #[test]
    fn test_parse_strings() {
        // Contains an 'e' but is not a float.
        assert_eq!(
            ConfigValue::parse("Alpha_Ar_5bar.txt"),
            ConfigValue::Str("Alpha_Ar_5bar.txt".into())
        );
        assert_eq!(ConfigValue::parse("MC"), ConfigValue::Str("MC".into()));
        assert_eq!(ConfigValue::parse("12abc"), ConfigValue::Str("12abc".into()));
    }

    #[test]
    fn test_numeric_view() {
        assert_eq!(ConfigValue::Int(4).as_f64(), Some(4.0));
        assert_eq!(ConfigValue::Float(0.5).as_f64(), Some(0.5));
        assert_eq!(ConfigValue::Str("x".into()).as_f64(), None);
        assert_eq!(ConfigValue::Float(0.5).as_int(), None);
    }
}
