//! Gas mixture identifiers.
//!
//! Gas tables are named after their composition:
//!
//! ```text
//! <gas>_<fraction>[_<gas>_<fraction>...]_<pressure>bar[_<temp>C|K].gas
//! ar_90_co2_10_5bar_25C.gas
//! ```

use crate::ConfigError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Absolute zero offset for Celsius temperatures.
const CELSIUS_OFFSET: f64 = 273.15;

/// Temperature assumed when the file name does not carry one (20 C).
pub const DEFAULT_TEMPERATURE_K: f64 = 293.15;

/// `None` only if the pattern fails to compile.
fn file_name_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(r"^([A-Za-z0-9]+_[0-9]+_){1,6}[0-9]+bar(_[0-9]+[CKck])?\.gas$").ok()
        })
        .as_ref()
}

/// One gas in a mixture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GasComponent {
    /// Lower-cased gas name (`ar`, `co2`, ...).
    pub gas: String,
    /// Fraction in percent.
    pub fraction: f64,
}

/// A gas mixture decoded from its table's file name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GasMixture {
    pub components: Vec<GasComponent>,
    pub pressure_bar: f64,
    pub temperature_k: f64,
}

impl GasMixture {
    /// Check a file name against the naming scheme without decoding it.
    pub fn is_valid_file_name(file_name: &str) -> bool {
        file_name_pattern().is_some_and(|pattern| pattern.is_match(file_name))
    }

    /// Decode a gas table file name.
    pub fn parse(file_name: &str) -> Result<Self, ConfigError> {
        let invalid = || ConfigError::InvalidGasFile(file_name.to_string());

        if !Self::is_valid_file_name(file_name) {
            return Err(invalid());
        }

        let stem = file_name.trim_end_matches(".gas");
        let parts: Vec<&str> = stem.split('_').collect();

        let mut components = Vec::new();
        let mut pressure_bar = None;
        let mut temperature_k = DEFAULT_TEMPERATURE_K;

        let mut i = 0;
        while i < parts.len() {
            let token = parts[i].to_ascii_lowercase();

            if let Some(p) = token.strip_suffix("bar") {
                if p.chars().all(|c| c.is_ascii_digit()) {
                    pressure_bar = Some(p.parse::<f64>().map_err(|_| invalid())?);
                    i += 1;
                    continue;
                }
            }

            // Temperature only ever follows the pressure.
            if pressure_bar.is_some() {
                if let Some(t) = token.strip_suffix('c') {
                    temperature_k = t.parse::<f64>().map_err(|_| invalid())? + CELSIUS_OFFSET;
                } else if let Some(t) = token.strip_suffix('k') {
                    temperature_k = t.parse::<f64>().map_err(|_| invalid())?;
                } else {
                    return Err(invalid());
                }
                i += 1;
                continue;
            }

            let fraction = parts
                .get(i + 1)
                .ok_or_else(invalid)?
                .parse::<f64>()
                .map_err(|_| invalid())?;
            components.push(GasComponent {
                gas: token,
                fraction,
            });
            i += 2;
        }

        Ok(Self {
            components,
            pressure_bar: pressure_bar.ok_or_else(invalid)?,
            temperature_k,
        })
    }

    /// Sum of component fractions, in percent.
    pub fn total_fraction(&self) -> f64 {
        self.components.iter().map(|c| c.fraction).sum()
    }
}
