//! Flat, string-keyed parameter sets.
//!
//! Component configurations are typed records with defaults; a
//! [`ParameterSet`] is the loosely typed form they are read from and written
//! to, using the parameter names of the processor configuration scripts
//! (`MinimumPE`, `SearchConeDepth`, ...). Missing keys fall back to the
//! component default, so any subset may be overridden.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Result type for configuration parsing.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Mapping from parameter name to a number or string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSet(Map<String, Value>);

impl ParameterSet {
    /// Creates an empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a parameter, replacing any previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }

    /// Builder form of [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Whether a parameter is present.
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Parameter names, in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no parameters are set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Floating point parameter.
    pub fn get_f64(&self, name: &str, default: f64) -> ConfigResult<f64> {
        match self.0.get(name) {
            None => Ok(default),
            Some(value) => value.as_f64().ok_or_else(|| wrong_type(name, "a number")),
        }
    }

    /// Integer parameter. Whole-valued floats such as `3.0` are accepted.
    #[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
    pub fn get_int(&self, name: &str, default: i64) -> ConfigResult<i64> {
        match self.0.get(name) {
            None => Ok(default),
            Some(value) => {
                if let Some(int) = value.as_i64() {
                    return Ok(int);
                }
                match value.as_f64() {
                    Some(float) if float.trunc() == float && float.abs() < 9.0e15 => {
                        Ok(float as i64)
                    }
                    _ => Err(wrong_type(name, "an integer")),
                }
            }
        }
    }

    /// String parameter.
    pub fn get_string(&self, name: &str, default: &str) -> ConfigResult<String> {
        match self.0.get(name) {
            None => Ok(default.to_string()),
            Some(Value::String(s)) => Ok(s.clone()),
            Some(_) => Err(wrong_type(name, "a string")),
        }
    }

    /// Floating point parameter that must not be negative.
    pub fn get_non_negative(&self, name: &str, default: f64) -> ConfigResult<f64> {
        let value = self.get_f64(name, default)?;
        if value < 0.0 || value.is_nan() {
            return Err(ConfigError::Negative {
                name: name.to_string(),
                value,
            });
        }
        Ok(value)
    }

    /// Count or threshold that must not be negative.
    #[allow(clippy::cast_precision_loss)]
    pub fn get_count(&self, name: &str, default: u32) -> ConfigResult<u32> {
        let value = self.get_int(name, i64::from(default))?;
        u32::try_from(value).map_err(|_| {
            if value < 0 {
                ConfigError::Negative {
                    name: name.to_string(),
                    value: value as f64,
                }
            } else {
                wrong_type(name, "a 32-bit count")
            }
        })
    }

    /// Count that must be strictly positive.
    #[allow(clippy::cast_precision_loss)]
    pub fn get_positive_count(&self, name: &str, default: u32) -> ConfigResult<u32> {
        let value = self.get_int(name, i64::from(default))?;
        if value <= 0 {
            return Err(ConfigError::NotPositive {
                name: name.to_string(),
                value: value as f64,
            });
        }
        self.get_count(name, default)
    }

    /// Fraction in `[0, 1]`.
    pub fn get_fraction(&self, name: &str, default: f64) -> ConfigResult<f64> {
        let value = self.get_f64(name, default)?;
        if !(0.0..=1.0).contains(&value) {
            return Err(ConfigError::FractionOutOfRange {
                name: name.to_string(),
                value,
            });
        }
        Ok(value)
    }
}

impl FromIterator<(String, Value)> for ParameterSet {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn wrong_type(name: &str, expected: &'static str) -> ConfigError {
    ConfigError::WrongType {
        name: name.to_string(),
        expected,
    }
}
