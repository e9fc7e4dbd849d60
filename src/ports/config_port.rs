//! Configuration access port trait.

use crate::domain::error::SigtraderError;

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;

    /// `Ok(None)` when the key is absent, `ConfigInvalid` when it is present
    /// but does not parse as a number.
    fn get_double(&self, section: &str, key: &str) -> Result<Option<f64>, SigtraderError>;

    fn get_double_or(&self, section: &str, key: &str, default: f64) -> Result<f64, SigtraderError> {
        Ok(self.get_double(section, key)?.unwrap_or(default))
    }

    /// Trimmed string value, treating a blank value as absent.
    fn get_non_empty(&self, section: &str, key: &str) -> Option<String> {
        self.get_string(section, key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }
}
