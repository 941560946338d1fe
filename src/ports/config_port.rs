//! Configuration access port.

/// Sectioned key/value settings. Numeric and boolean getters fall back to
/// `default` when a key is absent or malformed.
pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_int(&self, section: &str, key: &str, default: i64) -> i64;
    fn get_double(&self, section: &str, key: &str, default: f64) -> f64;
    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool;

    /// `None` when the key is absent, so callers can tell "unset" from "false".
    fn get_opt_bool(&self, section: &str, key: &str) -> Option<bool> {
        self.get_string(section, key)?;
        Some(self.get_bool(section, key, false))
    }
}

/// Boolean spellings accepted in config files: true/yes/on/1 and false/no/off/0.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}
