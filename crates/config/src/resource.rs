use serde::Deserialize;
use std::collections::HashMap;

/// Theme and preset used whenever a caller does not name one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Defaults {
    pub theme: String,
    pub preset: String,
}
impl Default for Defaults {
    fn default() -> Self {
        Self { theme: "main".to_string(), preset: "default".to_string() }
    }
}

/// The `[resource]` table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ResourceConfig {
    pub default_theme: String,
    pub default_preset: String,
    /// Asset host per theme, substituted for `%host%` in stored paths.
    pub host: HashMap<String, String>,
}
impl Default for ResourceConfig {
    fn default() -> Self {
        let Defaults { theme, preset } = Defaults::default();
        Self { default_theme: theme, default_preset: preset, host: HashMap::new() }
    }
}
impl ResourceConfig {
    pub fn defaults(&self) -> Defaults {
        Defaults { theme: self.default_theme.clone(), preset: self.default_preset.clone() }
    }
}
