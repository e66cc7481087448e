//! Process configuration.
//!
//! Holds what the bot needs to reach Discord: the token, the application id
//! and the permission bits requested in the invite link. Loaded once at
//! startup; everything that changes at runtime lives in the component data
//! files instead (see [`crate::components::utils::Data`]).

use std::path::Path;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
pub struct Config {
    pub token: String,
    pub app_id: u64,
    pub permissions: u64,
}

impl Config {
    pub fn load<P: AsRef<Path>>(filepath: P) -> Result<Self, String> {
        let str_config = match std::fs::read_to_string(filepath.as_ref()) {
            Ok(v) => v,
            Err(e) => return Err(format!("Unable to read file {}: {}", filepath.as_ref().to_string_lossy(), e.to_string())),
        };
        let config: Config = match serde_json::from_str(&str_config) {
            Ok(v) => v,
            Err(e) => return Err(format!("Unable to parse {}: {}", filepath.as_ref().to_string_lossy(), e.to_string())),
        };
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_complete_file() {
        let path = std::env::temp_dir().join("ticketio-config-load-test.json");
        std::fs::write(&path, r#"{"token": "abc", "app_id": 42, "permissions": 8}"#).unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.token, "abc");
        assert_eq!(config.app_id, 42);
        assert_eq!(config.permissions, 8);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn load_missing_file() {
        assert!(Config::load("./definitely-not-there.json").is_err());
    }
}
