//! # Showroom Configuration
//!
//! A minimal string key/value store. Keys are dotted
//! (`images.max_slots`, `http.port`), values are plain strings and are
//! parsed on read through a [`ShowroomConfigSnapshot`].
//!
//! ```rust
//! use showroom_core::ShowroomConfig;
//! let mut config = ShowroomConfig::new();
//!
//! config.set("images.max_slots", "5");
//! assert_eq!(config.snapshot().get_usize("images.max_slots"), Some(5));
//! ```
//!
//! ## Environment overrides
//!
//! [`load_env_config`] maps `PREFIX__A__B=value` onto key `a.b`:
//!
//! ```bash
//! export SHOWROOM__IMAGES__MAX_BYTES=1048576
//! ```

use std::collections::HashMap;

#[derive(Debug, Default, Clone)]
pub struct ShowroomConfig {
    values: HashMap<String, String>,
}

impl ShowroomConfig {
    /// Create an empty config store.
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    /// Set a configuration key to a string value.
    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.values.insert(key.into(), value.into());
    }

    /// Set a key only when it is not present yet.
    pub fn set_default<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.values.entry(key.into()).or_insert_with(|| value.into());
    }

    /// Get a configuration value by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }

    /// Check whether a key is present.
    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn snapshot(&self) -> ShowroomConfigSnapshot {
        ShowroomConfigSnapshot::new(self.values.clone())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ShowroomConfigSnapshot {
    map: HashMap<String, String>,
}

impl ShowroomConfigSnapshot {
    pub(crate) fn new(map: HashMap<String, String>) -> Self {
        Self { map }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(|s| s.as_str())
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    pub fn get_usize(&self, key: &str) -> Option<usize> {
        self.get(key).and_then(|v| v.trim().parse::<usize>().ok())
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(|v| v.trim().parse::<u64>().ok())
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|v| v.trim().parse::<bool>().ok())
    }
}

/// Copy `PREFIX__A__B=value` environment variables into `config` as `a.b`.
pub fn load_env_config(config: &mut ShowroomConfig, prefix: &str) {
    load_vars(config, prefix, std::env::vars());
}

fn load_vars<I>(config: &mut ShowroomConfig, prefix: &str, vars: I)
where
    I: IntoIterator<Item = (String, String)>,
{
    let prefix = format!("{prefix}__");
    for (key, value) in vars {
        if let Some(stripped) = key.strip_prefix(&prefix) {
            let normalized = stripped.to_lowercase().replace("__", ".");
            config.set(normalized, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_style_keys_are_normalized() {
        let mut config = ShowroomConfig::new();
        load_vars(
            &mut config,
            "SHOWROOM",
            vec![
                ("SHOWROOM__IMAGES__MAX_SLOTS".to_string(), "3".to_string()),
                ("SHOWROOM__HTTP__PORT".to_string(), "8080".to_string()),
                ("OTHER__HTTP__PORT".to_string(), "1".to_string()),
            ],
        );

        let snap = config.snapshot();
        assert_eq!(snap.get_usize("images.max_slots"), Some(3));
        assert_eq!(snap.get("http.port"), Some("8080"));
        assert_eq!(config.values.len(), 2);
    }

    #[test]
    fn set_default_does_not_override() {
        let mut config = ShowroomConfig::new();
        config.set("http.port", "9000");
        config.set_default("http.port", "3030");
        config.set_default("http.host", "127.0.0.1");
        assert_eq!(config.get("http.port"), Some("9000"));
        assert_eq!(config.get("http.host"), Some("127.0.0.1"));
    }

    #[test]
    fn typed_getters_reject_garbage() {
        let mut config = ShowroomConfig::new();
        config.set("images.max_bytes", "lots");
        config.set("flag", "true");
        let snap = config.snapshot();
        assert_eq!(snap.get_u64("images.max_bytes"), None);
        assert_eq!(snap.get_bool("flag"), Some(true));
        assert!(config.has("flag"));
    }
}
