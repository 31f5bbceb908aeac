use showroom_core::{load_env_config, ShowroomConfig};

/// Environment prefix: `SHOWROOM__IMAGES__MAX_BYTES` sets `images.max_bytes`
pub const ENV_PREFIX: &str = "SHOWROOM";

/// Defaults for every key the server reads
pub fn defaults(config: &mut ShowroomConfig) {
    config.set_default("http.host", "127.0.0.1");
    config.set_default("http.port", "3030");
    // comma separated vehicle keys registered at startup
    config.set_default("catalog.owners", "");
    // empty means every write is rejected
    config.set_default("auth.tokens", "");
}

/// Defaults overlaid with `SHOWROOM__*` environment variables
pub fn load() -> ShowroomConfig {
    let mut config = ShowroomConfig::new();
    load_env_config(&mut config, ENV_PREFIX);
    defaults(&mut config);
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_do_not_override_explicit_values() {
        let mut config = ShowroomConfig::new();
        config.set("http.port", "8080");
        defaults(&mut config);

        assert_eq!(config.get("http.port"), Some("8080"));
        assert_eq!(config.get("http.host"), Some("127.0.0.1"));
        assert_eq!(config.get("auth.tokens"), Some(""));
    }
}
