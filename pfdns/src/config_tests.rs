#[cfg(test)]
mod tests {
    use std::io::Write;

    use tracing::level_filters::LevelFilter;

    use super::super::{ConfigError, LogLevel, ResolverConfig, load_config, parse_config};

    const FULL: &str = r#"
[server]
ip = "127.0.0.1"
port = 5353
log_level = "debug"
timeout_ms = 500

[database]
path = "/var/lib/pf/pf.db"
pool_size = 4

[resolver.forwarder]
upstreams = ["1.1.1.1:53", "[2606:4700:4700::1111]:53"]

[pfdns]
enforcement = true
redirect_to = "192.0.2.1"
blackhole = ["sinkhole.example.", "10.9.9.9"]

[blackhole]
enabled = true
"#;

    #[test]
    fn test_parse_full_config() {
        let config = parse_config(FULL).unwrap();

        assert_eq!(config.server.ip, "127.0.0.1");
        assert_eq!(config.server.port, 5353);
        assert_eq!(config.server.log_level, LogLevel::Debug);
        assert_eq!(config.server.timeout_ms, 500);
        assert_eq!(config.database.path, "/var/lib/pf/pf.db");
        assert_eq!(config.database.pool_size, 4);

        let ResolverConfig::Forwarder { upstreams } = &config.resolver;
        assert_eq!(upstreams.len(), 2);

        let pfdns = config.pfdns.unwrap();
        assert!(pfdns.enforcement);
        assert_eq!(pfdns.redirect_to, "192.0.2.1");
        assert_eq!(
            pfdns.blackhole,
            Some(vec!["sinkhole.example.".to_string(), "10.9.9.9".to_string()])
        );

        assert!(config.blackhole.enabled);
        assert_eq!(config.blackhole.cname, "localhost.localdomain.");
        assert_eq!(config.blackhole.address, "127.0.0.1");
    }

    #[test]
    fn test_defaults() {
        let config = parse_config("[pfdns]\nredirect_to = \"10.0.0.1\"\n").unwrap();

        assert_eq!(config.server.ip, "0.0.0.0");
        assert_eq!(config.server.port, 53);
        assert_eq!(config.server.log_level, LogLevel::Info);
        assert_eq!(config.server.timeout_ms, 2000);
        assert_eq!(config.database.pool_size, 16);
        assert!(!config.blackhole.enabled);

        let pfdns = config.pfdns.unwrap();
        assert!(!pfdns.enforcement);
        assert!(pfdns.blackhole.is_none());
    }

    #[test]
    fn test_missing_pfdns_section_parses() {
        // rejected later, when the policy is built
        let config = parse_config("").unwrap();
        assert!(config.pfdns.is_none());
    }

    #[test]
    fn test_decode_error() {
        let err = parse_config("[server]\nport = \"fifty-three\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Decode(_)));

        let err = parse_config("[pfdns]\nenforcement = true\n").unwrap_err();
        assert!(matches!(err, ConfigError::Decode(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FULL.as_bytes()).unwrap();

        let config = load_config(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.server.port, 5353);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");

        let err = load_config(path.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_level_filter() {
        assert_eq!(LevelFilter::from(LogLevel::Warn), LevelFilter::WARN);
    }

    #[test]
    fn test_example_config_builds_a_policy() {
        let config = parse_config(include_str!("../config.example.toml")).unwrap();
        let policy = crate::policy::EnforcementPolicy::from_config(config.pfdns.as_ref()).unwrap();

        assert!(policy.enforcement_enabled);
        assert!(policy.blackhole.is_some());
        assert!(crate::policy::BlackholeTarget::from_config(&config.blackhole).unwrap().is_none());
    }
}
