use crate::config::Config;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use log::info;
use std::fs::File;
use std::path::Path;

/// Load and parse configuration from a YAML file
pub fn load_config(config_path: &Path) -> Result<Config> {
    info!("Loading configuration from: {:?}", config_path);

    let file = File::open(config_path)
        .wrap_err_with(|| format!("Failed to open configuration file {:?}", config_path))?;

    let config: Config = serde_yaml::from_reader(file)
        .wrap_err_with(|| format!("Failed to parse configuration file {:?}", config_path))?;

    config.validate()?;

    Ok(config)
}

/// Load the given file, or fall back to the built-in defaults
pub fn load_or_default(config_path: Option<&Path>) -> Result<Config> {
    match config_path {
        Some(path) => load_config(path),
        None => {
            info!("No configuration file given, using defaults");
            Ok(Config::default())
        }
    }
}

/// CLI arguments that can override YAML settings
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub duration_secs: Option<f64>,
    pub node_count: Option<usize>,
}

/// Apply CLI overrides to a configuration
pub fn apply_overrides(config: &mut Config, overrides: &CliOverrides) -> Result<()> {
    if let Some(duration) = overrides.duration_secs {
        info!("Overriding probe duration: {}s", duration);
        config.probe.duration_secs = duration;
    }

    if let Some(nodes) = overrides.node_count {
        info!("Overriding consensus node count: {}", nodes);
        config.consensus.node_count = nodes;
    }

    // Re-validate after applying overrides
    config.validate()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_file() {
        let yaml = r#"
general:
  log_level: debug
consensus:
  node_count: 7
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", yaml).unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.general.log_level.as_deref(), Some("debug"));
        assert_eq!(config.consensus.node_count, 7);
        assert_eq!(config.probe.speed_test.bytes, 10_000_000);
    }

    #[test]
    fn test_load_invalid_config_fails() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "consensus:\n  node_count: 0\n").unwrap();
        assert!(load_config(temp_file.path()).is_err());

        assert!(load_config(Path::new("/nonexistent/verifi.yaml")).is_err());
    }

    #[test]
    fn test_load_or_default() {
        let config = load_or_default(None).unwrap();
        assert_eq!(config.consensus.node_count, 3);
    }

    #[test]
    fn test_apply_overrides() {
        let mut config = Config::default();
        let overrides = CliOverrides {
            duration_secs: Some(2.0),
            node_count: Some(5),
        };
        apply_overrides(&mut config, &overrides).unwrap();
        assert_eq!(config.probe.duration_secs, 2.0);
        assert_eq!(config.consensus.node_count, 5);

        let invalid = CliOverrides {
            duration_secs: None,
            node_count: Some(0),
        };
        assert!(apply_overrides(&mut config, &invalid).is_err());
    }
}
