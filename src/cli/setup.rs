use crate::core::config::AppConfig;
use anyhow::{Context, Result};
use std::path::Path;

const EXAMPLE_CONFIG: &str = include_str!("../../docs/example_config.yaml");

pub fn setup() -> Result<()> {
    setup_at_path(AppConfig::default_config_path()?)
}

/// Writes the example config to `path`. An existing file is never overwritten.
pub fn setup_at_path<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();

    if path.exists() {
        anyhow::bail!("Configuration file already exists at {}", path.display());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    std::fs::write(path, EXAMPLE_CONFIG)
        .with_context(|| format!("Failed to write config file to {}", path.display()))?;

    tracing::info!("Created default configuration at {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_setup_creates_config_file() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("nested").join("config.yaml");

        setup_at_path(&config_path)?;

        assert!(config_path.exists());
        let content = fs::read_to_string(&config_path)?;
        assert!(content.contains("symbols:"));
        assert!(content.contains("providers:"));
        assert!(content.contains("# Example configuration file for xret"));

        Ok(())
    }

    #[test]
    fn test_setup_fails_if_config_exists() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("config.yaml");

        std::fs::write(&config_path, "test")?;

        let result = setup_at_path(&config_path);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("already exists"));

        Ok(())
    }

    #[test]
    fn test_written_config_matches_builtin_defaults() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("config.yaml");
        setup_at_path(&config_path)?;

        let written = AppConfig::load_from_path(&config_path)?;
        let defaults = AppConfig::default();

        assert_eq!(written.symbols, defaults.symbols);
        assert_eq!(written.concurrent, defaults.concurrent);
        assert_eq!(written.persist, defaults.persist);
        assert_eq!(written.yahoo().base_url, defaults.yahoo().base_url);
        assert_eq!(written.yahoo_timeout(), std::time::Duration::from_secs(30));
        assert!(written.start_date.is_none() && written.end_date.is_none());

        // the window falls back to three years ending today
        let window = written.window(None, None)?;
        assert_eq!((window.end - window.start).num_days(), 1095);

        Ok(())
    }
}
