use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;
use vaultstate_migrate::MigratorConfig;

const DEFAULT_CONFIG: &str = "vaultstate.toml";

/// Contents of `vaultstate.toml`.
///
/// ```toml
/// [migrator]
/// era_threshold = 186
/// default_storage_kind = "split"
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    pub migrator: MigratorConfig,
}

/// Read the config at `path`, or `./vaultstate.toml` when it exists, or the
/// defaults.
pub fn load(path: Option<&Path>) -> anyhow::Result<CliConfig> {
    let path = match path {
        Some(path) => path,
        None if Path::new(DEFAULT_CONFIG).exists() => Path::new(DEFAULT_CONFIG),
        None => return Ok(CliConfig::default()),
    };
    let text =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let config = parse(&text).with_context(|| format!("parsing {}", path.display()))?;
    tracing::debug!(path = %path.display(), ?config, "loaded config");
    Ok(config)
}

fn parse(text: &str) -> Result<CliConfig, toml::de::Error> {
    toml::from_str(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vaultstate_migrate::StorageKind;

    #[test]
    fn empty_file_uses_defaults() {
        let config = parse("").unwrap();
        assert_eq!(config.migrator, MigratorConfig::default());
    }

    #[test]
    fn migrator_section() {
        let config = parse(
            r#"
            [migrator]
            era_threshold = 186
            default_storage_kind = "split"
            "#,
        )
        .unwrap();
        assert_eq!(config.migrator.era_threshold, 186);
        assert_eq!(config.migrator.default_storage_kind, StorageKind::Split);
    }

    #[test]
    fn unknown_section_is_rejected() {
        assert!(parse("[migratr]\nera_threshold = 1").is_err());
    }

    #[test]
    fn explicit_path_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(Some(&dir.path().join("missing.toml"))).unwrap_err();
        assert!(err.to_string().contains("missing.toml"));
    }
}
