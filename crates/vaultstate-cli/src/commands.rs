use std::fs;
use std::path::Path;

use anyhow::Context;
use serde_json::{Map, Value};
use vaultstate_migrate::{
    validate, Era, MigrationRegistry, Migrator, PersistedState, StorageKind,
};

use crate::backend::Backend;
use crate::config::CliConfig;

type Result<T = ()> = anyhow::Result<T>;

/// `vaultstate status <path>`: version, layout and controller sizes.
pub fn status(path: &Path, config: &CliConfig) -> Result {
    let (backend, state) = Backend::open_existing(path)?;
    let threshold = config.migrator.era_threshold;

    println!("State: {} ({})", path.display(), backend.label());
    println!(
        "Version: {} ({} era, threshold {threshold})",
        state.version(),
        Era::of(state.version(), threshold),
    );
    println!("Storage: {}", state.storage_kind());
    println!();

    let Some(controllers) = state.controllers() else {
        println!("  (data is not a controller map)");
        return Ok(());
    };
    if controllers.is_empty() {
        println!("  (no controllers)");
        return Ok(());
    }

    println!("  {:<36} {:>10}", "Controller", "Size");
    println!("  {}", "-".repeat(47));
    let mut total = 0;
    for (name, value) in controllers {
        let size = serialized_len(value)?;
        total += size;
        println!("  {:<36} {:>10}", truncate(name, 36), format_bytes(size));
    }
    println!("  {}", "-".repeat(47));
    println!(
        "  {:<36} {:>10}",
        format!("Total ({})", controllers.len()),
        format_bytes(total)
    );
    println!();

    Ok(())
}

/// `vaultstate inspect <path> [controller]`
pub fn inspect(path: &Path, controller: Option<&str>) -> Result {
    let (_, state) = Backend::open_existing(path)?;

    match controller {
        Some(name) => {
            let value = state
                .controller(name)
                .with_context(|| format!("controller '{name}' not found"))?;
            println!("{}", serde_json::to_string_pretty(value)?);
        }
        None => {
            let names = state.controller_keys();
            if names.is_empty() {
                println!("(no controllers)");
            }
            for name in names {
                println!("{name}");
            }
        }
    }

    Ok(())
}

/// `vaultstate export <path>`: the whole state as pretty JSON on stdout.
pub fn export(path: &Path) -> Result {
    let (_, state) = Backend::open_existing(path)?;
    println!("{}", serde_json::to_string_pretty(&state)?);
    Ok(())
}

/// `vaultstate check <path>`: returns whether the state is valid.
pub fn check(path: &Path) -> Result<bool> {
    let (_, state) = Backend::open_existing(path)?;

    match validate::validate_state(&state) {
        Ok(()) => {
            println!(
                "ok: version {}, {} controllers",
                state.version(),
                state.controller_keys().len()
            );
            Ok(true)
        }
        Err(violation) => {
            println!("invalid: {violation}");
            Ok(false)
        }
    }
}

/// Flags for [`init`].
pub struct InitOptions<'a> {
    pub data: Option<&'a Path>,
    pub version: u32,
    pub split: bool,
    pub force: bool,
}

/// `vaultstate init <path>`: write a fresh-install state.
pub fn init(path: &Path, config: &CliConfig, options: InitOptions<'_>) -> Result {
    let mut backend = Backend::open(path)?;
    if !options.force && backend.load()?.is_some() {
        anyhow::bail!(
            "{} already holds a state (use --force to overwrite)",
            path.display()
        );
    }

    let data = match options.data {
        Some(file) => Some(read_controllers(file)?),
        None => None,
    };

    let mut migrator_config = config.migrator.clone();
    if options.split {
        migrator_config.default_storage_kind = StorageKind::Split;
    }
    let registry = MigrationRegistry::empty().with_default_version(options.version);
    let state = Migrator::new(registry, migrator_config).generate_initial_state(data);

    backend.save(&state)?;
    tracing::info!(
        path = %path.display(),
        version = state.version(),
        storage_kind = %state.storage_kind(),
        "initialized state"
    );
    println!(
        "Initialized {} at version {} ({} controllers)",
        path.display(),
        state.version(),
        state.controller_keys().len()
    );
    Ok(())
}

fn read_controllers(file: &Path) -> Result<Map<String, Value>> {
    let text = fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    match serde_json::from_str(&text).with_context(|| format!("parsing {}", file.display()))? {
        Value::Object(map) => Ok(map),
        _ => anyhow::bail!("{} must hold a JSON object of controllers", file.display()),
    }
}

fn serialized_len(value: &Value) -> Result<u64> {
    Ok(serde_json::to_vec(value)?.len() as u64)
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max - 3).collect();
        format!("{head}...")
    }
}
