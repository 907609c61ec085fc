//! # Wallet Startup Example
//!
//! Runs a wallet's real migration history the way the app does on startup:
//!
//! 1. **Old install**: a state last saved at version 53 goes through legacy
//!    and modern steps; every controller is reported as changed
//! 2. **Split storage**: a state already in the modern era reports only the
//!    controllers its steps touched, so only those are rewritten
//! 3. **Fresh install**: nothing on disk, a new state at the current version
//! 4. **Failure**: a broken controller halts the run, progress is kept, and
//!    the next start retries
//!
//! Run: `cargo run -p vaultstate-example-wallet`

mod migrations;

use std::sync::Arc;

use serde_json::{json, Map, Value};
use tracing_subscriber::EnvFilter;
use vaultstate_migrate::{
    MigrationEvent, MigrationOutcome, Migrator, PersistedState, StorageKind,
};
use vaultstate_store::{JsonFileStore, MemoryStore, StateDb, StateStore};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    println!("=== Wallet Startup Example ===\n");

    demo_old_install()?;
    demo_split_storage()?;
    demo_fresh_install()?;
    demo_failure()?;

    println!("\n=== Done! ===");
    Ok(())
}

fn migrator(storage_kind: StorageKind) -> anyhow::Result<Migrator> {
    Ok(Migrator::new(
        migrations::registry()?,
        migrations::config(storage_kind),
    ))
}

fn old_install_data() -> Value {
    json!({
        "KeyringController": { "vault": "{\"cipher\":\"...\"}" },
        "CachedBalancesController": { "cachedBalances": { "0x1": {} } },
        "PreferencesController": {
            "tokens": [{ "address": "0x0601", "decimals": "0", "symbol": "CK" }],
            "accountTokens": {},
        },
        "NetworkController": {
            "selectedNetworkClientId": "megaeth-testnet",
            "networkConfigurationsByChainId": {},
        },
    })
}

fn print_outcome(outcome: &MigrationOutcome) {
    println!("   Applied: {:?}", outcome.applied);
    println!("   Now at:  v{}", outcome.state.version());
    let changed: Vec<&str> = outcome.changed.iter().map(String::as_str).collect();
    println!("   Changed: {}", changed.join(", "));
    if let Some(err) = &outcome.error {
        println!("   Halted:  {err}");
    }
}

// ── Section 1: Old Install ───────────────────────────────────────

fn demo_old_install() -> anyhow::Result<()> {
    println!("1. Upgrading a state saved at v53...\n");

    let store = MemoryStore::with_state(PersistedState::from_value(old_install_data(), 53));
    let mut db = StateDb::new(store, migrator(StorageKind::Data)?);

    let outcome = db.load()?;
    print_outcome(&outcome);

    let prefs = outcome.state.controller("PreferencesController");
    println!(
        "   CK decimals: {}",
        prefs.map_or(Value::Null, |p| p["tokens"][0]["decimals"].clone())
    );
    println!(
        "   Selected network: {}",
        outcome.state.controller("NetworkController").map_or(Value::Null, |n| {
            n["selectedNetworkClientId"].clone()
        })
    );
    println!("   Full writes: {}", db.store().full_writes());

    // A second start finds nothing to do.
    let again = db.load()?;
    println!("   Second start applied {} steps\n", again.applied.len());
    Ok(())
}

// ── Section 2: Split Storage ─────────────────────────────────────

fn demo_split_storage() -> anyhow::Result<()> {
    println!("2. Split storage, resuming in the modern era...\n");

    let mut state = PersistedState::from_value(old_install_data(), 185);
    state.meta.storage_kind = StorageKind::Split;
    let store = MemoryStore::with_state(state);
    let mut db = StateDb::new(store, migrator(StorageKind::Split)?);

    let outcome = db.load()?;
    print_outcome(&outcome);
    println!(
        "   Full writes: {}, controller writes: {}\n",
        db.store().full_writes(),
        db.store().controller_writes()
    );
    Ok(())
}

// ── Section 3: Fresh Install ─────────────────────────────────────

fn demo_fresh_install() -> anyhow::Result<()> {
    println!("3. Fresh install to a JSON file...\n");

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("wallet-state.json");

    let mut initial = Map::new();
    initial.insert("OnboardingController".into(), json!({ "completedOnboarding": false }));
    let migrator = migrator(StorageKind::Data)?.with_initial_data(initial);

    let mut db = StateDb::new(JsonFileStore::new(&path), migrator);
    let outcome = db.load()?;
    print_outcome(&outcome);

    let on_disk = JsonFileStore::new(&path).load()?;
    println!(
        "   On disk: v{}\n",
        on_disk.map_or(0, |s| s.version())
    );
    Ok(())
}

// ── Section 4: Failure ───────────────────────────────────────────

fn demo_failure() -> anyhow::Result<()> {
    println!("4. A broken controller halts the run...\n");

    let mut data = old_install_data();
    data["PreferencesController"]["preferences"] = json!("corrupt");

    let observer = Arc::new(|event: &MigrationEvent<'_>| match event {
        MigrationEvent::Started { version } => println!("   -> #{version}"),
        MigrationEvent::Succeeded { .. } | MigrationEvent::NoChangesReported { .. } => {}
        MigrationEvent::Failed { error } => println!("   !! {error}"),
    });
    let migrator = migrator(StorageKind::Data)?.with_observer(observer);

    let store = MemoryStore::with_state(PersistedState::from_value(data, 53));
    let mut db = StateDb::new(store, migrator);

    let outcome = db.load()?;
    print_outcome(&outcome);
    println!(
        "   Stored version after failure: v{}",
        db.store().state().map_or(0, PersistedState::version)
    );

    let retry = db.load()?;
    println!(
        "   Next start retries #{}",
        retry.error.map_or(0, |e| e.version())
    );
    Ok(())
}
