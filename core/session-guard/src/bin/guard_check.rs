//! Debug utility for inspecting the persisted background stamp.
//!
//! Read-only: it never deletes the stamp, so running it does not consume a
//! pending inactivity check.

use std::path::PathBuf;

use clap::Parser;
use session_guard::inactivity::elapsed_since;
use session_guard::{load_config, Clock, FileStore, KeyValueStore, StorageConfig, SystemClock};

#[derive(Parser)]
#[command(name = "guard-check")]
#[command(about = "Inspect session-guard inactivity state")]
#[command(version)]
struct Cli {
    /// Config file (default: ~/.session-guard/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Root directory for session-guard data
    #[arg(long)]
    root: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let storage = match cli.root {
        Some(root) => StorageConfig::with_root(root),
        None => match StorageConfig::from_home() {
            Ok(storage) => storage,
            Err(err) => {
                eprintln!("guard-check: {}", err);
                std::process::exit(1);
            }
        },
    };

    let config_path = cli.config.unwrap_or_else(|| storage.config_file());
    let config = match load_config(Some(config_path.clone())) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("guard-check: {}", err);
            std::process::exit(1);
        }
    };
    let _logging_guard = session_guard::logging::init(config.logging.directory.as_deref());

    let store = FileStore::new(config.timestamps_file(&storage));

    println!("═══════════════════════════════════════════════════════════");
    println!("  session-guard check");
    println!("═══════════════════════════════════════════════════════════");
    println!();
    println!("Config file:    {}", config_path.display());
    println!("Store file:     {}", store.path().display());
    println!("Storage key:    {}", config.inactivity.storage_key);
    println!("Threshold:      {}s", config.inactivity.threshold_secs);
    println!();

    let raw = match store.get(&config.inactivity.storage_key).await {
        Ok(raw) => raw,
        Err(err) => {
            println!("  ✗ store unreadable: {}", err);
            println!("    (the monitor would fail open and keep the session)");
            return;
        }
    };

    let Some(raw) = raw else {
        println!("  (no pending background stamp)");
        return;
    };

    match raw.trim().parse::<i64>() {
        Ok(backgrounded_at) => {
            let elapsed_ms = elapsed_since(SystemClock.now_millis(), backgrounded_at);
            let verdict = if elapsed_ms > config.inactivity.threshold_millis() {
                "✗ next evaluation ENDS the session"
            } else {
                "✓ next evaluation keeps the session"
            };
            println!("  Stamp:   {}", backgrounded_at);
            println!("  Age:     {:.1}s", elapsed_ms as f64 / 1000.0);
            println!("  {}", verdict);
        }
        Err(_) => {
            println!("  ✗ stamp {:?} is not an integer (would be discarded)", raw);
        }
    }
}
