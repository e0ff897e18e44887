use backend_api::{run_server, AppState, FileMetricsCache, FileRecordSource};
use std::sync::Arc;
use std::{env, path::PathBuf};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Environment variables with sane defaults
    let records_path_raw = env::var("RECORDS_PATH").unwrap_or_else(|_| "records".to_string());
    let cache_path_raw =
        env::var("CACHE_PATH").unwrap_or_else(|_| "metrics_cache.json".to_string());
    let settings_path_raw = env::var("SETTINGS_PATH").unwrap_or_else(|_| "settings.json".to_string());
    let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = env::var("PORT")
        .unwrap_or_else(|_| "3000".to_string())
        .parse()
        .unwrap_or(3000);

    // Relative paths resolve against the workspace root so the server can be
    // started from any member crate directory.
    let root = workspace_root().unwrap_or_else(|| PathBuf::from("."));
    let records_path = resolve(&records_path_raw, &root);
    let cache_path = resolve(&cache_path_raw, &root);
    let settings_path = resolve(&settings_path_raw, &root);

    println!("Venue Metrics API Server");
    println!("========================");
    println!("Records path (resolved): {}", records_path.display());
    println!("Cache path (resolved): {}", cache_path.display());
    println!("Settings path (resolved): {}", settings_path.display());
    println!("Listening on: {}:{}", host, port);
    println!(
        "Environment overrides: RECORDS_PATH='{}' CACHE_PATH='{}' SETTINGS_PATH='{}'",
        records_path_raw, cache_path_raw, settings_path_raw
    );
    println!();

    // Pre-flight checks
    if !records_path.exists() {
        eprintln!(
            "[FATAL] records export not found at: {}",
            records_path.display()
        );
        eprintln!("        Set RECORDS_PATH to the snapshot export file or directory.");
        std::process::exit(1);
    }
    if !cache_path.exists() {
        eprintln!("[WARN] metrics cache not found at: {}", cache_path.display());
        eprintln!("       Continuing; responses are computed until a refresh populates it.");
    }
    if !settings_path.exists() {
        eprintln!("[WARN] settings not found at: {}", settings_path.display());
        eprintln!("       Continuing with default scopes.");
    }

    let settings =
        settings_loader::load_settings_with_fallback(Some(&settings_path))?.unwrap_or_default();

    let state = AppState {
        records: Arc::new(FileRecordSource::new(records_path)),
        cache: Arc::new(FileMetricsCache::new(cache_path)),
        settings: Arc::new(settings),
    };

    run_server(state, &host, port).await?;

    Ok(())
}

/// Walks up from the current directory until a Cargo.toml with a [workspace]
/// section is found.
fn workspace_root() -> Option<PathBuf> {
    let mut dir = env::current_dir().ok()?;
    for _ in 0..10 {
        let candidate = dir.join("Cargo.toml");
        if let Ok(content) = std::fs::read_to_string(&candidate) {
            if content.contains("[workspace]") {
                return Some(dir);
            }
        }
        if !dir.pop() {
            break;
        }
    }
    None
}

fn resolve(raw: &str, root: &PathBuf) -> PathBuf {
    let path = PathBuf::from(raw);
    if path.is_absolute() {
        path
    } else {
        root.join(path)
    }
}
