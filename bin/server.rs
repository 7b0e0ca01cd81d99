// Coop Ledger - Web Server
// REST API with Axum over the SQLite store

use anyhow::{Context, Result};
use coop_ledger::api::{app, AppState};
use coop_ledger::{logging, FarmConfig, ServerConfig, Store};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    logging::init_tracing("info,tower_http=debug");

    println!("🐔 Coop Ledger - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let farm = FarmConfig::from_env().context("invalid farm configuration")?;
    let server = ServerConfig::from_env();

    // Open (and seed on first run) the database
    let store = Store::open(&server.db_path, farm.clone())
        .with_context(|| format!("failed to open database at {:?}", server.db_path))?;
    println!("✓ Database opened: {:?}", server.db_path);
    println!(
        "✓ {} coops, invoices as {}-{}",
        farm.coop_count,
        farm.invoice_prefix,
        "0".repeat(farm.invoice_digits)
    );

    let router = app(AppState::new(store), server.static_dir.clone());

    let listener = tokio::net::TcpListener::bind(&server.bind_addr)
        .await
        .with_context(|| format!("failed to bind to {}", server.bind_addr))?;
    info!(addr = %server.bind_addr, "listening");

    println!("\n🚀 Server running on http://{}", server.bind_addr);
    println!("   API: http://{}/api/coops", server.bind_addr);
    if let Some(dir) = &server.static_dir {
        println!("   UI:  {:?}", dir);
    }
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, router)
        .await
        .context("server stopped unexpectedly")?;

    Ok(())
}
