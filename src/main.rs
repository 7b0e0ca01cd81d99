use anyhow::{Context, Result};
use chrono::Utc;
use std::env;

use coop_ledger::dashboard::saturating_sum;
use coop_ledger::{logging, FarmConfig, ServerConfig, Store};

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    logging::init_tracing("warn");

    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("init") => run_init()?,
        Some("coops") => run_coops()?,
        Some("summary") => run_summary()?,
        _ => print_usage(),
    }

    Ok(())
}

fn open_store() -> Result<(Store, ServerConfig)> {
    let farm = FarmConfig::from_env().context("invalid farm configuration")?;
    let server = ServerConfig::from_env();
    let store = Store::open(&server.db_path, farm)
        .with_context(|| format!("failed to open database at {:?}", server.db_path))?;
    Ok((store, server))
}

fn run_init() -> Result<()> {
    println!("🗄️  Coop Ledger - Database Setup");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    println!("\n🔧 Setting up database...");
    let (store, server) = open_store()?;
    println!("✓ Database ready at {:?} (WAL mode)", server.db_path);

    let coops = store.coops()?;
    let birds = saturating_sum(coops.iter().map(|c| c.quantity));
    println!("✓ {} coop slots, {} birds", coops.len(), birds);

    Ok(())
}

fn run_coops() -> Result<()> {
    let (store, _) = open_store()?;
    let summary = store.dashboard(Utc::now())?;

    println!("🐔 Coops");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("{:>4}  {:>8}  {:>6}  {:<8}  {:<8}", "#", "Birds", "Days", "Age", "Status");
    for coop in &summary.coops {
        println!(
            "{:>4}  {:>8}  {:>6}  {:<8}  {:<8}",
            coop.number,
            coop.quantity,
            coop.age_days,
            format!("{:?}", coop.age_category).to_lowercase(),
            coop.status.as_str()
        );
    }
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Total: {} birds", summary.total_chickens);

    Ok(())
}

fn run_summary() -> Result<()> {
    let (store, _) = open_store()?;
    let summary = store.dashboard(Utc::now())?;

    println!("📊 Farm Summary");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Total birds:          {}", summary.total_chickens);
    println!("Active coops:         {}", summary.active_coops);
    println!("Sales today:          {:.2}", summary.sales_today);
    println!("Sales this month:     {:.2}", summary.sales_this_month);
    println!("Pending invoices:     {}", summary.pending_invoices);
    println!("Expenses this month:  {:.2}", summary.expenses_this_month);
    println!("Mortalities (month):  {}", summary.mortalities_this_month);
    println!("Mortalities (total):  {}", summary.total_mortalities);

    Ok(())
}

fn print_usage() {
    println!("Coop Ledger v{}", coop_ledger::VERSION);
    println!();
    println!("Usage: coop-ledger <command>");
    println!();
    println!("Commands:");
    println!("  init      Create and seed the database");
    println!("  coops     Show every coop with its batch age");
    println!("  summary   Show the dashboard figures");
    println!();
    println!("Run the API with: coop-server (COOP_DB_PATH, COOP_BIND_ADDR)");
}
