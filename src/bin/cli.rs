use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use balance_checker::{BalanceAggregator, Config, Summary, UsdValue};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "balance-checker")]
#[command(about = "Sum native balances of many wallets across EVM chains", long_about = None)]
struct Args {
    /// Text containing wallet addresses; read from stdin when omitted
    input: Vec<String>,

    /// JSON config file replacing the built-in chain list
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,

    /// Maximum number of distinct addresses per request
    #[arg(long)]
    max_addresses: Option<usize>,

    /// Quote service API key
    #[arg(long, env = "COINGECKO_API_KEY", hide_env_values = true)]
    price_api_key: Option<String>,

    /// Give up on the whole request after this many seconds
    #[arg(long, default_value_t = 120)]
    deadline: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load()?,
    };
    if let Some(limit) = args.max_addresses {
        config.limits.max_addresses = limit;
    }
    if let Some(key) = args.price_api_key.clone() {
        config.price.api_key = Some(key);
    }
    config.validate()?;

    let text = if args.input.is_empty() {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read addresses from stdin")?;
        buf
    } else {
        args.input.join(" ")
    };

    let aggregator = BalanceAggregator::from_config(&config)?;
    let request = aggregator.check_text(&text);

    match tokio::time::timeout(Duration::from_secs(args.deadline), request).await {
        Ok(Ok(summary)) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_summary(&summary);
            }
        }
        Ok(Err(e)) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
        Err(_) => {
            eprintln!("Error: request did not finish within {}s", args.deadline);
            std::process::exit(1);
        }
    }

    Ok(())
}

fn print_summary(summary: &Summary) {
    println!(
        "Balance summary for {} addresses across {} chains",
        summary.address_count,
        summary.chains.len()
    );
    println!("{}", "=".repeat(60));

    let breakdown = summary.chain_breakdown();
    if breakdown.is_empty() {
        println!("No balances found");
    }
    for chain in breakdown {
        println!("{:12} | {:>20.6} {}", chain.name, chain.total, chain.symbol);
    }

    println!("{}", "-".repeat(60));
    for (symbol, total) in summary.symbol_breakdown() {
        println!("{:12} | {:>20.6}", format!("TOTAL {symbol}"), total);
    }

    let price = &summary.price;
    match summary.usd_value {
        UsdValue::Value(usd) => println!(
            "USD value    | {:>20.2} (@ ${:.2}/{})",
            usd, price.unit_price, price.asset_symbol
        ),
        UsdValue::PriceUnavailable => println!(
            "USD value    | price unavailable for {}",
            price.asset_symbol
        ),
        UsdValue::NoBalance => {}
    }
    println!("{}", "=".repeat(60));

    println!(
        "Active wallets: {} out of {} total checks",
        summary.active_reading_count, summary.total_reading_count
    );
    if summary.failed_reading_count > 0 {
        println!(
            "Failed lookups: {} (counted as zero)",
            summary.failed_reading_count
        );
    }
}
