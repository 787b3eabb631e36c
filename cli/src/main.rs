//! rpcmux CLI — probe, inspect and exercise RPC endpoint pools.
//!
//! Usage:
//! ```bash
//! # Probe a single endpoint
//! rpcmux probe --url https://polygon-rpc.com --chain-id 137
//!
//! # One health cycle over the built-in Polygon pool
//! rpcmux health --chain polygon
//!
//! # Retry-wrapped raw JSON-RPC call
//! rpcmux call --url https://polygon-rpc.com --method eth_blockNumber
//!
//! # Run the manager with its background health task
//! rpcmux watch --interval 10
//! ```

use std::env;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde_json::Value;

use rpcmux_core::{health, EndpointManager, ManagerConfig};
use rpcmux_http::HttpTransport;
use rpcmux_providers::{ethereum, polygon};

#[tokio::main]
async fn main() {
    init_logging();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let result = match args[1].as_str() {
        "probe" => cmd_probe(&args[2..]).await,
        "health" => cmd_health(&args[2..]).await,
        "call" => cmd_call(&args[2..]).await,
        "watch" => cmd_watch(&args[2..]).await,
        "version" | "--version" | "-V" => {
            println!("rpcmux {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            print_usage();
            process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn print_usage() {
    println!("rpcmux {}", env!("CARGO_PKG_VERSION"));
    println!("Probe and exercise blockchain RPC endpoint pools\n");
    println!("USAGE:");
    println!("    rpcmux <COMMAND>\n");
    println!("COMMANDS:");
    println!("    probe      Probe one endpoint (latency, height, chain id)");
    println!("    health     Run one health cycle over a built-in pool");
    println!("    call       Send a retry-wrapped JSON-RPC call");
    println!("    watch      Run the manager and print pool snapshots");
    println!("    version    Print version");
    println!("    help       Print this help\n");
    println!("FLAGS:");
    println!("    --url <URL>          Endpoint URL (probe, call)");
    println!("    --chain-id <ID>      Expected chain id  [default: 137]");
    println!("    --chain <NAME>       polygon | ethereum  [default: polygon]");
    println!("    --method <M>         JSON-RPC method (call)");
    println!("    --params <JSON>      Params as a JSON array (call)");
    println!("    --retries <N>        Attempt budget (call)");
    println!("    --interval <SECS>    Snapshot cadence (watch)  [default: 10]");
}

fn parse_flag(args: &[String], flag: &str) -> Option<String> {
    let pos = args.iter().position(|a| a == flag)?;
    args.get(pos + 1).cloned()
}

/// Resolve `--chain` to a built-in pool.
fn builtin_pool(args: &[String]) -> Result<(Arc<EndpointManager>, &'static [&'static str])> {
    let chain = parse_flag(args, "--chain").unwrap_or_else(|| "polygon".into());
    match chain.as_str() {
        "polygon" => Ok((polygon::mainnet(), polygon::MAINNET_RPCS)),
        "ethereum" => Ok((ethereum::mainnet(), ethereum::MAINNET_RPCS)),
        other => Err(anyhow!("unknown chain {other:?} (try polygon or ethereum)")),
    }
}

async fn cmd_probe(args: &[String]) -> Result<()> {
    let url = parse_flag(args, "--url").ok_or_else(|| anyhow!("--url is required"))?;
    let chain_id = match parse_flag(args, "--chain-id") {
        Some(raw) => raw.parse::<u64>().context("--chain-id must be a number")?,
        None => polygon::CHAIN_ID,
    };

    let transport = HttpTransport::default_for(&url);
    println!("Probing {url}...");
    match health::probe(&transport, chain_id, Duration::from_secs(5)).await {
        Ok(report) => {
            println!("  Status:   healthy");
            println!("  Height:   {}", report.height);
            println!("  Latency:  {}ms", report.latency.as_millis());
        }
        Err(e) => {
            println!("  Status:   unhealthy ({e})");
        }
    }
    Ok(())
}

async fn cmd_health(args: &[String]) -> Result<()> {
    let (manager, urls) = builtin_pool(args)?;
    println!("Probing {} endpoints...", urls.len());
    manager.run_health_cycle().await;
    print_snapshot(&manager, urls);
    Ok(())
}

async fn cmd_call(args: &[String]) -> Result<()> {
    let url = parse_flag(args, "--url").ok_or_else(|| anyhow!("--url is required"))?;
    let method = parse_flag(args, "--method").ok_or_else(|| anyhow!("--method is required"))?;
    let params: Vec<Value> = match parse_flag(args, "--params") {
        Some(raw) => serde_json::from_str(&raw).context("--params must be a JSON array")?,
        None => vec![],
    };
    let retries = match parse_flag(args, "--retries") {
        Some(raw) => Some(raw.parse::<u32>().context("--retries must be a number")?),
        None => None,
    };

    let manager =
        rpcmux_providers::manager_for(&[url.as_str()], ManagerConfig::for_chain(polygon::CHAIN_ID))?;
    let result: Value = manager
        .execute(
            || {
                let client = manager.read_client();
                let method = method.clone();
                let params = params.clone();
                async move { client.call::<Value>(&method, params).await }
            },
            retries,
        )
        .await?;

    println!("{}", serde_json::to_string_pretty(&result).unwrap_or_default());
    Ok(())
}

async fn cmd_watch(args: &[String]) -> Result<()> {
    let (manager, urls) = builtin_pool(args)?;
    let every = match parse_flag(args, "--interval") {
        Some(raw) => Duration::from_secs(raw.parse::<u64>().context("--interval must be seconds")?),
        None => Duration::from_secs(10),
    };

    let task = Arc::clone(&manager).spawn_health_task();
    println!("Watching {} endpoints; Ctrl-C to stop", urls.len());
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = tokio::time::sleep(every) => print_snapshot(&manager, urls),
        }
    }
    task.shutdown().await;
    Ok(())
}

fn print_snapshot(manager: &EndpointManager, urls: &[&str]) {
    let snapshot = manager.snapshot();
    println!();
    for (idx, url) in urls.iter().enumerate() {
        let marker = if idx == snapshot.current { ">" } else { " " };
        let status = if snapshot.healthy.contains(&idx) {
            "healthy"
        } else {
            "unhealthy"
        };
        let latency = snapshot
            .latencies_ms
            .iter()
            .find(|(i, _)| *i == idx)
            .map(|(_, ms)| format!("{ms}ms"))
            .unwrap_or_else(|| "-".into());
        println!("{marker} [{idx}] {status:<9} {latency:>7}  {url}");
    }
    println!(
        "  consecutive failures: {}, last success: {}",
        snapshot.consecutive_failures,
        snapshot
            .since_last_success
            .map(|d| format!("{}s ago", d.as_secs()))
            .unwrap_or_else(|| "never".into()),
    );
}
