use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use flvbench_rs::{run_load_test, HeaderCheck, LoadTestConfig, TracingSink};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "flvbench",
    about = "Load test an HTTP-FLV (or other chunked media) stream with concurrent clients"
)]
struct Args {
    /// URL of the HTTP-FLV stream
    url: String,

    /// Number of clients to simulate
    #[arg(long, default_value_t = 10)]
    clients: usize,

    /// Test duration in seconds
    #[arg(long, default_value_t = 60)]
    duration: u64,

    /// Validate the 9-byte FLV header before consuming the stream
    #[arg(long)]
    check_header: bool,

    /// Connect timeout in seconds
    #[arg(long, default_value_t = 10)]
    connect_timeout_secs: u64,

    /// Maximum time to wait for a single read, in seconds
    #[arg(long, default_value_t = 30)]
    read_timeout_secs: u64,

    /// Largest number of bytes consumed per read
    #[arg(long, default_value_t = 8192)]
    chunk_size: usize,

    /// Seconds between progress lines
    #[arg(long, default_value_t = 5)]
    status_interval_secs: u64,

    /// Also print the final report as JSON on stdout
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let header_check = if args.check_header {
        HeaderCheck::Enforce
    } else {
        HeaderCheck::Skip
    };

    let config = LoadTestConfig::try_new(
        &args.url,
        args.clients,
        Duration::from_secs(args.duration),
    )?
    .with_connect_timeout(Duration::from_secs(args.connect_timeout_secs))
    .with_read_timeout(Duration::from_secs(args.read_timeout_secs))
    .with_chunk_size(args.chunk_size)
    .with_header_check(header_check)
    .with_status_interval(Duration::from_secs(args.status_interval_secs));

    let report = run_load_test(config).await?;

    report.render(&mut TracingSink);

    if args.json {
        let json = serde_json::to_string_pretty(&report).context("failed to serialize report")?;
        println!("{}", json);
    }

    Ok(())
}
