use clap::Parser;
use colored::*;
use eyre::{Context, Result, eyre};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use polaris::chains::{self, Chain};
use polaris::client::{MockTransactionClient, RpcClient, TransactionClient};
use polaris::controller::{ControllerSettings, RunController, TickReport};
use polaris::domain::{AccountSet, LogEntry, RunDraft, Severity};

mod cli;
mod config;

use cli::{Cli, Commands, RunArgs, read_key_lines};
use config::Config;

fn setup_logging(default_level: &str) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("polaris")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("polaris.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

async fn run_application(cli: &Cli, config: Config) -> Result<()> {
    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    match &cli.command {
        Commands::Run(args) => handle_run(args, config).await,
        Commands::Accounts { keys } => handle_accounts(keys),
        Commands::Chains => handle_chains(&config),
    }
}

async fn handle_run(args: &RunArgs, mut config: Config) -> Result<()> {
    args.apply_to(&mut config);
    config.validate().context("Invalid run settings")?;

    let draft = config.draft(read_key_lines(&args.keys)?);
    let settings = config.controller_settings();

    if args.dry_run {
        println!("{}", "Dry run: submissions go to a local mock client".yellow());
        let client = Arc::new(MockTransactionClient::new());
        return run_broadcast(client, settings, &draft, args.ticks).await;
    }

    let chain = config.chain_preset()?;
    let url = config.rpc_url()?;
    if config.uses_preset_endpoint() {
        log::warn!("Using public endpoint {} for eth_sendTransaction", url);
        println!(
            "{} {} is a public endpoint and holds no account keys; submissions will likely be rejected. Pass --rpc with a node that manages the keys.",
            "Warning:".yellow().bold(),
            url
        );
    }

    let client = RpcClient::connect(&url, config.rpc_timeout())
        .await
        .context(format!("Failed to connect to {}", url))?;
    println!("{} {} via {}", "Chain:".bold(), chain, client.endpoint());
    check_chain(&client, chain).await;

    run_broadcast(Arc::new(client), settings, &draft, args.ticks).await
}

/// Warn when the endpoint serves a different chain than the preset
async fn check_chain(client: &RpcClient, chain: &Chain) {
    match client.chain_id().await {
        Ok(id) if id == chain.chain_id => {}
        Ok(id) => {
            let served = chains::by_id(id).map(|c| c.name).unwrap_or("unknown chain");
            log::warn!("Endpoint chain id {} does not match {}", id, chain);
            println!(
                "{} endpoint reports chain id {} ({}), expected {}",
                "Warning:".yellow().bold(),
                id,
                served,
                chain
            );
        }
        Err(e) => log::warn!("Could not query chain id: {}", e),
    }
}

async fn run_broadcast<C>(client: Arc<C>, settings: ControllerSettings, draft: &RunDraft, tick_limit: Option<u64>) -> Result<()>
where
    C: TransactionClient + 'static,
{
    let mut controller = RunController::with_settings(client, settings);

    if let Err(e) = controller.start(draft) {
        if let Some(entry) = controller.logs().newest() {
            print_entry(entry);
        }
        return Err(eyre!("Run not started: {}", e));
    }
    if let Some(entry) = controller.logs().newest() {
        print_entry(entry);
    }
    println!("{}", "Press Ctrl-C to stop".dimmed());

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            report = controller.next_report() => match report {
                Some(report) => {
                    print_report(&report);
                    if tick_limit.is_some_and(|limit| controller.counters().ticks >= limit) {
                        break;
                    }
                }
                None => break,
            },
            _ = &mut ctrl_c => {
                println!();
                info!("Interrupted");
                break;
            }
        }
    }

    controller.stop();
    if let Some(entry) = controller.logs().newest() {
        print_entry(entry);
    }
    for report in controller.settle().await {
        print_report(&report);
    }

    let counters = controller.counters();
    println!(
        "{} {} submissions, {} successful, {} failed over {} ticks ({} skipped)",
        "Done:".bold(),
        counters.submissions(),
        counters.success_count.to_string().green(),
        counters.failure_count.to_string().red(),
        counters.ticks,
        counters.skipped_ticks
    );
    Ok(())
}

fn print_report(report: &TickReport) {
    for entry in &report.entries {
        print_entry(entry);
    }
    if report.skipped > 0 {
        println!(
            "{}",
            format!("skipped {} tick(s) while tick {} was in flight", report.skipped, report.tick).dimmed()
        );
    }
}

fn print_entry(entry: &LogEntry) {
    let line = entry.to_string();
    match entry.severity {
        Severity::Success => println!("{}", line.green()),
        Severity::Error => println!("{}", line.red()),
        Severity::Info => println!("{}", line.cyan()),
    }
}

fn handle_accounts(keys: &Path) -> Result<()> {
    let lines = read_key_lines(keys)?;
    let accounts = AccountSet::parse(&lines);
    let dropped = lines.iter().filter(|l| !l.trim().is_empty()).count().saturating_sub(accounts.len());

    println!("{} {}", "Accounts:".bold(), accounts.len());
    for (i, account) in accounts.iter().enumerate() {
        println!("  {:>3}. {}  {}", i + 1, account.address.short().cyan(), account.address);
    }
    if dropped > 0 {
        println!("{} {} line(s) ignored", "Note:".yellow(), dropped);
    }
    Ok(())
}

fn handle_chains(config: &Config) -> Result<()> {
    println!("{}", "Chains:".bold());
    for chain in chains::CHAINS {
        let marker = if chains::lookup(&config.chain) == Some(chain) { "*" } else { " " };
        println!(
            "{} {:<10} {:>6}  {:<5} {}",
            marker,
            chain.name,
            chain.chain_id,
            chain.symbol,
            chain.rpc_url.dimmed()
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    let level = if cli.is_verbose() {
        "debug".to_string()
    } else {
        config.log_level.clone().unwrap_or_else(|| "info".to_string())
    };
    setup_logging(&level).context("Failed to setup logging")?;

    info!("Starting polaris");

    run_application(&cli, config).await.context("Application failed")?;

    Ok(())
}
