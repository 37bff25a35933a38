//! rmr-runner: drives RMR launch/update scenarios against a live node.

use anyhow::{bail, Context};
use clap::Parser;
use rmr_executor::ProcessRunner;
use rmr_harness::{unique_ticker, ExecutionReport, HarnessError, RmrScenario, Session};
use rmr_markets::DEFAULT_TOLERANCE;
use rmr_types::{normalize, validate, HarnessConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "rmr-runner", about = "Reduce margin ratio governance test runner")]
struct Cli {
    /// Dotenv file loaded before flags and environment are read.
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Node CLI binary.
    #[arg(long, global = true, env = "INJECTIVED_BINARY")]
    binary: Option<String>,

    #[arg(long, global = true, env = "INJECTIVE_CHAIN_ID")]
    chain_id: Option<String>,

    /// Tendermint RPC endpoint.
    #[arg(long, global = true, env = "INJECTIVE_NODE_URL")]
    node: Option<String>,

    #[arg(long, global = true, env = "KEYRING_BACKEND")]
    keyring_backend: Option<String>,

    /// Per-command timeout in seconds.
    #[arg(long, global = true, env = "TEST_TIMEOUT")]
    timeout: Option<u64>,

    #[arg(long, global = true, env = "VALIDATOR_KEY")]
    validator_key: Option<String>,

    /// Key used for proposal submission and admin updates.
    #[arg(long, global = true, env = "ADMIN_KEY")]
    admin_key: Option<String>,

    #[arg(long, global = true, env = "TESTCANDIDATE_KEY")]
    testcandidate_key: Option<String>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, global = true, env = "LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, global = true, env = "LOG_FORMAT")]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Check a ratio triple against RMR >= IMR > MMR and show stored forms.
    Validate {
        rmr: f64,
        #[arg(long)]
        imr: Option<f64>,
        #[arg(long)]
        mmr: Option<f64>,
    },
    /// Confirm the node is producing blocks and the test keys exist.
    Check,
    /// Launch a perpetual market through governance.
    Launch {
        rmr: f64,
        /// Defaults to a fresh TEST<...>/USDT PERP ticker.
        #[arg(long)]
        ticker: Option<String>,
        #[arg(long)]
        imr: Option<f64>,
        #[arg(long)]
        mmr: Option<f64>,
    },
    /// Admin-update a market's RMR and confirm it was stored.
    Update { market_id: String, rmr: f64 },
    /// Compare a market's stored RMR with an expected value.
    Verify {
        market_id: String,
        rmr: f64,
        #[arg(long, default_value_t = DEFAULT_TOLERANCE)]
        tolerance: f64,
    },
    /// Launch with a named RMR, update it, verify, and append a report.
    Scenario {
        /// valid_high, valid_medium, valid_low, invalid_low or boundary.
        #[arg(default_value = "valid_medium")]
        name: String,
        /// RMR to update to after launch.
        #[arg(long, default_value_t = 0.15)]
        update_to: f64,
        #[arg(long, default_value = "rmr_test_log.md")]
        report: PathBuf,
    },
    /// Print the effective configuration as TOML.
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_env_file()?;
    let cli = Cli::parse();
    let config = effective_config(&cli)?;
    rmr_utils::init_tracing(&config.log_level, &config.log_format);

    if let Some(path) = &cli.env_file {
        tracing::info!("Loaded environment from {}", path.display());
    }
    if let Some(path) = &cli.config {
        tracing::info!("Loaded config from {}", path.display());
    }

    match cli.command {
        Command::Validate { rmr, imr, mmr } => {
            let imr = imr.unwrap_or(config.default_imr);
            let mmr = mmr.unwrap_or(config.default_mmr);
            if !validate(rmr, imr, mmr) {
                bail!("invalid margin ratios: rmr={rmr}, imr={imr}, mmr={mmr} violate constraint RMR >= IMR > MMR");
            }
            println!(
                "valid: rmr={} imr={} mmr={}",
                normalize(rmr)?,
                normalize(imr)?,
                normalize(mmr)?
            );
        }
        Command::Check => {
            let session = connect(config);
            let height = session.check_node().await?;
            println!("block height: {height}");
            for (name, address) in session.check_keys().await? {
                println!("{name}: {address}");
            }
        }
        Command::Launch {
            rmr,
            ticker,
            imr,
            mmr,
        } => {
            let session = connect(config);
            let ticker = ticker.unwrap_or_else(unique_ticker);
            let market = session.launch_market(&ticker, rmr, imr, mmr).await?;
            println!(
                "launched {} as {} (proposal {}, rmr {})",
                market.ticker, market.market_id, market.proposal_id, market.rmr
            );
        }
        Command::Update { market_id, rmr } => {
            let session = connect(config);
            if !session.reconciler().update(&market_id, rmr).await {
                bail!("update of {market_id} to rmr {rmr} was not applied");
            }
            println!("{market_id}: rmr updated to {}", normalize(rmr)?);
        }
        Command::Verify {
            market_id,
            rmr,
            tolerance,
        } => {
            let session = connect(config);
            if !session.reconciler().verify_value(&market_id, rmr, tolerance).await {
                bail!("{market_id}: stored rmr does not match {rmr} (tolerance {tolerance})");
            }
            println!("{market_id}: rmr matches {rmr}");
        }
        Command::Scenario {
            name,
            update_to,
            report,
        } => {
            let scenario = RmrScenario::from_name(&name)
                .with_context(|| format!("unknown scenario {name}"))?;
            let session = connect(config);
            run_scenario(&session, scenario, update_to, &report).await?;
        }
        Command::Config => print!("{}", config.to_toml_string()),
    }

    Ok(())
}

/// Load `--env-file` (or `.env` when present) before clap reads the environment.
fn load_env_file() -> anyhow::Result<()> {
    let mut args = std::env::args();
    let mut path = None;
    while let Some(arg) = args.next() {
        if arg == "--env-file" {
            path = args.next();
        } else if let Some(value) = arg.strip_prefix("--env-file=") {
            path = Some(value.to_string());
        }
    }

    match path {
        Some(path) => {
            dotenvy::from_path(&path).with_context(|| format!("failed to load env file {path}"))?;
        }
        None => {
            let _ = dotenvy::dotenv();
        }
    }
    Ok(())
}

fn effective_config(cli: &Cli) -> anyhow::Result<HarnessConfig> {
    let mut config = match cli.config {
        Some(ref path) => {
            HarnessConfig::from_toml_file(&path.to_string_lossy())?
        }
        None => HarnessConfig::default(),
    };

    let overrides = [
        (&cli.binary, &mut config.binary),
        (&cli.chain_id, &mut config.chain_id),
        (&cli.node, &mut config.node_url),
        (&cli.keyring_backend, &mut config.keyring_backend),
        (&cli.validator_key, &mut config.validator_key),
        (&cli.admin_key, &mut config.admin_key),
        (&cli.testcandidate_key, &mut config.testcandidate_key),
        (&cli.log_level, &mut config.log_level),
        (&cli.log_format, &mut config.log_format),
    ];
    for (flag, field) in overrides {
        if let Some(value) = flag {
            *field = value.clone();
        }
    }
    if let Some(timeout) = cli.timeout {
        config.command_timeout_secs = timeout;
    }
    Ok(config)
}

fn connect(config: HarnessConfig) -> Session {
    let runner = Arc::new(ProcessRunner::new(config.binary.clone()));
    tracing::info!(
        binary = %config.binary,
        chain_id = %config.chain_id,
        node = %config.node_url,
        "connecting"
    );
    Session::new(runner, config)
}

async fn run_scenario(
    session: &Session,
    scenario: RmrScenario,
    update_to: f64,
    report_path: &Path,
) -> anyhow::Result<()> {
    let ticker = unique_ticker();
    let mut report = ExecutionReport::new(format!("{scenario}: {ticker}"));
    tracing::info!(%scenario, %ticker, "running scenario");

    let outcome = async {
        let height = session.check_node().await?;
        report.record("node", true, format!("height {height}"));

        let market = match session.launch_market(&ticker, scenario.rmr(), None, None).await {
            Ok(market) => market,
            Err(e) => {
                report.record("launch", false, e.to_string());
                return Ok(());
            }
        };
        report.record(
            "launch",
            true,
            format!("{} via proposal {}", market.market_id, market.proposal_id),
        );

        let verified = session
            .reconciler()
            .verify_value_default(&market.market_id, scenario.rmr())
            .await;
        report.record("verify launch", verified, format!("rmr {}", scenario.rmr()));

        let updated = session.reconciler().update(&market.market_id, update_to).await;
        report.record("update", updated, format!("rmr {update_to}"));

        let verified = session
            .reconciler()
            .verify_value_default(&market.market_id, update_to)
            .await;
        report.record("verify update", verified, format!("rmr {update_to}"));
        Ok::<(), HarnessError>(())
    }
    .await;

    if let Err(e) = outcome {
        report.record("node", false, e.to_string());
    }

    report.append_to(report_path)?;
    println!(
        "{}: {}/{} steps passed, report in {}",
        scenario,
        report.passed(),
        report.total(),
        report_path.display()
    );
    if !report.all_passed() {
        bail!("{} step(s) failed", report.failed());
    }
    Ok(())
}
