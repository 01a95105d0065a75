//! DYAD Note Monitor
//!
//! Watches DYAD notes on Ethereum mainnet and reports to Discord.
//! Features:
//! - Daily note report at a fixed local time (risk, rewards, LP yields)
//! - Liquidation opportunity sweep on every new block
//! - Reconnecting block subscription with jittered backoff
//! - Manual note actions: mint, burn, withdraw, claim, liquidate

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use note_monitor_api::{DiscordConfig, DiscordNotifier, NoteSearchClient, PriceClient, RewardsClient};
use note_monitor_chain::{
    date_to_block, fetch_liquidations, parse_date, parse_note_id, vault_for_asset, BlockListener, NoteReader,
    TransactionSender,
};
use note_monitor_core::u256_math::{format_number, format_wad, parse_wad, wad_to_f64};
use note_monitor_core::{
    BlockTickSource, ChainReader, DailyCheckProcessor, DriverSettings, EnvSettings, ExecutionSchedule,
    IntervalTickSource, LiquidationMonitor, MonitorConfig, NoteReportBuilder, PollDriver, ReportBuilder,
    TickMode, TickProcessor, TickSource,
};

#[derive(Debug, Parser)]
#[command(name = "note-monitor", version, about = "Monitor DYAD notes and report to Discord")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the block-driven monitor (default)
    Watch,
    /// Report every configured note once and send it to Discord
    Monitor,
    /// Print collateral ratio, minted DYAD and vault values for a note
    CheckNote { note_id: String },
    /// Mint DYAD on the primary note and use it to liquidate a note
    Liquidate { note_id: String, amount: String },
    /// Mint DYAD against a note
    Mint { note_id: String, amount: String },
    /// Burn DYAD to repay a note's debt
    Burn { note_id: String, amount: String },
    /// Withdraw collateral (KEROSENE or WETH) from a note
    Withdraw {
        note_id: String,
        asset: String,
        amount: String,
    },
    /// Claim LP rewards into the note's kerosene vault
    Claim { note_id: String },
    /// List Liquidate events since a date
    Liquidations {
        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        from: String,
        /// Last block to scan (default: latest)
        #[arg(long)]
        to_block: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    init_tracing();

    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Command::Watch);

    let notifier = Arc::new(DiscordNotifier::new(DiscordConfig::from_env()));

    if let Err(e) = run(command, notifier.clone()).await {
        error!(error = %e, "Command failed");
        notifier.send(&format!("Failure: {e}")).await;
        return Err(e);
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,note_monitor_core=debug,note_monitor_chain=debug"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let (plain, structured) = if json {
        (None, Some(fmt::layer().json()))
    } else {
        (Some(fmt::layer()), None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(plain)
        .with(structured)
        .init();
}

/// Components built once at startup and shared by all commands.
struct App {
    config: MonitorConfig,
    env: EnvSettings,
    reader: Arc<NoteReader>,
    sender: Option<Arc<TransactionSender>>,
    notifier: Arc<DiscordNotifier>,
}

impl App {
    async fn init(notifier: Arc<DiscordNotifier>) -> Result<Self> {
        let config = MonitorConfig::load()?;
        config.validate()?;
        config.log_config();

        let env = EnvSettings::from_env()?;
        info!(notes = ?env.note_ids, ws = env.ws_url.is_some(), "Environment loaded");

        let reader = Arc::new(NoteReader::connect(&env.rpc_url).await?);

        let sender = match &env.private_key {
            Some(key) => {
                let sender = TransactionSender::new(key, &env.rpc_url).await?;
                info!(address = %sender.address, "Transaction sender initialized");
                Some(Arc::new(sender))
            }
            None => {
                info!("PRIVATE_KEY not set, running read-only");
                None
            }
        };

        Ok(Self {
            config,
            env,
            reader,
            sender,
            notifier,
        })
    }

    fn sender(&self) -> Result<&TransactionSender> {
        self.sender
            .as_deref()
            .context("PRIVATE_KEY is required for this command")
    }

    fn report_builder(&self) -> NoteReportBuilder {
        NoteReportBuilder::standard(
            self.reader.clone(),
            Arc::new(RewardsClient::new()),
            Arc::new(PriceClient::new()),
            self.sender.clone(),
        )
    }
}

async fn run(command: Command, notifier: Arc<DiscordNotifier>) -> Result<()> {
    let app = App::init(notifier).await?;

    match command {
        Command::Watch => watch(app).await,
        Command::Monitor => monitor(&app).await,
        Command::CheckNote { note_id } => check_note(&app, &note_id).await,
        Command::Liquidate { note_id, amount } => liquidate(&app, &note_id, &amount).await,
        Command::Mint { note_id, amount } => {
            let tx = app.sender()?.mint_dyad(parse_note_id(&note_id)?, parse_wad(&amount)?).await?;
            println!("Minted {amount} DYAD on note {note_id}: {tx}");
            Ok(())
        }
        Command::Burn { note_id, amount } => {
            let tx = app.sender()?.burn_dyad(parse_note_id(&note_id)?, parse_wad(&amount)?).await?;
            println!("Burned {amount} DYAD on note {note_id}: {tx}");
            Ok(())
        }
        Command::Withdraw { note_id, asset, amount } => {
            let vault = vault_for_asset(&asset)?;
            let tx = app
                .sender()?
                .withdraw(parse_note_id(&note_id)?, vault, parse_wad(&amount)?)
                .await?;
            println!("Withdrew {amount} {} from note {note_id}: {tx}", asset.to_uppercase());
            Ok(())
        }
        Command::Claim { note_id } => claim(&app, &note_id).await,
        Command::Liquidations { from, to_block } => liquidations(&app, &from, to_block).await,
    }
}

async fn watch(app: App) -> Result<()> {
    let App {
        config,
        env,
        reader,
        notifier,
        ..
    } = &app;

    let builder: Arc<dyn ReportBuilder> = Arc::new(app.report_builder());
    let schedule = ExecutionSchedule::from_config(&config.schedule)?;
    info!(next = %schedule.describe(chrono::Utc::now()), "Daily schedule ready");
    let daily = DailyCheckProcessor::new(schedule, builder, env.primary_note());

    let chain: Arc<dyn ChainReader> = reader.clone();
    let liquidations = LiquidationMonitor::new(
        Arc::new(NoteSearchClient::new()),
        chain.clone(),
        config.liquidation.thresholds()?,
    );

    let source: Arc<dyn TickSource> = match (config.driver.tick_mode, env.ws_url.as_deref()) {
        (TickMode::Block, Some(ws_url)) => Arc::new(BlockTickSource::new(BlockListener::new(ws_url), chain)),
        (TickMode::Block, None) => {
            warn!("ALCHEMY_WS_URL not set, falling back to interval ticks");
            Arc::new(IntervalTickSource::new(chain, config.driver.poll_interval()))
        }
        (TickMode::Interval, _) => Arc::new(IntervalTickSource::new(chain, config.driver.poll_interval())),
    };

    let settings = DriverSettings::from_config(config);
    let processor = TickProcessor::new(daily, liquidations, notifier.clone(), &settings);
    let driver = PollDriver::new(source, processor, config.driver.backoff_policy()?, settings);

    info!("Starting monitor");
    driver
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            info!("Shutdown signal received");
        })
        .await;

    Ok(())
}

async fn monitor(app: &App) -> Result<()> {
    let builder = app.report_builder();
    let mut reports = Vec::with_capacity(app.env.note_ids.len());
    for note_id in &app.env.note_ids {
        reports.push(builder.build(note_id, false).await?);
    }
    app.notifier.send(&reports.join("\n===\n")).await;
    Ok(())
}

async fn check_note(app: &App, note_id: &str) -> Result<()> {
    let id = parse_note_id(note_id)?;

    let cr = app.reader.collateral_ratio(id).await?;
    println!("Collateral Ratio for Note {note_id}: {}", format_number(wad_to_f64(cr), 3));

    let minted = app.reader.minted_dyad(id).await?;
    println!("Minted DYAD: ${}", format_wad(minted));

    for position in app.reader.vault_positions(id).await? {
        println!("{}: ${}", position.symbol, format_number(wad_to_f64(position.usd_value), 2));
    }
    Ok(())
}

async fn liquidate(app: &App, note_id: &str, amount: &str) -> Result<()> {
    let id = parse_note_id(note_id)?;
    let amount_wad = parse_wad(amount)?;

    let minted = app.reader.minted_dyad(id).await?;
    if amount_wad > minted {
        anyhow::bail!(
            "Cannot liquidate more than the minted amount. Note {note_id} has {} DYAD minted.",
            format_wad(minted)
        );
    }

    let sender = app.sender()?;
    let target = parse_note_id(app.env.primary_note())?;
    let cr = app.reader.collateral_ratio(id).await?;
    info!(note_id, amount, cr = %format_wad(cr), to = %target, "Liquidating note");

    let mint_tx = sender.mint_dyad(target, amount_wad).await?;
    println!("Minted {amount} DYAD on note {target}: {mint_tx}");

    let liquidate_tx = sender.liquidate(id, target, amount_wad).await?;
    println!("Liquidated note {note_id}: {liquidate_tx}");
    Ok(())
}

async fn claim(app: &App, note_id: &str) -> Result<()> {
    let id = parse_note_id(note_id)?;
    let sender = app.sender()?;

    let rewards = RewardsClient::new().fetch_rewards(note_id).await?;
    let claimed = app.reader.total_claimed(id).await?;
    let claimable = rewards.amount.saturating_sub(claimed);
    if claimable.is_zero() {
        println!("Nothing to claim for note {note_id}");
        return Ok(());
    }

    let tx = sender.claim_to_vault(id, rewards.amount, rewards.proof).await?;
    println!("Claimed {} KERO for note {note_id}: {tx}", format_wad(claimable));
    Ok(())
}

async fn liquidations(app: &App, from: &str, to_block: Option<u64>) -> Result<()> {
    let date = parse_date(from)?;
    let head = app.reader.latest_block().await?;
    let from_block = date_to_block(date, head.number, head.timestamp);
    info!(%date, from_block, head = head.number, "Resolved start block");

    let events = fetch_liquidations(&app.reader, from_block, to_block).await?;
    if events.is_empty() {
        println!("No liquidations since {date}");
        return Ok(());
    }

    for event in events {
        let time = event
            .timestamp
            .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "unknown time".to_string());
        println!(
            "{time} | block {} | note {} -> note {} | {} DYAD | liquidator {} | tx {}",
            event.block_number,
            event.id,
            event.to,
            format_wad(event.amount),
            event.from,
            event.tx_hash
        );
    }
    Ok(())
}
