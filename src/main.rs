//! a11yscan command-line interface

use a11yscan::{
    analysis::backend::{HttpBackend, ModelBackend},
    billing::{FixedTierResolver, HttpTierResolver, Tier, TierResolver},
    config::{Config, LogFormat},
    export::ExportFormat,
    fetch::{PageFetcher, PageSource},
    scan::ScanCoordinator,
    simulator::SimulationMode,
    types::{ScanMode, ScanOutcome, ScanRequest},
    util::truncate_str,
};
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "a11yscan")]
#[command(about = "AI-assisted WCAG accessibility scanner")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "a11yscan.toml")]
    config: PathBuf,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a URL for accessibility issues
    Scan {
        /// Website URL (scheme optional)
        url: String,

        /// User identity (email) the scan is attributed to
        #[arg(short, long, default_value = "anonymous@freeuser.com")]
        identity: String,

        /// Analyze every chunk instead of the first (paid tiers)
        #[arg(short, long)]
        full: bool,

        /// Output format (text, json)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Narrate a page through a disability persona
    Simulate {
        /// Website URL (scheme optional)
        url: String,

        /// Persona id (see `personas`)
        #[arg(short, long)]
        persona: String,

        /// User identity (email)
        #[arg(short, long)]
        identity: String,

        /// Narrate every chunk without the digest pass
        #[arg(short, long)]
        full: bool,
    },

    /// Export a scan report as pdf, csv, or xlsx
    Export {
        /// Website URL (scheme optional)
        url: String,

        /// User identity (email)
        #[arg(short, long)]
        identity: String,

        /// Artifact format (pdf, csv, xlsx)
        #[arg(short, long)]
        format: String,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// List available personas
    Personas,

    /// Print a plan-upgrade checkout URL
    Upgrade {
        /// User identity (email)
        #[arg(short, long)]
        identity: String,

        /// Target plan (pro, agency, enterprise)
        #[arg(short, long, default_value = "pro")]
        plan: String,
    },

    /// Write a default configuration file
    Init {
        /// Output directory
        #[arg(default_value = ".")]
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load or create config
    let config = if cli.config.exists() {
        Config::load(&cli.config)?
    } else {
        Config::default()
    };

    // Setup logging: verbosity flags override the configured level
    let log_level = match cli.verbose {
        0 => config.logging.level.to_tracing(),
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let builder = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false);
    match config.logging.format {
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish())?,
        LogFormat::Text => tracing::subscriber::set_global_default(builder.finish())?,
    }

    match cli.command {
        Commands::Scan {
            url,
            identity,
            full,
            format,
        } => run_scan(config, url, identity, full, format).await,
        Commands::Simulate {
            url,
            persona,
            identity,
            full,
        } => run_simulation(config, url, persona, identity, full).await,
        Commands::Export {
            url,
            identity,
            format,
            output,
        } => run_export(config, url, identity, format, output).await,
        Commands::Personas => list_personas(config),
        Commands::Upgrade { identity, plan } => print_checkout_url(config, identity, plan).await,
        Commands::Init { path } => init_config(path),
    }
}

fn build_coordinator(config: &Config) -> Result<ScanCoordinator> {
    let fetcher: Arc<dyn PageSource> = Arc::new(PageFetcher::new(config.fetch.clone())?);
    let backend: Arc<dyn ModelBackend> = Arc::new(HttpBackend::new(&config.analysis)?);

    let billing_configured =
        config.billing.api_key.is_some() || std::env::var("STRIPE_SECRET_KEY").is_ok();
    let tier_resolver: Arc<dyn TierResolver> = if billing_configured {
        Arc::new(HttpTierResolver::new(&config.billing, "https://localhost/")?)
    } else {
        info!("No billing provider configured; assuming Pro tier");
        Arc::new(FixedTierResolver::with_default(Tier::Pro))
    };

    ScanCoordinator::new(config, fetcher, backend, tier_resolver)
}

async fn scan_once(
    coordinator: &ScanCoordinator,
    url: String,
    identity: String,
    full: bool,
) -> Result<ScanOutcome> {
    let mode = if full { ScanMode::Full } else { ScanMode::Preview };
    let request = ScanRequest::new(url, identity, mode);
    Ok(coordinator.run_scan(&request).await?)
}

async fn run_scan(
    config: Config,
    url: String,
    identity: String,
    full: bool,
    format: String,
) -> Result<()> {
    let coordinator = build_coordinator(&config)?;
    let outcome = scan_once(&coordinator, url, identity, full).await?;

    match format.as_str() {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&*outcome.report)?);
        }
        _ => {
            let report = &outcome.report;
            println!("\nAccessibility Report for {}", report.url);
            println!("=========================");
            println!("Score: {:.0}/100", report.score);
            if outcome.cache_hit {
                println!("(served from cache)");
            }
            println!("\nSummary:\n{}", report.summary);
            println!("\nIssues ({}):", report.issues.len());
            for (i, issue) in report.issues.iter().enumerate() {
                println!(
                    "{}. [{}] {} ({})",
                    i + 1,
                    issue.criterion,
                    truncate_str(&issue.description, 100),
                    issue.severity
                );
                println!("   Fix: {}", truncate_str(&issue.fix, 100));
            }
            for warning in &outcome.warnings {
                println!("\nWarning: {}", warning);
            }
            println!("\n{}", report.disclaimer);
        }
    }

    Ok(())
}

async fn run_simulation(
    config: Config,
    url: String,
    persona: String,
    identity: String,
    full: bool,
) -> Result<()> {
    let coordinator = build_coordinator(&config)?;

    // Reuse the scan pipeline (and its cache) to obtain the page HTML
    let outcome = scan_once(&coordinator, url, identity.clone(), false).await?;

    let mode = if full {
        SimulationMode::Full
    } else {
        SimulationMode::Abbreviated
    };
    let cancel = AtomicBool::new(false);
    let simulation = coordinator
        .run_simulation(&identity, &outcome.report.html, &persona, mode, &cancel)
        .await?;

    let label = coordinator
        .personas()
        .get(&persona)
        .map(|p| p.label.clone())
        .unwrap_or_else(|| persona.clone());
    println!("\nPersona Simulation — {}", label);
    println!("({} chunks narrated)\n", simulation.chunk_count);
    println!("{}", simulation.narrative);

    Ok(())
}

async fn run_export(
    config: Config,
    url: String,
    identity: String,
    format: String,
    output: PathBuf,
) -> Result<()> {
    let export_format: ExportFormat = format
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;

    let coordinator = build_coordinator(&config)?;
    let outcome = scan_once(&coordinator, url, identity.clone(), false).await?;

    let bytes = coordinator
        .export_report(&identity, &outcome.report, export_format)
        .await?;
    std::fs::write(&output, &bytes)?;
    println!("Wrote {} bytes to {}", bytes.len(), output.display());

    Ok(())
}

fn list_personas(config: Config) -> Result<()> {
    let library = a11yscan::simulator::PersonaLibrary::load(&config.simulator.personas_path);

    println!("\nAvailable personas:");
    for (id, persona) in library.iter() {
        println!("  {} — {}", id, persona.label);
        println!("      {}", persona.description);
    }

    Ok(())
}

async fn print_checkout_url(config: Config, identity: String, plan: String) -> Result<()> {
    let price_id = match plan.to_ascii_lowercase().as_str() {
        "pro" => config.billing.pro_price_id.clone(),
        "agency" => config.billing.agency_price_id.clone(),
        "enterprise" => config.billing.enterprise_price_id.clone(),
        other => anyhow::bail!("Unknown plan: {}", other),
    }
    .ok_or_else(|| anyhow::anyhow!("No price id configured for plan '{}'", plan))?;

    let coordinator = build_coordinator(&config)?;
    let url = coordinator.checkout_url(&identity, &price_id).await?;
    println!("{}", url);

    Ok(())
}

fn init_config(path: PathBuf) -> Result<()> {
    let config = Config::default();
    let config_path = path.join("a11yscan.toml");

    let toml_content = toml::to_string_pretty(&config)?;
    std::fs::write(&config_path, toml_content)?;
    println!("Created configuration file: {}", config_path.display());

    std::fs::create_dir_all(&config.storage.data_dir)?;
    println!("Created data directory: {}", config.storage.data_dir.display());

    Ok(())
}
