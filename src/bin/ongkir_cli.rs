use anyhow::Context;
use clap::{Parser, Subcommand};
use ongkir_finder::core::calculator::CalculateRequest;
use ongkir_finder::core::locator::NearestAgentsQuery;
use ongkir_finder::utils::{logger, validation::Validate};
use ongkir_finder::{AppState, ServiceConfig};

#[derive(Parser)]
#[command(name = "ongkir-cli")]
#[command(about = "One-shot nearest agent and shipping cost lookups")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "ongkir.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the five nearest agents
    Nearest {
        #[arg(long)]
        village_id: Option<String>,
        #[arg(long)]
        city_id: Option<String>,
        #[arg(long, allow_hyphen_values = true)]
        lat: Option<String>,
        #[arg(long, allow_hyphen_values = true)]
        lng: Option<String>,
    },
    /// Quote shipping costs from an agent to a destination city
    Quote {
        #[arg(long)]
        agent: String,
        /// Package weight in kilograms
        #[arg(long)]
        weight: f64,
        #[arg(long)]
        origin: String,
        #[arg(long)]
        destination: String,
        /// Destination city label
        #[arg(long)]
        destination_name: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logger::init_cli_logger(args.verbose);

    let config = ServiceConfig::from_file(&args.config)
        .with_context(|| format!("Failed to load config file '{}'", args.config))?;
    config.validate().context("Configuration validation failed")?;

    let state = AppState::from_config(&config)?;

    let output = match args.command {
        Command::Nearest {
            village_id,
            city_id,
            lat,
            lng,
        } => {
            let query = NearestAgentsQuery {
                village_id,
                city_id,
                lat,
                lng,
            };
            let agents = state.locator.nearest(&query).await?;
            serde_json::to_string_pretty(&agents)?
        }
        Command::Quote {
            agent,
            weight,
            origin,
            destination,
            destination_name,
        } => {
            let request = CalculateRequest {
                agent_kode: Some(agent),
                weight: Some(weight),
                destination: destination_name,
                origin_city_id: Some(origin),
                destination_city_id: Some(destination),
                destination_province: None,
            };
            let result = state.calculator.calculate(&request).await?;
            if result.fallback {
                tracing::warn!("⚠️ No carrier returned a usable rate; showing estimated cost");
            }
            serde_json::to_string_pretty(&result)?
        }
    };

    println!("{}", output);
    Ok(())
}
