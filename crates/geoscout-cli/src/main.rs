mod wiring;

use std::convert::Infallible;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use geoscout_core::{
    ConversationTurn, Location, PlaceRef, PoiType, QueryContext, TransportMode, UseCaseResult,
    UserPreferences,
};
use geoscout_engine::{
    enroute, near_poi, nearest, within_time, EnrouteParams, NearPoiParams, NearestParams,
    OrchestrateRequest, OrchestrationResult, QueryClassifier, RuleBasedClassifier,
    WithinTimeParams,
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "geoscout")]
#[command(about = "Answer location questions from free text or structured parameters")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Classify and answer a free-text query
    Ask {
        query: String,
        /// Your location as "lat,lng"
        #[arg(long)]
        at: Option<Location>,
        #[arg(long, default_value = "cli")]
        user: String,
        /// Earlier queries in this conversation, oldest first
        #[arg(long = "previous")]
        previous: Vec<String>,
        /// Let stored preferences bias defaults
        #[arg(long)]
        memory: bool,
        #[arg(long = "prefer-transport")]
        prefer_transport: Vec<TransportMode>,
        #[arg(long = "prefer-poi")]
        prefer_poi: Vec<PoiType>,
    },
    /// Show how a query would be classified without running it
    Classify {
        query: String,
        #[arg(long = "previous")]
        previous: Vec<String>,
    },
    /// POIs reachable within a travel-time budget
    WithinTime {
        #[arg(long)]
        at: Location,
        #[arg(long = "type")]
        poi_type: PoiType,
        #[arg(long, default_value = "15")]
        minutes: u32,
        #[arg(long, default_value = "walking")]
        transport: TransportMode,
        #[arg(long)]
        cuisine: Option<String>,
    },
    /// Closest POI of a type plus alternatives
    Nearest {
        #[arg(long)]
        at: Location,
        #[arg(long = "type")]
        poi_type: PoiType,
        #[arg(long, default_value = "walking")]
        transport: TransportMode,
    },
    /// POIs within a travel time of the nearest POI of another type
    NearPoi {
        #[arg(long)]
        at: Location,
        #[arg(long = "type")]
        poi_type: PoiType,
        /// Type of the anchor POI
        #[arg(long)]
        near: PoiType,
        #[arg(long, default_value = "10")]
        minutes: u32,
        #[arg(long, default_value = "walking")]
        transport: TransportMode,
    },
    /// Stopovers on the way to a destination
    Enroute {
        #[arg(long)]
        at: Location,
        /// Destination as "lat,lng" or a place name
        #[arg(long, value_parser = parse_place)]
        to: PlaceRef,
        #[arg(long = "type")]
        poi_type: PoiType,
        #[arg(long, default_value = "driving")]
        transport: TransportMode,
        #[arg(long, default_value = "180")]
        max_total: u32,
        #[arg(long, default_value = "10")]
        max_detour: u32,
    },
}

fn parse_place(value: &str) -> Result<PlaceRef, Infallible> {
    Ok(value.parse::<Location>().map_or_else(
        |_| PlaceRef::Text(value.trim().to_owned()),
        PlaceRef::Coordinates,
    ))
}

fn history(previous: Vec<String>) -> Vec<ConversationTurn> {
    previous.into_iter().map(ConversationTurn::user).collect()
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Prints a use-case result in the same envelope the orchestrator uses.
fn report<T: Serialize>(result: UseCaseResult<T>) -> anyhow::Result<ExitCode> {
    match result {
        Ok(output) => {
            print_json(&serde_json::json!({
                "status": "success",
                "data": output.data,
                "metadata": output.metadata,
            }))?;
            Ok(ExitCode::SUCCESS)
        }
        Err(error) => {
            print_json(&serde_json::json!({ "status": "error", "error": error }))?;
            Ok(ExitCode::FAILURE)
        }
    }
}

#[tokio::main]
#[allow(clippy::too_many_lines)]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();
    let config = geoscout_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Ask {
            query,
            at,
            user,
            previous,
            memory,
            prefer_transport,
            prefer_poi,
        } => {
            let preferences = (!prefer_transport.is_empty() || !prefer_poi.is_empty()).then(|| {
                UserPreferences {
                    favorite_transport_modes: prefer_transport,
                    favorite_poi_types: prefer_poi,
                }
            });
            let request = OrchestrateRequest {
                query,
                user_id: user,
                user_location: at,
                conversation_history: history(previous),
                memory_enabled: memory,
                preferences,
                last_classification: None,
            };
            let orchestrator = wiring::build_orchestrator(&config)?;
            let response = orchestrator.orchestrate(request).await;
            print_json(&response)?;
            Ok(match response.result {
                OrchestrationResult::Success { .. } => ExitCode::SUCCESS,
                OrchestrationResult::Error { .. } => ExitCode::FAILURE,
            })
        }
        Commands::Classify { query, previous } => {
            let context = QueryContext {
                history: history(previous),
                ..QueryContext::default()
            };
            match RuleBasedClassifier::new().classify(&query, &context).await {
                Ok(classification) => {
                    print_json(&classification)?;
                    Ok(ExitCode::SUCCESS)
                }
                Err(error) => {
                    print_json(&error)?;
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Commands::WithinTime {
            at,
            poi_type,
            minutes,
            transport,
            cuisine,
        } => {
            let services = wiring::build_services(&config)?;
            let mut params = WithinTimeParams::new(at, poi_type, minutes, transport);
            params.cuisine = cuisine;
            params.max_results = config.max_results;
            report(within_time(&services, params).await)
        }
        Commands::Nearest {
            at,
            poi_type,
            transport,
        } => {
            let services = wiring::build_services(&config)?;
            report(nearest(&services, NearestParams::new(at, poi_type, transport)).await)
        }
        Commands::NearPoi {
            at,
            poi_type,
            near,
            minutes,
            transport,
        } => {
            let services = wiring::build_services(&config)?;
            let mut params = NearPoiParams::new(at, poi_type, near, transport, minutes);
            params.max_results = config.max_results;
            report(near_poi(&services, params).await)
        }
        Commands::Enroute {
            at,
            to,
            poi_type,
            transport,
            max_total,
            max_detour,
        } => {
            let services = wiring::build_services(&config)?;
            let mut params =
                EnrouteParams::new(at, to, poi_type, transport, max_total, max_detour);
            params.max_results = config.max_results;
            report(enroute(&services, params).await)
        }
    }
}

#[cfg(test)]
mod tests;
