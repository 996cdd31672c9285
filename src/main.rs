//! CLI interface for trip-concierge

use anyhow::Result;
use clap::{Parser, Subcommand};

use trip_concierge::{extract, missing_fields_prompt, Config, Providers};

#[derive(Parser)]
#[command(name = "trip-concierge")]
#[command(about = "Travel planning from the command line")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract trip details from a free-text travel request
    Parse {
        /// The travel request text
        prompt: String,
    },
    /// Search for flights between two cities
    Flights {
        /// Departure city or airport code
        #[arg(short, long)]
        from: String,
        /// Destination city or airport code
        #[arg(short, long)]
        to: String,
        /// Departure date (YYYY-MM-DD)
        #[arg(short, long)]
        date: String,
        /// Return date for round trips (YYYY-MM-DD)
        #[arg(short, long)]
        return_date: Option<String>,
    },
    /// Show the forecast and typical weather for a destination
    Weather {
        /// Destination city
        #[arg(short, long)]
        destination: String,
        /// Trip start date (YYYY-MM-DD)
        #[arg(short, long)]
        start: String,
        /// Trip end date (YYYY-MM-DD)
        #[arg(short, long)]
        end: String,
    },
    /// List sightseeing suggestions for a city
    Attractions {
        /// The city to look up
        city: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;
    let providers = Providers::from_config(&config);

    match cli.command {
        Commands::Parse { prompt } => {
            let trip = extract::extract_trip_request(&providers.llm, &prompt).await?;
            println!("{}", serde_json::to_string_pretty(&trip)?);
            let missing = trip.missing_labels();
            if !missing.is_empty() {
                println!("\n{}", missing_fields_prompt(&missing));
            }
        }
        Commands::Flights {
            from,
            to,
            date,
            return_date,
        } => {
            let result = providers
                .flights
                .search(&from, &to, &date, return_date.as_deref())
                .await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Weather {
            destination,
            start,
            end,
        } => {
            let report = providers
                .weather
                .report(&providers.llm, &destination, &start, &end)
                .await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Attractions { city } => {
            let attractions = providers.attractions.lookup(&city).await?;
            println!("{}", serde_json::to_string_pretty(&attractions)?);
        }
    }

    Ok(())
}
