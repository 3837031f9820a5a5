//! CLI command definitions and subcommands

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

use crate::domain::{SingleTrip, TripDetails, ValidationError};

/// TripPlanner - AI trip planning from the terminal
#[derive(Parser)]
#[command(
    name = "tp",
    about = "Plan, compare and book trips with a streaming AI planner",
    version,
    after_help = "Logs are written to: ~/.local/share/tripplanner/logs/tripplanner.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Plan a trip, load flights and hotels, optionally book
    Plan(PlanArgs),

    /// Show logs
    Logs {
        /// Follow log output (like tail -f)
        #[arg(short, long)]
        follow: bool,

        /// Number of lines to show
        #[arg(short = 'n', long, default_value = "50")]
        lines: usize,
    },
}

/// Arguments for `tp plan`
///
/// Either a round trip (`--origin`, `--destination`, `--depart`, `--return`)
/// or two to four `--leg` entries for a multi-city trip.
#[derive(Debug, Args)]
pub struct PlanArgs {
    /// Round trip origin city
    #[arg(long, conflicts_with = "legs")]
    pub origin: Option<String>,

    /// Round trip destination city
    #[arg(long, conflicts_with = "legs")]
    pub destination: Option<String>,

    /// Round trip departure date (YYYY-MM-DD)
    #[arg(long = "depart", value_parser = parse_date, conflicts_with = "legs")]
    pub departure_date: Option<NaiveDate>,

    /// Round trip return date (YYYY-MM-DD)
    #[arg(long = "return", value_parser = parse_date, conflicts_with = "legs")]
    pub return_date: Option<NaiveDate>,

    /// Multi-city leg as ORIGIN:DESTINATION:YYYY-MM-DD, repeatable
    #[arg(long = "leg", value_name = "LEG", value_parser = parse_leg)]
    pub legs: Vec<LegArg>,

    /// Total budget
    #[arg(short, long, default_value = "2000")]
    pub budget: f64,

    /// Number of travelers
    #[arg(short, long, default_value = "1")]
    pub passengers: u32,

    /// Select the recommended flight and hotel for every stop
    #[arg(long)]
    pub auto_select: bool,

    /// Book the selections (implies --auto-select)
    #[arg(long, requires = "email")]
    pub book: bool,

    /// Traveler email, used for subscription checks and booking
    #[arg(short, long)]
    pub email: Option<String>,
}

impl PlanArgs {
    /// Whether the arguments describe a multi-city trip
    pub fn is_multi_city(&self) -> bool {
        !self.legs.is_empty()
    }

    /// Round trip described by the flags
    pub fn single_trip(&self) -> Result<TripDetails, ValidationError> {
        debug!(?self.origin, ?self.destination, "single_trip: called");
        let details = TripDetails::Single(SingleTrip {
            origin: self.origin.clone().ok_or(ValidationError::MissingField("origin"))?,
            destination: self
                .destination
                .clone()
                .ok_or(ValidationError::MissingField("destination"))?,
            departure_date: self.departure_date.ok_or(ValidationError::MissingField("departure_date"))?,
            return_date: self.return_date.ok_or(ValidationError::MissingField("return_date"))?,
            budget: self.budget,
            passengers: self.passengers,
        });
        details.validate()?;
        Ok(details)
    }
}

/// One `--leg` value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegArg {
    pub origin: String,
    pub destination: String,
    pub departure_date: NaiveDate,
}

/// Parse `YYYY-MM-DD`
pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|e| format!("Invalid date '{}': {}", s, e))
}

/// Parse `ORIGIN:DESTINATION:YYYY-MM-DD`
pub fn parse_leg(s: &str) -> Result<LegArg, String> {
    debug!(%s, "parse_leg: called");
    let (cities, date) = s
        .rsplit_once(':')
        .ok_or_else(|| format!("Invalid leg '{}': expected ORIGIN:DESTINATION:YYYY-MM-DD", s))?;
    let (origin, destination) = cities
        .split_once(':')
        .ok_or_else(|| format!("Invalid leg '{}': expected ORIGIN:DESTINATION:YYYY-MM-DD", s))?;
    let (origin, destination) = (origin.trim(), destination.trim());
    if origin.is_empty() || destination.is_empty() {
        return Err(format!("Invalid leg '{}': origin and destination are required", s));
    }
    Ok(LegArg {
        origin: origin.to_string(),
        destination: destination.to_string(),
        departure_date: parse_date(date)?,
    })
}

/// Get the path to the log file
pub fn get_log_path() -> PathBuf {
    debug!("get_log_path: called");
    let path = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tripplanner")
        .join("logs")
        .join("tripplanner.log");
    debug!(?path, "get_log_path: returning path");
    path
}
