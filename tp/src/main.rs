//! TripPlanner - AI trip planning from the terminal
//!
//! CLI entry point: plans a trip over the streaming planner, loads flights
//! and hotels, shows recommendations and optionally books.

use std::fs;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{CommandFactory, Parser};
use colored::Colorize;
use eyre::{Context, Result};
use tracing::{debug, info};

use tripplanner::api::HttpTravelApi;
use tripplanner::cli::{Cli, Command, PlanArgs, get_log_path};
use tripplanner::config::Config;
use tripplanner::domain::{MultiCityForm, StepKind, TripDetails, WorkflowStep};
use tripplanner::store::FileFormStore;
use tripplanner::trip::TripSession;

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tripplanner")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Priority: CLI --log-level > config file > INFO
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    // Appended so `tp logs` can show earlier runs
    let log_file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("tripplanner.log"))
        .context("Failed to open log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Config first so its log level can apply
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    setup_logging(cli.log_level.as_deref(), config.log_level.as_deref()).context("Failed to setup logging")?;

    info!("TripPlanner loaded config: base-url={}", config.api.base_url);

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Some(Command::Plan(args)) => cmd_plan(&config, args).await,
        Some(Command::Logs { follow, lines }) => cmd_logs(follow, lines),
        None => {
            Cli::command().print_help()?;
            println!();
            Ok(())
        }
    }
}

/// Plan, search, select and optionally book one trip
async fn cmd_plan(config: &Config, args: PlanArgs) -> Result<()> {
    debug!(?args, "cmd_plan: called");
    config.validate()?;

    let api = Arc::new(HttpTravelApi::from_config(&config.api).context("Failed to create API client")?);
    let store = FileFormStore::new(config.storage.form_state_path());
    let mut session = TripSession::new(api, Box::new(store));

    if let Some(previous) = session.restore_form() {
        debug!(trip_type = %previous.trip_type(), "cmd_plan: previous form found");
        println!("{}", format!("Replacing unfinished {} trip from an earlier run", previous.trip_type()).dimmed());
    }

    let details = build_trip(&session, &args).await?;

    println!("{}", "Planning your trip...".bold());
    let result = session.plan_with(details, print_step).await;
    if let Some(plan) = session.state().plan() {
        println!();
        println!("{}", plan);
        println!();
    }
    if let Err(e) = result {
        if e.is_subscription_required() {
            return Err(eyre::eyre!("{} Subscribe to plan multi-city trips.", e));
        }
        return Err(e.into());
    }

    print_results(&session);

    if args.auto_select || args.book {
        let selected = session.select_recommended()?;
        println!("Selected {} recommended option(s)", selected);
    }

    let total = session.total_cost();
    if session.is_complete() {
        println!("{} total {:.2}", "Ready to book:".green().bold(), total);
    } else {
        println!("{} ({})", "Selections incomplete".yellow(), session.phase());
    }

    if args.book {
        // `requires = "email"` guarantees this
        let email = args.email.as_deref().unwrap_or_default();
        let confirmation = session.book(email).await?;
        let id = confirmation.id.map(|id| id.to_string()).unwrap_or_else(|| "-".to_string());
        println!("{} booking {} for {}", "Booked:".green().bold(), id, email);
        debug!(phase = %session.phase(), "cmd_plan: booking complete");
    }

    Ok(())
}

/// Turn CLI arguments into validated trip details
///
/// Legs are added one at a time so the subscription gate applies to the
/// second and later legs.
async fn build_trip(session: &TripSession, args: &PlanArgs) -> Result<TripDetails> {
    if !args.is_multi_city() {
        return Ok(args.single_trip()?);
    }

    let subscribed = match (&args.email, args.legs.len() > 1) {
        (Some(email), true) => session.has_active_subscription(email).await,
        _ => false,
    };
    debug!(subscribed, legs = args.legs.len(), "build_trip: multi-city");

    let mut form = MultiCityForm::new();
    for leg in &args.legs {
        form.add_leg(&leg.origin, &leg.destination, leg.departure_date, subscribed)
            .context(format!("Cannot add leg {} -> {}", leg.origin, leg.destination))?;
    }
    Ok(form.build(args.budget, args.passengers)?)
}

fn print_step(step: &WorkflowStep) {
    let label = format!("[{}]", step.kind);
    let label = match step.kind {
        StepKind::Error => label.red(),
        StepKind::AgentStart | StepKind::AgentEnd => label.cyan(),
        StepKind::Handoff => label.magenta(),
        _ => label.dimmed(),
    };
    match step.duration() {
        Some(duration) => println!("{} {} ({:.1}s)", label, step.message, duration.as_secs_f64()),
        None => println!("{} {}", label, step.message),
    }
}

fn print_results(session: &TripSession) {
    let state = session.state();
    let picks = state.recommendations();

    if !state.flights().is_empty() || !state.hotels().is_empty() {
        println!("{} {}", "Flights:".bold(), state.flights().len());
        println!("{} {}", "Hotels:".bold(), state.hotels().len());
        if let Some(id) = &picks.flight {
            println!("  recommended flight: {}", id.green());
        }
        if let Some(id) = &picks.hotel {
            println!("  recommended hotel:  {}", id.green());
        }
    }

    for (leg, flights) in state.flights_by_leg() {
        let pick = picks.flights_by_leg.get(leg).map(String::as_str).unwrap_or("-");
        println!("{} {} option(s), recommended {}", leg.bold(), flights.len(), pick.green());
    }
    for (city, hotels) in state.hotels_by_city() {
        let pick = picks.hotels_by_city.get(city).map(String::as_str).unwrap_or("-");
        println!("{} {} hotel(s), recommended {}", city.bold(), hotels.len(), pick.green());
    }
}

/// Show logs
fn cmd_logs(follow: bool, lines: usize) -> Result<()> {
    let log_path = get_log_path();

    if !log_path.exists() {
        println!("No log file found at: {}", log_path.display());
        return Ok(());
    }

    if follow {
        println!("Following log file: {} (Ctrl+C to stop)", log_path.display());
        println!();

        let mut child = std::process::Command::new("tail")
            .args(["-f", "-n", &lines.to_string()])
            .arg(&log_path)
            .spawn()
            .context("Failed to run tail -f")?;

        child.wait()?;
    } else {
        println!("Log file: {}", log_path.display());
        let file = fs::File::open(&log_path).context("Failed to open log file")?;
        let reader = BufReader::new(file);
        let all_lines: Vec<String> = reader.lines().map_while(Result::ok).collect();

        let start = all_lines.len().saturating_sub(lines);
        for line in &all_lines[start..] {
            println!("{}", line);
        }
    }

    Ok(())
}
