//! TripPlanner - confidence-driven travel itinerary planner
//!
//! CLI entry point for planning trips and managing planning sessions.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use tracing::{debug, info, warn};

use tripplanner::cli::{Cli, Command, OutputFormat};
use tripplanner::config::Config;
use tripplanner::domain::Itinerary;
use tripplanner::llm::create_client;
use tripplanner::planner::{PlanResponse, Planner};
use tripplanner::state::StateManager;
use tripplanner::travel::MockTravelProvider;

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Note: Can't log params here since logging isn't initialized yet
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tripplanner")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Level priority: CLI --log-level > config file > default (INFO)
    let level_str = cli_log_level.or(config_log_level);
    let level = match level_str.map(str::to_uppercase).as_deref() {
        Some("TRACE") => tracing::Level::TRACE,
        Some("DEBUG") => tracing::Level::DEBUG,
        Some("INFO") | None => tracing::Level::INFO,
        Some("WARN") | Some("WARNING") => tracing::Level::WARN,
        Some("ERROR") => tracing::Level::ERROR,
        Some(other) => {
            eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", other);
            tracing::Level::INFO
        }
    };

    let log_file = fs::File::create(log_dir.join("tripplanner.log")).context("Failed to create log file")?;

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

    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref())?;

    let config = Config::load(cli.config.as_ref())?;
    config.validate()?;
    debug!("main: config loaded and validated");

    let state = StateManager::spawn_with_ttl(&config.storage.sessionstore_dir, config.storage.ttl_secs())?;

    // Model assist is optional: without a key the extractor runs rules-only
    let llm = match create_client(&config.llm) {
        Ok(client) => Some(client),
        Err(e) => {
            warn!(error = %e, "LLM client unavailable, extraction will use rules only");
            None
        }
    };

    let planner = Planner::new(&config, llm, Arc::new(MockTravelProvider::new()), state.clone());

    match cli.command {
        Command::Plan {
            query,
            session_id,
            format,
        } => {
            info!(%query, "main: planning");
            let response = planner.plan(&query, session_id).await?;
            render_response(&response, format)?;
        }

        Command::Resume {
            session_id,
            details,
            format,
        } => {
            info!(%session_id, "main: resuming");
            let response = planner.resume(&session_id, &details).await?;
            render_response(&response, format)?;
        }

        Command::Status { session_id } => {
            let status = planner.session_status(&session_id).await?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }

        Command::Trace { session_id } => {
            for line in planner.execution_trace(&session_id).await? {
                println!("{}", line);
            }
        }

        Command::Sessions { purge_expired } => {
            if purge_expired {
                let removed = state.purge_expired().await?;
                println!("Purged {} expired session(s)", removed);
            }
            for id in state.list_sessions().await? {
                println!("{}", id);
            }
        }
    }

    state.shutdown().await;
    Ok(())
}

fn render_response(response: &PlanResponse, format: OutputFormat) -> Result<()> {
    debug!(success = response.success, ?format, "render_response: called");

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(response)?);
        return Ok(());
    }

    println!("{} {}", "Session:".bold(), response.session_id);

    if let Some(error) = &response.error {
        println!("{} {}", "Planning failed:".red().bold(), error);
        return Ok(());
    }

    if response.needs_clarification {
        println!("{}", "More information needed before planning can continue:".yellow().bold());
        for (i, question) in response.clarification_questions.iter().enumerate() {
            println!("  {}. {}", i + 1, question);
        }
        println!(
            "\nAnswer with: {} {} \"<details>\"",
            "tp resume".cyan(),
            response.session_id
        );
        return Ok(());
    }

    if let Some(itinerary) = &response.itinerary {
        render_itinerary(itinerary, response.retry_count);
    }

    Ok(())
}

fn render_itinerary(itinerary: &Itinerary, retry_count: u32) {
    println!("\n{}", itinerary.title.bold().underline());
    println!("{}\n", itinerary.description);

    println!(
        "{} {} -> {}  ({} days, {} traveler(s))",
        "Dates:".bold(),
        itinerary.start_date.format("%Y-%m-%d"),
        itinerary.end_date.format("%Y-%m-%d"),
        itinerary.duration_days,
        itinerary.traveler_count
    );
    println!(
        "{} {:.2} {}  (after {} retr{})",
        "Total cost:".bold(),
        itinerary.total_cost,
        itinerary.currency,
        retry_count,
        if retry_count == 1 { "y" } else { "ies" }
    );

    if !itinerary.highlights.is_empty() {
        println!("\n{}", "Highlights".bold());
        for highlight in &itinerary.highlights {
            println!("  - {}", highlight);
        }
    }

    for day in &itinerary.days {
        println!(
            "\n{} {} ({}, {:.0}°F-{:.0}°F)",
            format!("Day {}", day.day_number).cyan().bold(),
            day.date.format("%Y-%m-%d"),
            day.weather_forecast.description,
            day.weather_forecast.temperature_low,
            day.weather_forecast.temperature_high,
        );

        for activity in &day.activities {
            println!("  {} {} (${:.0})", activity.time.dimmed(), activity.name, activity.cost);
        }
        for meal in &day.meals {
            println!("  {} {} (${:.0})", meal.time.dimmed(), meal.name, meal.cost);
        }
        for leg in &day.transportation {
            println!("  {} {} (${:.0})", leg.time.dimmed(), leg.name, leg.cost);
        }
        println!("  {} ${:.2}", "Day total:".dimmed(), day.estimated_cost);
    }

    println!("\n{}", "Budget breakdown".bold());
    for (category, amount) in &itinerary.budget_breakdown {
        println!("  {:<16} ${:.2}", category, amount);
    }
}
