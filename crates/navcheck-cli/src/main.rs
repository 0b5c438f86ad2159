//! CLI for running the navigation demo UI-test helpers against an automation agent.
//!
//! Every subcommand connects to the agent, runs one helper and prints its
//! result. Failed assertions exit with code 1, agent or connection failures
//! with 2, and bad input or configuration with 3.
//!
//! # Usage
//!
//! ```bash
//! # Dismiss the location permission alert
//! navcheck dismiss-alert
//!
//! # Answer the simulation alert
//! navcheck select-alert-action Yes
//!
//! # Drop a destination marker by long press at (110, 110) on the waypoint map
//! navcheck set-destination --long-press
//!
//! # Slow the route simulation down, then follow the maneuvers
//! navcheck adapt-simulation
//! navcheck maneuvers route.json --landscape
//!
//! # Wait for arrival, logging each step as JSON lines
//! navcheck --log steps.jsonl wait-arrival
//!
//! # Read the ETA widget as JSON
//! navcheck --format json eta
//!
//! # Talk to an agent on another port
//! NAVCHECK_AGENT_PORT=9801 navcheck has-arrived
//! ```

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use navcheck_core::agent_driver::AgentDriver;
use navcheck_core::config::NavcheckConfig;
use navcheck_core::driver::AutomationDriver;
use navcheck_core::element::Point;
use navcheck_core::interaction::ActionError;
use navcheck_core::navigation::{DriveNavigation, Gesture, Maneuver, DEFAULT_DESTINATION_POINT};

/// Run navigation demo UI-test helpers against an automation agent.
#[derive(Parser)]
#[command(name = "navcheck")]
#[command(about = "Run navigation demo UI-test helpers against an automation agent")]
#[command(version)]
struct Cli {
    /// Agent host (overrides the config file)
    #[arg(long, env = "NAVCHECK_AGENT_HOST")]
    host: Option<String>,

    /// Agent port (overrides the config file)
    #[arg(short, long, env = "NAVCHECK_AGENT_PORT")]
    port: Option<u16>,

    /// Config file to use instead of ~/.navcheck/config.json
    #[arg(short, long, env = "NAVCHECK_CONFIG")]
    config: Option<PathBuf>,

    /// Output format: text or json
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,

    /// Append each helper's step log to this file as JSON lines
    #[arg(long)]
    log: Option<PathBuf>,

    /// Write tracing output to navcheck.log in this directory instead of stderr
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Wait for the location permission alert and dismiss it
    DismissAlert,

    /// Wait for the simulation alert and tap one of its buttons
    SelectAlertAction {
        /// Button title, e.g. "Yes"
        title: String,
    },

    /// Check the route overview's back button, start button and map
    RouteOverview,

    /// Check that the waypoint map shows no destination yet
    WaypointMap,

    /// Drop a destination marker on the waypoint map
    SetDestination {
        /// Long press instead of tapping
        #[arg(short, long)]
        long_press: bool,
        /// X offset within the map view
        #[arg(short, long, default_value_t = DEFAULT_DESTINATION_POINT.x)]
        x: f64,
        /// Y offset within the map view
        #[arg(short, long, default_value_t = DEFAULT_DESTINATION_POINT.y)]
        y: f64,
    },

    /// Follow the maneuver panel through a route simulation
    Maneuvers {
        /// JSON file with a list of {"address": ..., "icon": ...} objects
        file: PathBuf,
        /// Check the landscape icons
        #[arg(long)]
        landscape: bool,
    },

    /// Wait until the destination is reached
    WaitArrival,

    /// Report whether the destination has been reached
    HasArrived,

    /// Check the speed view colors
    VerifySpeeding {
        /// Expect the overspeed colors instead of the regular ones
        #[arg(long)]
        speeding: bool,
    },

    /// Slow the route simulation down for automation
    AdaptSimulation,

    /// Speed the route simulation up
    SpeedUp,

    /// Read ETA, trip duration and distance from the arrival widget
    Eta,

    /// Sleep until the views reflect the next position update
    SleepViews,

    /// Sleep for one minute
    SleepMinute,

    /// Print the effective configuration without connecting
    Config,
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::DismissAlert => "dismiss-alert",
            Command::SelectAlertAction { .. } => "select-alert-action",
            Command::RouteOverview => "route-overview",
            Command::WaypointMap => "waypoint-map",
            Command::SetDestination { .. } => "set-destination",
            Command::Maneuvers { .. } => "maneuvers",
            Command::WaitArrival => "wait-arrival",
            Command::HasArrived => "has-arrived",
            Command::VerifySpeeding { .. } => "verify-speeding",
            Command::AdaptSimulation => "adapt-simulation",
            Command::SpeedUp => "speed-up",
            Command::Eta => "eta",
            Command::SleepViews => "sleep-views",
            Command::SleepMinute => "sleep-minute",
            Command::Config => "config",
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let _guard = init_tracing(cli.log_dir.as_deref());

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    }
}

/// Installs the tracing subscriber. The returned guard flushes the log file
/// on drop and must live until exit.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = |default: &str| {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
    };
    match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir).ok();
            let file_appender = tracing_appender::rolling::never(dir, "navcheck.log");
            let (writer, guard) = tracing_appender::non_blocking(file_appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter("info"))
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter("warn"))
                .with_writer(std::io::stderr)
                .init();
            None
        }
    }
}

#[derive(Debug)]
enum CliError {
    Assertion(String),
    Connection(String),
    Input(String),
}

impl CliError {
    fn exit_code(&self) -> ExitCode {
        match self {
            CliError::Assertion(_) => ExitCode::from(1),
            CliError::Connection(_) => ExitCode::from(2),
            CliError::Input(_) => ExitCode::from(3),
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Assertion(msg) => write!(f, "Assertion failed: {}", msg),
            CliError::Connection(msg) => write!(f, "Connection error: {}", msg),
            CliError::Input(msg) => write!(f, "Invalid input: {}", msg),
        }
    }
}

impl From<ActionError> for CliError {
    fn from(err: ActionError) -> Self {
        match err {
            ActionError::Assertion { reason, .. } => CliError::Assertion(reason),
            ActionError::Driver(e) => CliError::Connection(e.to_string()),
        }
    }
}

/// What a successful helper prints.
struct Outcome {
    message: String,
    data: Value,
}

impl Outcome {
    fn done(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            data: Value::Null,
        }
    }
}

fn load_config(cli: &Cli) -> Result<NavcheckConfig, CliError> {
    let mut config = match &cli.config {
        Some(path) => NavcheckConfig::load_from(path).map_err(|e| CliError::Input(e.to_string()))?,
        None => NavcheckConfig::load(),
    };
    if let Some(host) = &cli.host {
        config.agent.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.agent.port = port;
    }
    Ok(config)
}

fn load_maneuvers(path: &Path) -> Result<Vec<Maneuver>, CliError> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        CliError::Input(format!("cannot read maneuvers file {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&text).map_err(|e| {
        CliError::Input(format!("invalid maneuvers file {}: {}", path.display(), e))
    })
}

fn append_steps(path: &Path, nav_steps: &[navcheck_core::step::StepLog]) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    for step in nav_steps {
        let line = serde_json::to_string(step)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        writeln!(file, "{}", line)?;
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = load_config(&cli)?;

    if let Command::Config = cli.command {
        let json = serde_json::to_string_pretty(&config).map_err(|e| CliError::Input(e.to_string()))?;
        println!("{}", json);
        return Ok(());
    }

    // Validate input files before touching the agent.
    let maneuvers = match &cli.command {
        Command::Maneuvers { file, .. } => load_maneuvers(file)?,
        _ => Vec::new(),
    };

    let mut driver = AgentDriver::new(config.agent.host.clone(), config.agent.port);
    driver.connect().await.map_err(|e| {
        CliError::Connection(format!(
            "cannot reach agent at {}:{}: {}",
            config.agent.host, config.agent.port, e
        ))
    })?;
    info!(host = %config.agent.host, port = config.agent.port, command = cli.command.name(), "connected");

    let nav = DriveNavigation::from_config(Arc::new(driver), &config);
    let result = execute(&nav, &cli.command, &maneuvers).await;

    if let Some(path) = &cli.log {
        if let Err(e) = append_steps(path, &nav.take_steps().await) {
            warn!(path = %path.display(), error = %e, "failed to write step log");
        }
    }

    let outcome = result?;
    match cli.format {
        OutputFormat::Json => {
            let mut output = json!({
                "success": true,
                "command": cli.command.name(),
                "message": outcome.message,
            });
            if !outcome.data.is_null() {
                output["data"] = outcome.data;
            }
            println!("{}", output);
        }
        OutputFormat::Text => {
            if !cli.quiet {
                println!("{}", outcome.message);
            }
        }
    }
    Ok(())
}

async fn execute(
    nav: &DriveNavigation,
    command: &Command,
    maneuvers: &[Maneuver],
) -> Result<Outcome, CliError> {
    let outcome = match command {
        Command::DismissAlert => {
            nav.dismiss_alert().await?;
            Outcome::done("Alert dismissed")
        }
        Command::SelectAlertAction { title } => {
            nav.select_action_on_simulation_alert(title).await?;
            Outcome::done(format!("Selected '{}'", title))
        }
        Command::RouteOverview => {
            nav.check_route_overview_elements_are_visible().await?;
            Outcome::done("Route overview elements are visible")
        }
        Command::WaypointMap => {
            nav.verify_waypoint_map_view_with_no_destination_is_visible().await?;
            Outcome::done("Waypoint map is visible with no destination")
        }
        Command::SetDestination { long_press, x, y } => {
            let gesture = if *long_press { Gesture::LongPress } else { Gesture::Tap };
            nav.set_destination(gesture, Point::new(*x, *y)).await?;
            Outcome::done(format!("Destination set by {} at ({}, {})", gesture, x, y))
        }
        Command::Maneuvers { landscape, .. } => {
            nav.check_displayed_maneuvers_during_simulation(maneuvers, *landscape).await?;
            Outcome::done(format!("{} maneuver(s) displayed", maneuvers.len()))
        }
        Command::WaitArrival => {
            nav.wait_for_arrival().await?;
            Outcome::done("Destination reached")
        }
        Command::HasArrived => {
            let arrived = nav.has_arrived().await?;
            Outcome {
                message: if arrived { "arrived" } else { "not arrived" }.to_string(),
                data: Value::Bool(arrived),
            }
        }
        Command::VerifySpeeding { speeding } => {
            nav.verify_speeding(*speeding).await?;
            let colors = if *speeding { "overspeed" } else { "regular" };
            Outcome::done(format!("Speed view shows the {} colors", colors))
        }
        Command::AdaptSimulation => {
            nav.adapt_simulation_to_automation().await?;
            Outcome::done("Simulation adapted for automation")
        }
        Command::SpeedUp => {
            nav.increase_simulation_movement_speed().await?;
            Outcome::done("Simulation movement speed increased")
        }
        Command::Eta => {
            let data = nav.estimated_arrival_data().await?;
            Outcome {
                message: data.to_string(),
                data: serde_json::to_value(&data).unwrap_or(Value::Null),
            }
        }
        Command::SleepViews => {
            nav.sleep_until_views_updated().await?;
            Outcome::done(format!(
                "Slept {} seconds",
                nav.timings().views_update_delay().as_secs_f64()
            ))
        }
        Command::SleepMinute => {
            nav.sleep_one_minute().await?;
            Outcome::done("Slept 60 seconds")
        }
        Command::Config => {
            return Err(CliError::Input("config does not run a helper".to_string()));
        }
    };
    Ok(outcome)
}
