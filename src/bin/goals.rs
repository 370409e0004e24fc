//! Goals CLI - Command-line interface for Synheart Goals
//!
//! Commands:
//! - calculate: Calculate daily goals for a profile
//! - breakdown: Show the intermediate values behind a profile's goals
//! - bench: Run repeated calculations and report metrics and insights
//! - config: Print the effective engine configuration
//! - doctor: Diagnose engine health and configuration

use clap::{Parser, Subcommand};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use synheart_goals::fallback::FallbackReason;
use synheart_goals::{
    ActivityLevel, BiometricProfile, EngineConfig, FallbackGenerator, Gender, GoalsEngine,
    GoalsError, InMemoryProfileStore, InputValidator, GOALS_VERSION,
};

/// Goals - On-device engine for personalized daily wellness targets
#[derive(Parser)]
#[command(name = "goals")]
#[command(author = "Synheart AI Inc")]
#[command(version = GOALS_VERSION)]
#[command(
    about = "Calculate personalized daily steps, calorie and heart-point goals",
    long_about = None
)]
struct Cli {
    /// Engine configuration file (JSON); absent sections take defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Calculate daily goals for a profile
    Calculate {
        /// Profile JSON file (use - for stdin)
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// User id recorded in logs
        #[arg(long, default_value = "cli")]
        user_id: String,

        /// Pretty-print output
        #[arg(long)]
        pretty: bool,

        /// Print a human-readable explanation instead of JSON
        #[arg(long)]
        explain: bool,
    },

    /// Show the intermediate values behind a profile's goals
    Breakdown {
        /// Profile JSON file (use - for stdin)
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// Pretty-print output
        #[arg(long)]
        pretty: bool,
    },

    /// Run repeated calculations and report metrics and insights
    Bench {
        /// Profile JSON file (use - for stdin)
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// Number of calculations
        #[arg(short = 'n', long, default_value = "100")]
        iterations: usize,

        /// Clear the cache before every calculation
        #[arg(long)]
        no_cache: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the effective engine configuration
    Config,

    /// Diagnose engine health and configuration
    Doctor {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so stdout stays machine-readable
fn init_logging() {
    let filter = EnvFilter::try_from_env("SYNHEART_GOALS_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .compact()
        .init();
}

async fn run(cli: Cli) -> Result<(), GoalsCliError> {
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Calculate {
            input,
            user_id,
            pretty,
            explain,
        } => cmd_calculate(config_path, &input, &user_id, pretty, explain).await,

        Commands::Breakdown { input, pretty } => cmd_breakdown(config_path, &input, pretty),

        Commands::Bench {
            input,
            iterations,
            no_cache,
            json,
        } => cmd_bench(config_path, &input, iterations, no_cache, json).await,

        Commands::Config => cmd_config(config_path),

        Commands::Doctor { json } => cmd_doctor(config_path, json).await,
    }
}

async fn cmd_calculate(
    config_path: Option<&Path>,
    input: &Path,
    user_id: &str,
    pretty: bool,
    explain: bool,
) -> Result<(), GoalsCliError> {
    let engine = build_engine(config_path)?;
    let profile = read_profile(input)?;

    // Validate separately only to name the reason in the explanation
    let reason = InputValidator::validate(&profile)
        .err()
        .map(|e| FallbackReason::from(&GoalsError::from(e)));

    let goals = engine.calculate_for_profile(user_id, Some(profile)).await;

    if explain {
        println!("{}", FallbackGenerator::explain(&goals, reason.as_ref()));
    } else if pretty {
        println!("{}", serde_json::to_string_pretty(&goals)?);
    } else {
        println!("{}", serde_json::to_string(&goals)?);
    }

    Ok(())
}

fn cmd_breakdown(
    config_path: Option<&Path>,
    input: &Path,
    pretty: bool,
) -> Result<(), GoalsCliError> {
    let engine = build_engine(config_path)?;
    let profile = read_profile(input)?;

    let breakdown = engine.breakdown_for_profile(&profile)?;

    if pretty {
        println!("{}", serde_json::to_string_pretty(&breakdown)?);
    } else {
        println!("{}", serde_json::to_string(&breakdown)?);
    }

    Ok(())
}

async fn cmd_bench(
    config_path: Option<&Path>,
    input: &Path,
    iterations: usize,
    no_cache: bool,
    json: bool,
) -> Result<(), GoalsCliError> {
    if iterations == 0 {
        return Err(GoalsCliError::InvalidArgument(
            "iterations must be at least 1".to_string(),
        ));
    }

    let engine = build_engine(config_path)?;
    let profile = read_profile(input)?;

    let started = Instant::now();
    for _ in 0..iterations {
        if no_cache {
            engine.clear_cache();
        }
        engine
            .calculate_for_profile("bench", Some(profile.clone()))
            .await;
    }
    let elapsed = started.elapsed();

    let report = BenchReport {
        iterations,
        wall_time_ms: elapsed.as_secs_f64() * 1000.0,
        metrics: engine.performance_metrics(),
        cache: engine.cache_stats(),
        insights: engine.performance_insights(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        let m = &report.metrics;
        println!("Goals Bench Report");
        println!("==================");
        println!("Iterations:     {}", report.iterations);
        println!("Wall time:      {:.2} ms", report.wall_time_ms);
        println!("Average:        {:.3} ms", m.average_duration_ms);
        println!("Min / Max:      {:.3} / {:.3} ms", m.min_duration_ms, m.max_duration_ms);
        println!("Success rate:   {:.1}%", m.success_rate * 100.0);
        println!("Cache hit rate: {:.1}%", m.cache_hit_rate * 100.0);
        println!("Fallbacks:      {}", m.fallbacks_used);
        println!("Cache:          {}/{} entries", report.cache.size, report.cache.capacity);

        if report.insights.is_empty() {
            println!("\nNo insights.");
        } else {
            println!("\nInsights:");
            for insight in &report.insights {
                println!("  [{:?}] {}", insight.severity, insight.message);
                println!("          {}", insight.recommendation);
            }
        }
    }

    Ok(())
}

fn cmd_config(config_path: Option<&Path>) -> Result<(), GoalsCliError> {
    let config = load_config(config_path)?;
    println!("{}", config.to_json()?);
    Ok(())
}

async fn cmd_doctor(config_path: Option<&Path>, json: bool) -> Result<(), GoalsCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "goals_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Goals version {}", GOALS_VERSION),
    });

    // Check config file if provided
    let config = match config_path {
        None => {
            checks.push(DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Ok,
                message: "No config file given; using defaults".to_string(),
            });
            Some(EngineConfig::default())
        }
        Some(path) if !path.exists() => {
            checks.push(DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Error,
                message: "Config file does not exist".to_string(),
            });
            None
        }
        Some(path) => match load_config(Some(path)) {
            Ok(config) => {
                checks.push(DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Ok,
                    message: format!(
                        "Config valid (cache {} entries / {}s, history {})",
                        config.cache.capacity, config.cache.ttl_secs, config.monitor.history_size
                    ),
                });
                Some(config)
            }
            Err(e) => {
                checks.push(DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Error,
                    message: format!("Invalid config: {}", CliError::from(e).message),
                });
                None
            }
        },
    };

    // Smoke-test the calculators with a reference profile
    if let Some(config) = config {
        match GoalsEngine::with_config(Arc::new(InMemoryProfileStore::new()), config) {
            Ok(engine) => {
                let goals = engine
                    .calculate_for_profile("doctor", Some(reference_profile()))
                    .await;
                checks.push(if goals.is_fallback() {
                    DoctorCheck {
                        name: "calculation".to_string(),
                        status: CheckStatus::Error,
                        message: "Reference profile fell back to default goals".to_string(),
                    }
                } else {
                    DoctorCheck {
                        name: "calculation".to_string(),
                        status: CheckStatus::Ok,
                        message: format!(
                            "Reference profile: {} steps, {} kcal, {} heart points",
                            goals.steps_goal(),
                            goals.calories_goal(),
                            goals.heart_points_goal()
                        ),
                    }
                });
            }
            Err(e) => checks.push(DoctorCheck {
                name: "calculation".to_string(),
                status: CheckStatus::Error,
                message: format!("Engine could not be built: {}", e),
            }),
        }
    }

    // Check stdin is available (for piping profiles)
    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Warning,
            message: "stdin is a TTY; pass profiles with --input".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (profile input ready)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        version: GOALS_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Goals Doctor Report");
        println!("===================");
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report.checks.iter().any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(GoalsCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

// Helper functions

fn load_config(path: Option<&Path>) -> Result<EngineConfig, GoalsCliError> {
    match path {
        Some(path) => Ok(EngineConfig::from_json(&fs::read_to_string(path)?)?),
        None => Ok(EngineConfig::default()),
    }
}

fn build_engine(config_path: Option<&Path>) -> Result<GoalsEngine, GoalsCliError> {
    let config = load_config(config_path)?;
    Ok(GoalsEngine::with_config(
        Arc::new(InMemoryProfileStore::new()),
        config,
    )?)
}

fn read_profile(input: &Path) -> Result<BiometricProfile, GoalsCliError> {
    let input_data = if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(input)?
    };

    if input_data.trim().is_empty() {
        return Err(GoalsCliError::EmptyInput);
    }

    Ok(serde_json::from_str(&input_data)?)
}

fn reference_profile() -> BiometricProfile {
    BiometricProfile {
        age: Some(30),
        gender: Some(Gender::Male),
        height_cm: Some(175.0),
        weight_kg: Some(75.0),
        activity_level: Some(ActivityLevel::Moderate),
        ..Default::default()
    }
}

// Error types

#[derive(Debug)]
enum GoalsCliError {
    Io(io::Error),
    Json(serde_json::Error),
    Engine(GoalsError),
    EmptyInput,
    InvalidArgument(String),
    DoctorFailed,
}

impl From<io::Error> for GoalsCliError {
    fn from(e: io::Error) -> Self {
        GoalsCliError::Io(e)
    }
}

impl From<serde_json::Error> for GoalsCliError {
    fn from(e: serde_json::Error) -> Self {
        GoalsCliError::Json(e)
    }
}

impl From<GoalsError> for GoalsCliError {
    fn from(e: GoalsError) -> Self {
        match e {
            GoalsError::Json(e) => GoalsCliError::Json(e),
            other => GoalsCliError::Engine(other),
        }
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<GoalsCliError> for CliError {
    fn from(e: GoalsCliError) -> Self {
        match e {
            GoalsCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            GoalsCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            GoalsCliError::Engine(GoalsError::Validation(e)) => CliError {
                code: "VALIDATION_ERROR".to_string(),
                message: e.to_string(),
                hint: Some(
                    "Profile needs age, gender, height_cm and weight_kg in range".to_string(),
                ),
            },
            GoalsCliError::Engine(GoalsError::Config(msg)) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: msg,
                hint: Some("Run 'goals config' to see a valid configuration".to_string()),
            },
            GoalsCliError::Engine(e) => CliError {
                code: format!("{}_ERROR", e.kind().to_uppercase()),
                message: e.to_string(),
                hint: None,
            },
            GoalsCliError::EmptyInput => CliError {
                code: "EMPTY_INPUT".to_string(),
                message: "No profile found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            GoalsCliError::InvalidArgument(msg) => CliError {
                code: "INVALID_ARGUMENT".to_string(),
                message: msg,
                hint: None,
            },
            GoalsCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct BenchReport {
    iterations: usize,
    wall_time_ms: f64,
    metrics: synheart_goals::PerformanceMetrics,
    cache: synheart_goals::cache::CacheStats,
    insights: Vec<synheart_goals::Insight>,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
