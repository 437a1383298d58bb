//! Health bridge CLI
//!
//! Commands:
//! - call: replay one bridge request against a recorded store fixture
//! - tables: print a platform's mapping tables
//! - methods: list the request methods the bridge dispatches

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use synheart_health::bridge::METHODS;
use synheart_health::metrics::MetricRegistry;
use synheart_health::store::MemoryStore;
use synheart_health::types::{Bucket, Permission, Platform, SleepStage};
use synheart_health::vocabulary::vocabulary_for;
use synheart_health::{BridgeConfig, BridgeError, HealthBridge, PRODUCER_NAME, VERSION};

/// Health bridge - normalize Health Connect and HealthKit records
#[derive(Parser)]
#[command(name = "health-bridge")]
#[command(author = "Synheart AI Inc")]
#[command(version = VERSION)]
#[command(about = "Replay health bridge requests against recorded stores", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one bridge method against a store fixture
    Call {
        /// Store fixture JSON (use - for stdin)
        #[arg(short, long)]
        fixture: PathBuf,

        /// Bridge method, e.g. queryAggregated
        #[arg(short, long)]
        method: String,

        /// Request payload JSON
        #[arg(short, long, default_value = "{}")]
        request: String,

        /// Bridge configuration JSON file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Pretty-print the response (default when stdout is a terminal)
        #[arg(long)]
        pretty: bool,
    },

    /// Print the mapping tables of a platform
    Tables {
        #[arg(value_enum)]
        platform: PlatformArg,
    },

    /// List bridge methods
    Methods,
}

#[derive(Clone, Copy, ValueEnum)]
enum PlatformArg {
    /// Android Health Connect
    HealthConnect,
    /// Apple HealthKit
    Healthkit,
}

impl From<PlatformArg> for Platform {
    fn from(arg: PlatformArg) -> Self {
        match arg {
            PlatformArg::HealthConnect => Platform::HealthConnect,
            PlatformArg::Healthkit => Platform::HealthKit,
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), HealthCliError> {
    match cli.command {
        Commands::Call {
            fixture,
            method,
            request,
            config,
            pretty,
        } => cmd_call(&fixture, &method, &request, config.as_deref(), pretty),
        Commands::Tables { platform } => cmd_tables(platform.into()),
        Commands::Methods => {
            for method in METHODS {
                println!("{method}");
            }
            Ok(())
        }
    }
}

fn read_input(path: &Path) -> Result<String, HealthCliError> {
    if path.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(path)?)
    }
}

fn cmd_call(
    fixture: &Path,
    method: &str,
    request: &str,
    config: Option<&Path>,
    pretty: bool,
) -> Result<(), HealthCliError> {
    let store = MemoryStore::from_json(&read_input(fixture)?)?;
    let config = match config {
        Some(path) => BridgeConfig::from_json(&fs::read_to_string(path)?)?,
        None => BridgeConfig::default(),
    };
    let bridge = HealthBridge::with_config(store, config)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let response = runtime.block_on(bridge.call(method, request))?;

    print_json(&response, pretty || atty::is(atty::Stream::Stdout))
}

fn cmd_tables(platform: Platform) -> Result<(), HealthCliError> {
    let vocab = vocabulary_for(platform);
    let registry = MetricRegistry::new(vocab);

    let report = TablesReport {
        producer: PRODUCER_NAME,
        platform: platform.as_str(),
        workout_types: vocab
            .workout_table()
            .iter()
            .map(|(code, name)| CodeEntry { code: *code, name: *name })
            .collect(),
        sleep_stages: vocab
            .sleep_stage_table()
            .iter()
            .map(|(code, stage)| CodeEntry {
                code: *code,
                name: stage.as_str(),
            })
            .collect(),
        unmapped_sleep_stages: SleepStage::ALL
            .into_iter()
            .filter(|stage| vocab.sleep_stage_code(*stage).is_none())
            .map(|stage| stage.as_str())
            .collect(),
        permissions: Permission::ALL
            .into_iter()
            .map(|permission| PermissionEntry {
                permission: permission.as_str(),
                identifiers: vocab.permission_identifiers(permission),
            })
            .collect(),
        metrics: registry
            .descriptors()
            .iter()
            .map(|d| MetricEntry {
                data_type: d.canonical_name(),
                native_handle: d.native_handle,
                permission: d.required_permission.as_str(),
            })
            .collect(),
        buckets: [Bucket::Hour, Bucket::Day, Bucket::Week]
            .into_iter()
            .filter(|bucket| vocab.supports_bucket(*bucket))
            .map(|bucket| bucket.as_str())
            .collect(),
    };

    print_json(&serde_json::to_value(&report)?, atty::is(atty::Stream::Stdout))
}

fn print_json(value: &serde_json::Value, pretty: bool) -> Result<(), HealthCliError> {
    if pretty {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{}", serde_json::to_string(value)?);
    }
    Ok(())
}

#[derive(Debug)]
enum HealthCliError {
    Io(io::Error),
    Bridge(BridgeError),
    Json(serde_json::Error),
}

impl From<io::Error> for HealthCliError {
    fn from(e: io::Error) -> Self {
        HealthCliError::Io(e)
    }
}

impl From<BridgeError> for HealthCliError {
    fn from(e: BridgeError) -> Self {
        HealthCliError::Bridge(e)
    }
}

impl From<serde_json::Error> for HealthCliError {
    fn from(e: serde_json::Error) -> Self {
        HealthCliError::Json(e)
    }
}

#[derive(Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<HealthCliError> for CliError {
    fn from(e: HealthCliError) -> Self {
        match e {
            HealthCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            HealthCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            HealthCliError::Bridge(e) => {
                let hint = match &e {
                    BridgeError::UnknownMethod(_) => {
                        Some("Run 'health-bridge methods' for the list".to_string())
                    }
                    BridgeError::PermissionDenied(_) => {
                        Some("Add the native identifier to the fixture's granted list".to_string())
                    }
                    BridgeError::JsonError(_) => Some("Check fixture and request JSON".to_string()),
                    _ => None,
                };
                CliError {
                    code: e.code().to_string(),
                    message: e.to_string(),
                    hint,
                }
            }
        }
    }
}

#[derive(Serialize)]
struct TablesReport {
    producer: &'static str,
    platform: &'static str,
    workout_types: Vec<CodeEntry>,
    sleep_stages: Vec<CodeEntry>,
    unmapped_sleep_stages: Vec<&'static str>,
    permissions: Vec<PermissionEntry>,
    metrics: Vec<MetricEntry>,
    buckets: Vec<&'static str>,
}

#[derive(Serialize)]
struct CodeEntry {
    code: i64,
    name: &'static str,
}

#[derive(Serialize)]
struct PermissionEntry {
    permission: &'static str,
    identifiers: &'static [&'static str],
}

#[derive(Serialize)]
struct MetricEntry {
    data_type: &'static str,
    native_handle: &'static str,
    permission: &'static str,
}
