//! Top-level CLI definition and dispatch.

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell as CompletionShell, generate};
use colored::{Colorize, control};
use serde_json::{Value, json};
use thiserror::Error;

use sprinkler_panel::core::config::Config;
use sprinkler_panel::logger::activity::{ActivityEvent, spawn_logger};
use sprinkler_panel::logger::jsonl::JsonlConfig;
use sprinkler_panel::panel::model::PanelModel;
use sprinkler_panel::panel::registry::{ElementId, ElementRegistry};
use sprinkler_panel::panel::runtime::{PanelRuntime, run_terminal};
use sprinkler_panel::panel::status::{StatusRecord, StatusSync};
use sprinkler_panel::panel::views::ViewStack;
use sprinkler_panel::transport::{Body, CurlTransport, FetchResource, Request, Transport};

/// Terminal control panel for a network sprinkler controller.
#[derive(Debug, Parser)]
#[command(
    name = "spkl",
    author,
    version,
    about = "Sprinkler controller panel",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Override the controller base URL.
    #[arg(long, global = true, value_name = "URL")]
    host: Option<String>,
    /// Force JSON output mode.
    #[arg(long, global = true)]
    json: bool,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Run the interactive control panel.
    Panel(PanelArgs),
    /// Pull the controller status once and print it.
    Status,
    /// View configuration state.
    Config(ConfigArgs),
    /// Generate shell completions.
    Completions(CompletionsArgs),
    /// Print version information.
    Version(VersionArgs),
}

#[derive(Debug, Clone, Args, Default)]
struct PanelArgs {
    /// Wait for the first pushed status instead of pulling at startup.
    #[arg(long)]
    no_pull: bool,
    /// Input poll / redraw interval in milliseconds.
    #[arg(long, value_name = "MS")]
    tick_ms: Option<u64>,
}

#[derive(Debug, Clone, Args, Default)]
struct ConfigArgs {
    /// Config operation to run.
    #[command(subcommand)]
    command: Option<ConfigCommand>,
}

#[derive(Debug, Clone, Subcommand)]
enum ConfigCommand {
    /// Print resolved config file path.
    Path,
    /// Print effective merged configuration.
    Show,
    /// Validate configuration and exit.
    Validate,
}

#[derive(Debug, Clone, Args)]
struct CompletionsArgs {
    /// Shell to generate completion script for.
    #[arg(value_enum)]
    shell: CompletionShell,
}

#[derive(Debug, Clone, Args, Default)]
struct VersionArgs {
    /// Include build metadata fields.
    #[arg(long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

/// CLI error type with explicit exit-code mapping.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input or configuration.
    #[error("{0}")]
    User(String),
    /// Controller, terminal or environment failure.
    #[error("{0}")]
    Runtime(String),
    /// Internal bug or invariant violation.
    #[error("{0}")]
    Internal(String),
    /// JSON serialization failed.
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
    /// Output write failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// Process exit code contract for the CLI.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::User(_) => 1,
            Self::Runtime(_) | Self::Io(_) => 2,
            Self::Internal(_) | Self::Json(_) => 3,
        }
    }
}

/// Dispatch CLI commands.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color {
        control::set_override(false);
    }

    match &cli.command {
        Command::Panel(args) => run_panel(cli, args),
        Command::Status => run_status(cli),
        Command::Config(args) => run_config(cli, args),
        Command::Completions(args) => {
            let mut command = Cli::command();
            let binary_name = command.get_name().to_string();
            generate(args.shell, &mut command, binary_name, &mut io::stdout());
            Ok(())
        }
        Command::Version(args) => emit_version(cli, args),
    }
}

fn load_config(cli: &Cli) -> Result<Config, CliError> {
    let mut config =
        Config::load(cli.config.as_deref()).map_err(|e| CliError::User(e.to_string()))?;
    if let Some(host) = &cli.host {
        config
            .override_host(host)
            .map_err(|e| CliError::User(e.to_string()))?;
    }
    Ok(config)
}

// ---------------------------------------------------------------------------
// panel
// ---------------------------------------------------------------------------

fn run_panel(cli: &Cli, args: &PanelArgs) -> Result<(), CliError> {
    if !io::stdout().is_terminal() {
        return Err(CliError::User(
            "the panel needs an interactive terminal; try `spkl status`".to_string(),
        ));
    }
    let config = load_config(cli)?;
    let config_hash = config
        .stable_hash()
        .map_err(|e| CliError::Internal(e.to_string()))?;

    let (logger, logger_join) =
        spawn_logger(JsonlConfig::at(config.paths.activity_log.clone()))
            .map_err(|e| CliError::Runtime(e.to_string()))?;
    logger.send(ActivityEvent::PanelStarted {
        version: env!("CARGO_PKG_VERSION").to_string(),
        host: config.controller.host.clone(),
    });
    logger.send(ActivityEvent::ConfigLoaded {
        path: config.paths.config_file.display().to_string(),
        config_hash,
    });

    let transport: Arc<dyn Transport> = Arc::new(CurlTransport::new(&config.controller));
    let mut model = PanelModel::new(&config, Local::now().date_naive());
    if args.no_pull {
        model.pull_on_start = false;
    }
    let tick = Duration::from_millis(args.tick_ms.unwrap_or(config.panel.tick_ms).max(1));

    let runtime = PanelRuntime::new(model, transport, logger.clone());
    let failure = match run_terminal(runtime, tick) {
        Ok(runtime) => {
            runtime.shutdown("operator quit");
            None
        }
        Err(e) => {
            logger.send(ActivityEvent::PanelStopped {
                reason: e.to_string(),
            });
            Some(e)
        }
    };

    let dropped = logger.dropped_events();
    logger.shutdown();
    let _ = logger_join.join();
    if dropped > 0 {
        eprintln!("[SPK-LOG] {dropped} activity events were dropped");
    }

    failure.map_or(Ok(()), |e| Err(CliError::Runtime(e.to_string())))
}

// ---------------------------------------------------------------------------
// status
// ---------------------------------------------------------------------------

fn run_status(cli: &Cli) -> Result<(), CliError> {
    let config = load_config(cli)?;
    let transport = CurlTransport::new(&config.controller);
    let body = transport
        .fetch(&Request::get(config.controller.status_path.clone()))
        .map_err(|e| CliError::Runtime(format!("{}: {e}", config.url_for(&config.controller.status_path))))?;

    let Body::Json(raw) = body else {
        return Err(CliError::Runtime("status reply is not JSON".to_string()));
    };

    match output_mode(cli) {
        OutputMode::Json => write_json_line(&json!({
            "command": "status",
            "host": config.controller.host,
            "status": raw,
        })),
        OutputMode::Human => {
            let record =
                StatusRecord::from_value(raw).map_err(|e| CliError::Runtime(e.to_string()))?;
            let reg = project_status(&config, record);
            print_status_human(&reg);
            Ok(())
        }
    }
}

/// Run a record through the same projection the panel uses.
fn project_status(config: &Config, record: StatusRecord) -> ElementRegistry {
    let mut reg = ElementRegistry::standard();
    let views = ViewStack::new();
    let mut sync = StatusSync::new(config.controller.status_path.clone());
    sync.ingest_push(record, &views, &mut reg);
    reg
}

fn print_status_human(reg: &ElementRegistry) {
    println!(
        "{}  {}",
        reg.text(ElementId::SystemTitle).bold(),
        reg.text(ElementId::PanelTime).dimmed()
    );
    for id in [ElementId::PanelLine1, ElementId::PanelLine2] {
        let text = reg.text(id);
        if !text.is_empty() {
            println!("  {text}");
        }
    }
    let state = reg.text(ElementId::PanelState);
    if !state.is_empty() {
        let colored_state = match state {
            "running" => state.green(),
            "paused" => state.yellow(),
            _ => state.normal(),
        };
        println!("  state: {colored_state}");
    }
}

// ---------------------------------------------------------------------------
// config / version
// ---------------------------------------------------------------------------

fn run_config(cli: &Cli, args: &ConfigArgs) -> Result<(), CliError> {
    match &args.command {
        None | Some(ConfigCommand::Path) => {
            let path = cli.config.clone().unwrap_or_else(Config::default_path);
            let exists = path.exists();

            match output_mode(cli) {
                OutputMode::Human => {
                    println!("{}", path.display());
                    if !exists {
                        println!("  (file does not exist; defaults will be used)");
                    }
                }
                OutputMode::Json => {
                    write_json_line(&json!({
                        "command": "config path",
                        "path": path.to_string_lossy(),
                        "exists": exists,
                    }))?;
                }
            }
            Ok(())
        }
        Some(ConfigCommand::Show) => {
            let config = load_config(cli)?;
            match output_mode(cli) {
                OutputMode::Human => {
                    let toml_str = toml::to_string_pretty(&config)
                        .map_err(|e| CliError::Internal(format!("serialize config: {e}")))?;
                    println!("{toml_str}");
                }
                OutputMode::Json => {
                    write_json_line(&json!({
                        "command": "config show",
                        "config": serde_json::to_value(&config)?,
                    }))?;
                }
            }
            Ok(())
        }
        Some(ConfigCommand::Validate) => match load_config(cli) {
            Ok(config) => {
                let hash = config
                    .stable_hash()
                    .map_err(|e| CliError::Internal(e.to_string()))?;
                match output_mode(cli) {
                    OutputMode::Human => {
                        println!("{}", "Configuration is valid.".green());
                        println!("  Source: {}", config.paths.config_file.display());
                        println!("  Hash: {hash}");
                    }
                    OutputMode::Json => {
                        write_json_line(&json!({
                            "command": "config validate",
                            "valid": true,
                            "path": config.paths.config_file.to_string_lossy(),
                            "hash": hash,
                        }))?;
                    }
                }
                Ok(())
            }
            Err(e) => {
                match output_mode(cli) {
                    OutputMode::Human => eprintln!("{} {e}", "Configuration is INVALID:".red()),
                    OutputMode::Json => write_json_line(&json!({
                        "command": "config validate",
                        "valid": false,
                        "error": e.to_string(),
                    }))?,
                }
                Err(e)
            }
        },
    }
}

fn emit_version(cli: &Cli, args: &VersionArgs) -> Result<(), CliError> {
    let version = env!("CARGO_PKG_VERSION");
    match output_mode(cli) {
        OutputMode::Human => {
            println!("spkl {version}");
            if args.verbose {
                println!("  package: {}", env!("CARGO_PKG_NAME"));
                println!("  signals: {}", cfg!(feature = "signals"));
            }
        }
        OutputMode::Json => {
            let mut payload = json!({"command": "version", "version": version});
            if args.verbose {
                payload["package"] = Value::from(env!("CARGO_PKG_NAME"));
                payload["signals"] = Value::from(cfg!(feature = "signals"));
            }
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

fn write_json_line(payload: &Value) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, payload)?;
    writeln!(stdout)?;
    Ok(())
}

fn output_mode(cli: &Cli) -> OutputMode {
    let env_mode = std::env::var("SPK_OUTPUT_FORMAT").ok();
    resolve_output_mode(cli.json, env_mode.as_deref(), io::stdout().is_terminal())
}

fn resolve_output_mode(json_flag: bool, env_mode: Option<&str>, stdout_is_tty: bool) -> OutputMode {
    if json_flag {
        return OutputMode::Json;
    }

    let fallback = if stdout_is_tty {
        OutputMode::Human
    } else {
        OutputMode::Json
    };

    match env_mode
        .map(str::trim)
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("json") => OutputMode::Json,
        Some("human") => OutputMode::Human,
        _ => fallback,
    }
}
