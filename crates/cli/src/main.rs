//! flowalert command-line tool.
//!
//! Generates and validates configuration, renders failure reports for an
//! execution described in JSON, and sends them through the configured
//! DingTalk robot.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use flowalert_core::config::AppConfig;
use flowalert_core::models::ExecutableFlow;
use flowalert_core::notify::message::MarkdownMessage;
use flowalert_core::{AlertDispatcher, DingTalkAlerter};

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// flowalert command-line tool.
#[derive(Parser, Debug)]
#[command(
    name = "flowalert",
    version,
    about = "Send workflow failure reports to a DingTalk group robot"
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(
        short,
        long,
        global = true,
        default_value = "/etc/flowalert/config.toml"
    )]
    config: PathBuf,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a default configuration file.
    Init {
        /// Output path for the generated config file.
        #[arg(short, long, default_value = "./flowalert.toml")]
        output: PathBuf,
    },

    /// Validate a configuration file.
    Validate,

    /// Render the failure report for an execution without sending it.
    Preview {
        /// JSON file describing the execution.
        #[arg(short, long)]
        execution: PathBuf,

        /// Extra reason lines appended to the report (repeatable).
        #[arg(short, long = "reason")]
        reasons: Vec<String>,
    },

    /// Send the failure report for an execution.
    Send {
        /// JSON file describing the execution.
        #[arg(short, long)]
        execution: PathBuf,

        /// Extra reason lines appended to the report (repeatable).
        #[arg(short, long = "reason")]
        reasons: Vec<String>,
    },

    /// Send a short test message to check the token and secret.
    Test,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init { ref output } => {
            init_tracing(cli.log_level.as_deref().unwrap_or("warn"));
            cmd_init(output)
        }
        Commands::Validate => {
            init_tracing(cli.log_level.as_deref().unwrap_or("warn"));
            cmd_validate(&cli.config)
        }
        _ => {
            let config = load_config(&cli.config)?;
            init_tracing(cli.log_level.as_deref().unwrap_or(&config.logging.level));

            match cli.command {
                Commands::Preview { execution, reasons } => {
                    cmd_preview(&config, &execution, &reasons)
                }
                Commands::Send { execution, reasons } => {
                    cmd_send(&config, &execution, &reasons).await
                }
                Commands::Test => cmd_test(&config).await,
                _ => unreachable!(),
            }
        }
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

// ---------------------------------------------------------------------------
// Config helpers
// ---------------------------------------------------------------------------

fn load_config(path: &Path) -> Result<AppConfig> {
    AppConfig::load_and_resolve(path).context("failed to load configuration file")
}

fn read_execution(path: &Path) -> Result<ExecutableFlow> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read execution file {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse execution file {}", path.display()))
}

const DEFAULT_CONFIG: &str = r#"# flowalert configuration

[server]
# Display name used in alert titles.
name = "azkaban"
hostname = "localhost"
# external_hostname = "azkaban.example.com"
use_ssl = true
ssl_port = 8443
# external_ssl_port = 443
port = 8081
# external_port = 80
utc_offset = "+08:00"

[dingtalk]
webhook_url = "https://oapi.dingtalk.com/robot/send"
token_env = "DINGTALK_TOKEN"
secret_env = "DINGTALK_SECRET"
require_signature = true
timeout_secs = 10

[logging]
level = "info"
"#;

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

fn cmd_init(output: &Path) -> Result<()> {
    if output.exists() {
        anyhow::bail!(
            "file already exists: {}. Use a different path or remove the existing file.",
            output.display()
        );
    }

    std::fs::write(output, DEFAULT_CONFIG).context("failed to write config file")?;

    println!("Default configuration written to {}", output.display());
    println!();
    println!("Next steps:");
    println!("  1. Edit the server section so execution links resolve");
    println!("  2. Set DINGTALK_TOKEN and DINGTALK_SECRET from the robot settings");
    println!(
        "  3. Validate with: flowalert validate --config {}",
        output.display()
    );
    println!(
        "  4. Check delivery: flowalert test --config {}",
        output.display()
    );

    Ok(())
}

fn cmd_validate(config_path: &Path) -> Result<()> {
    println!("Validating configuration: {}", config_path.display());
    println!();

    let mut config =
        AppConfig::load_from_file(config_path).context("failed to parse configuration")?;
    println!("  [OK] TOML structure is valid");

    let _ = config.resolve_env_vars();
    println!("  [OK] Environment variable references processed");

    match config.validate() {
        Ok(()) => println!("  [OK] All fields are valid"),
        Err(e) => {
            println!("  [FAIL] Validation error: {}", e);
            anyhow::bail!("configuration validation failed");
        }
    }

    let signing = match (&config.dingtalk.secret, config.dingtalk.require_signature) {
        (Some(_), _) => "signed",
        (None, true) => "REQUIRED BUT SECRET NOT SET",
        (None, false) => "unsigned",
    };

    println!();
    println!("Configuration summary:");
    println!("  Server name    : {}", config.server.name);
    println!("  Execution links: {}/executor", config.server.base_url());
    println!("  Time zone      : UTC{}", config.server.utc_offset);
    println!("  Robot endpoint : {}", config.dingtalk.webhook_url);
    println!(
        "  Robot token    : {}",
        if config.dingtalk.token.is_some() {
            "set"
        } else {
            "NOT SET (alerts disabled)"
        }
    );
    println!("  Signing        : {}", signing);
    println!("  Timeout        : {}s", config.dingtalk.timeout_secs);
    println!();
    println!("Configuration is valid.");

    Ok(())
}

fn cmd_preview(config: &AppConfig, execution: &Path, reasons: &[String]) -> Result<()> {
    let flow = read_execution(execution)?;
    let alerter = DingTalkAlerter::new(config).context("failed to build DingTalk alerter")?;
    let message = alerter.build_message(&flow, reasons, chrono::Utc::now().timestamp_millis());

    println!("Title: {}", message.title());
    println!();
    println!("{}", message.text());
    println!("Payload:");
    println!("{}", message.to_json().context("failed to serialize payload")?);

    Ok(())
}

async fn cmd_send(config: &AppConfig, execution: &Path, reasons: &[String]) -> Result<()> {
    let flow = read_execution(execution)?;
    let dispatcher =
        AlertDispatcher::from_config(config).context("failed to build alert dispatcher")?;

    if dispatcher.is_empty() {
        println!("No alert channel configured; nothing sent.");
        return Ok(());
    }

    info!(
        flow = %flow.flow_id,
        execution_id = flow.execution_id,
        "dispatching failure alert"
    );
    let outcome = dispatcher.on_error(&flow, reasons).await;

    println!(
        "Alert dispatched: {} delivered, {} failed",
        outcome.succeeded, outcome.failed
    );
    if outcome.failed > 0 {
        anyhow::bail!("{} alert channel(s) failed; see log for details", outcome.failed);
    }
    Ok(())
}

async fn cmd_test(config: &AppConfig) -> Result<()> {
    let alerter = DingTalkAlerter::new(config).context("failed to build DingTalk alerter")?;
    if !alerter.is_enabled() {
        anyhow::bail!("no DingTalk token configured; set the variable named by dingtalk.token_env");
    }

    let message = MarkdownMessage::new(
        format!("flowalert test from {}", config.server.name),
        [
            format!("# flowalert test from {} \n", config.server.name),
            format!("- Sent at: {} \n", chrono::Utc::now().to_rfc3339()),
        ],
    );
    alerter
        .send_message(&message)
        .await
        .context("test message was not delivered")?;

    println!("Test message delivered.");
    Ok(())
}
