//! Assignment inventory CLI
//!
//! Inventories which groups every Intune configuration profile, compliance
//! policy, application, script and protection policy is assigned to, and
//! exports the result as CSV, JSON or an interactive graph.

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use ia_connectors::{Connector, ConnectorHealth};
use ia_core::{catalog_endpoints, ResourceKind};
use ia_export::Exporter;
use ia_observability::logging::{init_logging_with_config, LoggingConfig};
use std::path::PathBuf;

mod commands;
mod config;
mod validator;

use commands::{build_pipeline, print_outcome, run_menu, run_selection, Selection};
use config::AppConfig;
use validator::ConfigValidator;

#[derive(Parser)]
#[command(name = "intune-assignments")]
#[command(version)]
#[command(about = "Inventory Intune assignments and the groups they target", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(long, default_value = "text")]
    format: OutputFormat,

    /// Output directory (overrides the configuration file)
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Invalid output format: {}", s)),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive numbered menu (default)
    Menu,

    /// Collect one resource kind
    Collect {
        /// Resource kind (see `kinds`)
        #[arg(short, long)]
        kind: ResourceKind,
    },

    /// Collect every resource kind into one table
    All,

    /// Collect every resource kind and build the assignment graph
    Graph,

    /// List every assignment targeting a group
    Group {
        /// Group display name (case-insensitive)
        name: String,
    },

    /// Show current configuration
    Config {
        /// Show secrets (redacted by default)
        #[arg(long)]
        show_secrets: bool,

        /// Write a default configuration file to the config path
        #[arg(long, conflicts_with = "show_secrets")]
        init: bool,
    },

    /// Validate configuration and test the Graph connection
    Validate {
        /// Skip the connection test
        #[arg(long)]
        offline: bool,
    },

    /// List resource kinds and their collections
    Kinds,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let config_result = AppConfig::load(&config_path);

    init_logging(&cli, config_result.as_ref().ok());

    let mut config = match config_result {
        Ok(config) => config,
        Err(e) if config_path.exists() => {
            println!("{}: {:#}", "Configuration file error".red().bold(), e);
            std::process::exit(1);
        }
        Err(_) => {
            if cli.verbose {
                eprintln!("Using default configuration (no config file found)");
            }
            AppConfig::default()
        }
    };
    if let Some(output) = &cli.output {
        config.output.directory = output.clone();
    }

    match cli.command.unwrap_or(Commands::Menu) {
        Commands::Menu => cmd_menu(config, cli.format).await,
        Commands::Collect { kind } => cmd_run(config, Selection::Kind(kind), cli.format).await,
        Commands::All => cmd_run(config, Selection::All, cli.format).await,
        Commands::Graph => cmd_run(config, Selection::Graph, cli.format).await,
        Commands::Group { name } => cmd_run(config, Selection::Group(name), cli.format).await,
        Commands::Config { init: true, .. } => cmd_config_init(&config_path),
        Commands::Config { show_secrets, .. } => cmd_config(config, show_secrets, cli.format),
        Commands::Validate { offline } => cmd_validate(config, &config_path, offline).await,
        Commands::Kinds => cmd_kinds(cli.format),
    }
}

fn init_logging(cli: &Cli, config: Option<&AppConfig>) {
    let mut logging = match cli.format {
        OutputFormat::Json => LoggingConfig::production(),
        OutputFormat::Text => LoggingConfig::default(),
    };

    if let Some(config) = config {
        logging = logging.with_level_name(&config.logging.level).0;
        logging.json_format |= config.logging.json_format;
    }
    if cli.verbose {
        logging.level = tracing::Level::DEBUG;
    }

    init_logging_with_config(logging);
}

fn default_config_path() -> PathBuf {
    if let Some(dirs) =
        directories::ProjectDirs::from("com", "intune-assignments", "intune-assignments")
    {
        dirs.config_dir().join("config.yaml")
    } else {
        PathBuf::from("config.yaml")
    }
}

/// Refuses to contact the tenant with a configuration that cannot work.
fn ensure_valid(config: &AppConfig) {
    let validation_result = ConfigValidator::validate(config);
    if validation_result.has_errors() {
        validation_result.print();
        println!();
        println!(
            "{}",
            "Run aborted due to configuration errors. Fix the errors above and try again."
                .red()
                .bold()
        );
        std::process::exit(1);
    }
}

async fn cmd_run(config: AppConfig, selection: Selection, format: OutputFormat) -> Result<()> {
    ensure_valid(&config);

    let pipeline = build_pipeline(&config)?;
    let exporter = Exporter::new(config.output.clone());

    if format == OutputFormat::Text {
        println!("{} {}...", "Collecting".green().bold(), selection);
    }
    let outcome = run_selection(&pipeline, &exporter, &selection).await?;
    print_outcome(&outcome, format)
}

async fn cmd_menu(config: AppConfig, format: OutputFormat) -> Result<()> {
    ensure_valid(&config);

    let pipeline = build_pipeline(&config)?;
    let exporter = Exporter::new(config.output.clone());
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());

    run_menu(stdin, &pipeline, &exporter, format).await
}

fn cmd_config(config: AppConfig, show_secrets: bool, format: OutputFormat) -> Result<()> {
    let display_config = if show_secrets {
        config
    } else {
        config.redact_secrets()
    };

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&display_config)?);
    } else {
        println!("{}", "Current Configuration".bold());
        println!("─────────────────────────");
        print!("{}", serde_yaml::to_string(&display_config)?);
    }

    Ok(())
}

fn cmd_config_init(config_path: &std::path::Path) -> Result<()> {
    if config_path.exists() {
        anyhow::bail!(
            "Configuration file already exists: {}",
            config_path.display()
        );
    }
    if let Some(parent) = config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    AppConfig::default().save(config_path)?;
    println!(
        "{} {}",
        "Wrote default configuration to".green(),
        config_path.display().to_string().cyan()
    );
    println!("Set graph.tenant_id, graph.client_id and graph.client_secret before running.");
    Ok(())
}

async fn cmd_validate(config: AppConfig, config_path: &std::path::Path, offline: bool) -> Result<()> {
    println!(
        "Validating configuration: {}",
        config_path.display().to_string().cyan()
    );

    let validation_result = ConfigValidator::validate(&config);
    validation_result.print();

    println!();
    println!("{}", "Configuration Summary".bold());
    println!("─────────────────────");
    println!("  Tenant: {}", config.graph.tenant_id);
    println!("  API version: {}", config.graph.management_api_version);
    println!("  Parallel kinds: {}", config.inventory.parallel_kinds);
    println!("  Output: {}", config.output.directory.display());

    if validation_result.has_errors() {
        println!();
        println!(
            "{}",
            "Configuration validation failed. Fix the errors above."
                .red()
                .bold()
        );
        std::process::exit(1);
    }

    if !offline {
        let connector = ia_connectors::GraphConnector::new(config.graph_config())?;
        match connector.health_check().await {
            Ok(ConnectorHealth::Healthy) => println!("  {} Graph connection OK", "✓".green()),
            Ok(ConnectorHealth::Degraded(reason)) => {
                println!("  {} Graph connection degraded: {}", "⚠".yellow(), reason)
            }
            Ok(ConnectorHealth::Unhealthy(reason)) => {
                println!("  {} Graph connection unhealthy: {}", "✗".red(), reason)
            }
            Err(e) => println!("  {} Graph connection failed: {}", "✗".red(), e),
        }
    }

    println!();
    if validation_result.has_warnings() {
        println!(
            "{}",
            "Configuration is valid with warnings. Review the warnings above."
                .yellow()
                .bold()
        );
    } else {
        println!("{}", "Configuration is valid.".green().bold());
    }

    Ok(())
}

fn cmd_kinds(format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        let kinds: Vec<serde_json::Value> = ResourceKind::ALL
            .iter()
            .map(|kind| {
                serde_json::json!({
                    "name": kind.cli_name(),
                    "label": kind.label(),
                    "description": kind.description(),
                    "endpoints": catalog_endpoints(*kind),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&kinds)?);
    } else {
        println!("{}", "Resource Kinds".bold());
        println!("──────────────");
        for kind in ResourceKind::ALL {
            println!(
                "  {} {}",
                format!("{:<22}", kind.cli_name()).cyan(),
                kind.description()
            );
            for endpoint in catalog_endpoints(kind) {
                println!("      {}", endpoint);
            }
        }
    }

    Ok(())
}
