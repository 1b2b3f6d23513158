use crate::report::{RuleCategory, Severity};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "kbaudit")]
#[command(about = "Audit knowledge-base articles for stale, low-quality and broken content")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Log verbosity when RUST_LOG is not set
    #[arg(long, global = true, value_enum, default_value = "warn", env = "KBAUDIT_LOG_LEVEL")]
    pub log_level: LogLevel,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List registered rules
    Rules(RulesArgs),

    /// Audit articles from a directory of JSON files
    Audit(AuditArgs),

    /// Show rule statistics and a sample audit
    Stats(StatsArgs),
}

#[derive(Args, Debug)]
pub struct RulesArgs {
    /// Only rules in this category (content-quality, technical, seo)
    #[arg(long)]
    pub category: Option<RuleCategory>,

    /// Only enabled rules
    #[arg(long)]
    pub enabled_only: bool,

    /// Engine config file (TOML)
    #[arg(long, env = "KBAUDIT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct AuditArgs {
    /// Directory of article JSON files
    #[arg(long)]
    pub articles: PathBuf,

    /// Article ids to audit; all articles when omitted
    #[arg(long = "id")]
    pub ids: Vec<String>,

    /// Only audit articles in this category (ignored with --id)
    #[arg(long)]
    pub category: Option<String>,

    /// Only audit articles with this tag (ignored with --id)
    #[arg(long)]
    pub tag: Option<String>,

    /// Comma-separated rule ids to run
    #[arg(long, value_delimiter = ',')]
    pub rules: Vec<String>,

    /// Skip rules whose severity ranks below this
    #[arg(long)]
    pub min_severity: Option<Severity>,

    /// Write the JSON report to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Engine config file (TOML)
    #[arg(long, env = "KBAUDIT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the configured batch concurrency
    #[arg(long)]
    pub max_concurrency: Option<usize>,

    /// Print the JSON report to stdout instead of the summary
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct StatsArgs {
    /// Directory of article JSON files
    #[arg(long)]
    pub articles: PathBuf,

    /// Engine config file (TOML)
    #[arg(long, env = "KBAUDIT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn level(self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}
