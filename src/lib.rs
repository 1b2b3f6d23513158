//! Rules engine that audits knowledge-base articles for stale, low-quality,
//! duplicated, badly linked and poorly optimized content.

pub mod audit;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;
pub mod report;
pub mod rules;
pub mod store;
pub mod telemetry;

pub use audit::{AuditEngine, AuditOptions, EngineSettings, EngineStats};
pub use error::{AuditError, Result};
pub use report::{AuditResult, BatchAudit, BatchAuditSummary, Issue, Severity};
pub use rules::{Rule, RuleRegistry};
pub use store::{Article, ArticleFilter, ArticleStore};
