use crate::audit::{AuditEngine, AuditOptions};
use crate::cli::{AuditArgs, Cli, Command, RulesArgs, StatsArgs};
use crate::config::EngineConfig;
use crate::output::{json, summary};
use crate::report::AuditReport;
use crate::rules::{RuleFilter, RuleRegistry};
use crate::store::{ArticleFilter, ArticleStore, DirectoryArticleStore};
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Dispatch a parsed command line
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Rules(args) => rules(args).await,
        Command::Audit(args) => audit(args).await,
        Command::Stats(args) => stats(args).await,
    }
}

/// Default registry with the config file applied
fn configured_registry(config: &EngineConfig) -> Result<RuleRegistry> {
    let registry = RuleRegistry::with_default_rules();
    config.apply(&registry)?;
    Ok(registry)
}

async fn load_store(dir: &Path) -> Result<Arc<DirectoryArticleStore>> {
    let store = DirectoryArticleStore::load(dir)
        .await
        .with_context(|| format!("Failed to load articles from {:?}", dir))?;
    info!(articles = store.len(), dir = ?dir, "Loaded articles");
    Ok(Arc::new(store))
}

async fn rules(args: RulesArgs) -> Result<()> {
    let config = EngineConfig::load_optional(args.config.as_deref()).await?;
    let registry = configured_registry(&config)?;

    let filter = RuleFilter {
        category: args.category,
        enabled: args.enabled_only.then_some(true),
    };
    let rules = registry.list_rules(&filter);

    if args.json {
        println!("{}", json::to_pretty_json(&rules)?);
    } else {
        print!("{}", summary::format_rules(&rules));
    }
    Ok(())
}

async fn audit(args: AuditArgs) -> Result<()> {
    let config = EngineConfig::load_optional(args.config.as_deref()).await?;
    let registry = configured_registry(&config)?;
    let store = load_store(&args.articles).await?;

    let mut settings = config.engine_settings();
    if let Some(max) = args.max_concurrency {
        anyhow::ensure!(max > 0, "--max-concurrency must be greater than 0");
        settings.max_concurrency = max;
    }
    let engine = AuditEngine::new(registry, store.clone()).with_settings(settings);

    let options = AuditOptions {
        rules: (!args.rules.is_empty()).then_some(args.rules),
        min_severity: args.min_severity,
    };

    let batch = if args.ids.is_empty() {
        let filter = ArticleFilter {
            category: args.category,
            tag: args.tag,
            limit: None,
        };
        let articles = store.list_articles(&filter).await?;
        engine.audit_batch(articles, &options).await
    } else {
        engine.audit_articles(&args.ids, &options).await
    };
    let report = AuditReport::new(batch);

    if let Some(path) = &args.output {
        json::write_report(&report, path)?;
        info!(path = ?path, "Wrote audit report");
    }

    if args.json {
        println!("{}", json::to_pretty_json(&report)?);
    } else {
        summary::print_summary(&report, args.output.as_deref());
    }
    Ok(())
}

async fn stats(args: StatsArgs) -> Result<()> {
    let config = EngineConfig::load_optional(args.config.as_deref()).await?;
    let registry = configured_registry(&config)?;
    let store = load_store(&args.articles).await?;
    let engine = AuditEngine::new(registry, store).with_settings(config.engine_settings());

    let stats = engine.get_stats().await?;
    if args.json {
        println!("{}", json::to_pretty_json(&stats)?);
    } else {
        print!("{}", summary::format_stats(&stats));
    }
    Ok(())
}
