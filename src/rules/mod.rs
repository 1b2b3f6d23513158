mod broken_links;
mod config;
mod consolidate;
mod context;
mod duplicate;
mod engine;
pub mod links;
mod quality;
mod seo;
mod stale;
pub mod text;

pub use broken_links::{BrokenLinksRule, BrokenLinksSettings};
pub use config::{RuleBase, RuleConfig, RuleDescriptor, RuleSettings, ENABLED_KEY};
pub use consolidate::{consolidate, Finding};
pub use context::{ContextMetadata, ExecutionContext};
pub use duplicate::{DuplicateContentRule, DuplicateContentSettings};
pub use engine::{BuiltinRule, Rule, RuleFilter, RuleRegistry};
pub use quality::{QualityRule, QualitySettings};
pub use seo::{SeoRule, SeoSettings};
pub use stale::{StaleContentRule, StaleContentSettings};
