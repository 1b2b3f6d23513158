mod builder;
mod summary;
mod types;

pub use builder::{content_health_score, AuditResultBuilder};
pub use summary::summarize;
pub use types::*;
