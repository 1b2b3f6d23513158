mod engine;
mod options;

pub use engine::{AuditEngine, EngineSettings, EngineStats, DEFAULT_MAX_CONCURRENCY};
pub use options::AuditOptions;
