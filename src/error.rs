use thiserror::Error;

/// Errors produced by the audit engine and its collaborators
#[derive(Debug, Error)]
pub enum AuditError {
    /// The article store has no article with this id
    #[error("article not found: {id}")]
    ArticleNotFound { id: String },

    /// No rule with this id is registered
    #[error("rule not found: {id}")]
    RuleNotFound { id: String },

    /// The rule does not accept configuration updates
    #[error("rule {rule_id} is not configurable")]
    NotConfigurable { rule_id: String },

    /// The merged configuration failed the rule's validation
    #[error("invalid configuration for rule {rule_id}: {reason}")]
    InvalidConfig { rule_id: String, reason: String },

    /// The article store failed for a reason other than a missing article
    #[error("article store error: {0}")]
    Store(String),

    /// A per-article audit exceeded its deadline
    #[error("audit of article {article_id} timed out after {secs}s")]
    Timeout { article_id: String, secs: u64 },

    /// A background audit task could not be joined
    #[error("audit task failed: {0}")]
    Task(String),
}

pub type Result<T> = std::result::Result<T, AuditError>;
