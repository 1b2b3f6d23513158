use crate::report::{RuleCategory, RuleMetadata, Severity};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// Opaque per-rule configuration as exchanged with callers
pub type RuleConfig = Map<String, Value>;

/// Configuration key that toggles a rule on or off
pub const ENABLED_KEY: &str = "enabled";

/// Typed settings of one rule
pub trait RuleSettings:
    Serialize + DeserializeOwned + Default + Clone + Send + Sync + 'static
{
    /// Check invariants such as numeric ordering; `Err` carries the reason
    fn validate(&self) -> Result<(), String>;
}

/// Static description of a rule
#[derive(Debug, Clone)]
pub struct RuleDescriptor {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub category: RuleCategory,
    pub severity: Severity,
    pub configurable: bool,
    pub version: &'static str,
    pub tags: &'static [&'static str],
}

/// State shared by every built-in rule: descriptor, enabled flag and the
/// current settings snapshot.
///
/// Settings are held as an `Arc` swapped under a short write lock. `execute`
/// takes one snapshot up front, so a concurrent update never shows a rule a
/// half-applied configuration.
pub struct RuleBase<S: RuleSettings> {
    descriptor: RuleDescriptor,
    enabled: AtomicBool,
    settings: RwLock<Arc<S>>,
}

impl<S: RuleSettings> RuleBase<S> {
    pub fn new(descriptor: RuleDescriptor, settings: S) -> Self {
        Self {
            descriptor,
            enabled: AtomicBool::new(true),
            settings: RwLock::new(Arc::new(settings)),
        }
    }

    pub fn id(&self) -> &'static str {
        self.descriptor.id
    }

    pub fn descriptor(&self) -> &RuleDescriptor {
        &self.descriptor
    }

    pub fn metadata(&self) -> RuleMetadata {
        let d = &self.descriptor;
        RuleMetadata {
            id: d.id.to_string(),
            name: d.name.to_string(),
            description: d.description.to_string(),
            category: d.category,
            severity: d.severity,
            enabled: self.is_enabled(),
            configurable: d.configurable,
            version: d.version.to_string(),
            tags: d.tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    /// Current settings snapshot
    pub fn settings(&self) -> Arc<S> {
        Arc::clone(&self.settings.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Current settings as a key/value map, including `enabled`
    pub fn config(&self) -> RuleConfig {
        let mut map = match serde_json::to_value(&*self.settings()) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        map.insert(ENABLED_KEY.to_string(), Value::Bool(self.is_enabled()));
        map
    }

    /// Shallow-merge `partial` over the current settings and validate the result
    fn merge(&self, partial: &RuleConfig) -> Result<(S, Option<bool>), String> {
        let enabled = match partial.get(ENABLED_KEY) {
            None => None,
            Some(Value::Bool(b)) => Some(*b),
            Some(other) => return Err(format!("'{}' must be a boolean, got {}", ENABLED_KEY, other)),
        };

        let mut merged = match serde_json::to_value(&*self.settings()) {
            Ok(Value::Object(map)) => map,
            Ok(_) => Map::new(),
            Err(e) => return Err(e.to_string()),
        };
        for (key, value) in partial {
            if key != ENABLED_KEY {
                merged.insert(key.clone(), value.clone());
            }
        }

        let settings: S = serde_json::from_value(Value::Object(merged)).map_err(|e| e.to_string())?;
        settings.validate()?;
        Ok((settings, enabled))
    }

    /// Validate a partial update without applying it
    pub fn check_config(&self, partial: &RuleConfig) -> Result<(), String> {
        self.merge(partial).map(|_| ())
    }

    /// Apply a partial update. Returns false when the rule is not configurable
    /// or the merged settings are invalid; nothing changes in that case.
    pub fn update_config(&self, partial: &RuleConfig) -> bool {
        if !self.descriptor.configurable {
            return false;
        }
        let (settings, enabled) = match self.merge(partial) {
            Ok(merged) => merged,
            Err(_) => return false,
        };

        *self.settings.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(settings);
        if let Some(enabled) = enabled {
            self.set_enabled(enabled);
        }
        true
    }
}
