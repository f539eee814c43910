//! Engine configuration.

use serde::{Deserialize, Serialize};

use ledgerline_store::KeyLayout;
use ledgerline_sync::SyncConfig;

use crate::error::Result;

/// Configuration for the engine. Every field has a default, so a config
/// file only needs the keys it changes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Persistence key prefixes.
    pub keys: KeyLayout,
    /// Sync triggers and pull policy.
    pub sync: SyncConfig,
}

impl EngineConfig {
    /// Parse a JSON config document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LedgerError;
    use ledgerline_sync::PullPolicy;

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(EngineConfig::from_json_str("{}").unwrap(), EngineConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let config = EngineConfig::from_json_str(
            r#"{
                "keys": { "outbox_prefix": "pending_" },
                "sync": { "pull_policy": "reapply_pending", "flush_on_mutation": false }
            }"#,
        )
        .unwrap();

        assert_eq!(config.keys.snapshot_prefix, "offline_");
        assert_eq!(config.keys.outbox_prefix, "pending_");
        assert_eq!(config.sync.pull_policy, PullPolicy::ReapplyPending);
        assert!(!config.sync.flush_on_mutation);
        assert!(config.sync.sync_on_open);
    }

    #[test]
    fn test_unknown_policy_is_rejected() {
        let err = EngineConfig::from_json_str(r#"{"sync":{"pull_policy":"merge"}}"#).unwrap_err();
        assert!(matches!(err, LedgerError::Config(_)));
    }
}
