//! Typed read boundary over the operator settings table.
//!
//! Settings are stored as `(kind, config)` JSON rows written by an
//! external admin surface. Each kind is parsed into its own struct here;
//! nothing untyped crosses into dispatch logic. Malformed rows surface as
//! [`DispatchError::Config`], which is fatal at startup and a logged
//! fallback mid-run.

use serde::Deserialize;
use sqlx::PgPool;

use courier_common::error::DispatchError;

/// Operator chat ids that receive administrative reports.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminConfig {
    pub admin_ids: Vec<i64>,
}

/// Where status reports are delivered. When unset, reports fall back to
/// the individual admin chats.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportConfig {
    pub report_chat_id: Option<i64>,
}

/// Per-deployment dispatch overrides, merged over env defaults at startup.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DispatchOverrides {
    pub batch_size: Option<i64>,
    pub tick_interval_secs: Option<u64>,
}

/// A broadcast line appended to every delivered message while enabled.
#[derive(Debug, Clone, Deserialize)]
pub struct BroadcastRule {
    pub text: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

pub struct SettingsStore {
    pool: PgPool,
}

impl SettingsStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Dispatch overrides, if configured. Read once at startup; a
    /// malformed row is fatal there, never mid-run.
    pub async fn dispatch_overrides(&self) -> Result<DispatchOverrides, DispatchError> {
        match self.configs_of_kind("dispatch").await?.into_iter().next() {
            Some(value) => Self::parse("dispatch", value),
            None => Ok(DispatchOverrides::default()),
        }
    }

    pub async fn admin_chat_ids(&self) -> Result<Vec<i64>, DispatchError> {
        match self.configs_of_kind("admins").await?.into_iter().next() {
            Some(value) => Ok(Self::parse::<AdminConfig>("admins", value)?.admin_ids),
            None => Ok(Vec::new()),
        }
    }

    pub async fn report_chat_id(&self) -> Result<Option<i64>, DispatchError> {
        match self.configs_of_kind("report").await?.into_iter().next() {
            Some(value) => Ok(Self::parse::<ReportConfig>("report", value)?.report_chat_id),
            None => Ok(None),
        }
    }

    /// Enabled broadcast rules, in insertion order.
    pub async fn broadcast_rules(&self) -> Result<Vec<BroadcastRule>, DispatchError> {
        let mut rules = Vec::new();
        for value in self.configs_of_kind("broadcast").await? {
            let rule: BroadcastRule = Self::parse("broadcast", value)?;
            if rule.enabled {
                rules.push(rule);
            }
        }
        Ok(rules)
    }

    async fn configs_of_kind(&self, kind: &str) -> Result<Vec<serde_json::Value>, DispatchError> {
        let rows: Vec<(serde_json::Value,)> =
            sqlx::query_as("SELECT config FROM settings WHERE kind = $1 ORDER BY id")
                .bind(kind)
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().map(|(v,)| v).collect())
    }

    fn parse<T: for<'de> Deserialize<'de>>(
        kind: &str,
        value: serde_json::Value,
    ) -> Result<T, DispatchError> {
        serde_json::from_value(value)
            .map_err(|e| DispatchError::Config(format!("malformed '{kind}' setting: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_admin_config() {
        let value = serde_json::json!({ "admin_ids": [1001, 1002] });
        let config: AdminConfig = SettingsStore::parse("admins", value).unwrap();
        assert_eq!(config.admin_ids, vec![1001, 1002]);
    }

    #[test]
    fn test_parse_malformed_dispatch_config_is_config_error() {
        let value = serde_json::json!({ "batch_size": "ten" });
        let result: Result<DispatchOverrides, _> = SettingsStore::parse("dispatch", value);
        assert!(matches!(result, Err(DispatchError::Config(_))));
    }

    #[test]
    fn test_broadcast_rule_enabled_by_default() {
        let value = serde_json::json!({ "text": "visit us" });
        let rule: BroadcastRule = SettingsStore::parse("broadcast", value).unwrap();
        assert!(rule.enabled);
        assert_eq!(rule.text, "visit us");
    }

    #[test]
    fn test_parse_report_config_allows_missing_chat() {
        let value = serde_json::json!({});
        let config: ReportConfig = SettingsStore::parse("report", value).unwrap();
        assert!(config.report_chat_id.is_none());
    }
}
