// hm-table/src/prefs.rs
// 视图偏好 - 列显示与表格密度，按 persist key 持久化

use crate::descriptor::ColumnDescriptor;
use hm_client::KvStorage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnState {
    pub key: String,
    pub visible: bool,
}

/// Row density
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Density {
    Large,
    #[default]
    Middle,
    Small,
}

impl Density {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Large => "large",
            Self::Middle => "middle",
            Self::Small => "small",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "large" => Some(Self::Large),
            "middle" => Some(Self::Middle),
            "small" => Some(Self::Small),
            _ => None,
        }
    }
}

/// Known columns take the persisted choice, new columns start visible.
///
/// Column order follows the descriptors; persisted entries for columns
/// that no longer exist are dropped.
pub fn merge_column_states(columns: &[ColumnDescriptor], persisted: &[ColumnState]) -> Vec<ColumnState> {
    columns
        .iter()
        .map(|c| ColumnState {
            key: c.key.clone(),
            visible: persisted
                .iter()
                .find(|p| p.key == c.key)
                .is_none_or(|p| p.visible),
        })
        .collect()
}

/// Per-view preference store
#[derive(Clone)]
pub struct ViewPrefs {
    storage: Arc<dyn KvStorage>,
    persist_key: String,
}

impl ViewPrefs {
    pub fn new(storage: Arc<dyn KvStorage>, persist_key: impl Into<String>) -> Self {
        Self {
            storage,
            persist_key: persist_key.into(),
        }
    }

    pub fn columns_key(&self) -> String {
        format!("hm.columns.{}", self.persist_key)
    }

    pub fn density_key(&self) -> String {
        format!("hm.size.{}", self.persist_key)
    }

    /// Persisted states merged onto the current columns
    pub fn load_columns(&self, columns: &[ColumnDescriptor]) -> Vec<ColumnState> {
        let key = self.columns_key();
        let persisted = match self.storage.get_item(&key) {
            Some(raw) => serde_json::from_str::<Vec<ColumnState>>(&raw).unwrap_or_else(|e| {
                tracing::warn!(key = %key, error = %e, "Corrupt column preferences, showing all");
                Vec::new()
            }),
            None => Vec::new(),
        };
        merge_column_states(columns, &persisted)
    }

    pub fn save_columns(&self, states: &[ColumnState]) {
        match serde_json::to_string(states) {
            Ok(json) => self.storage.set_item(&self.columns_key(), &json),
            Err(e) => tracing::error!(error = %e, "Failed to encode column preferences"),
        }
    }

    pub fn load_density(&self) -> Density {
        self.storage
            .get_item(&self.density_key())
            .and_then(|raw| Density::parse(&raw))
            .unwrap_or_default()
    }

    pub fn save_density(&self, density: Density) {
        self.storage.set_item(&self.density_key(), density.as_str());
    }
}
