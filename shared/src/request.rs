//! List query types
//!
//! Every server-backed table speaks the same paging dialect: `pageNum`,
//! `pageSize`, an optional sort, and the filter values flattened into the
//! same object.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Default rows per page
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Sort direction as the table widget reports it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Ascend,
    Descend,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ascend => "ascend",
            Self::Descend => "descend",
        }
    }
}

/// Query sent to a list endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableQuery {
    /// Page number (1-based)
    pub page_num: u32,
    /// Rows per page
    pub page_size: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<SortOrder>,
    /// Transformed filter values, flattened on the wire
    #[serde(flatten)]
    pub filters: Map<String, Value>,
}

impl Default for TableQuery {
    fn default() -> Self {
        Self::new(1, DEFAULT_PAGE_SIZE)
    }
}

impl TableQuery {
    /// Page numbers and sizes below 1 are clamped to 1.
    pub fn new(page_num: u32, page_size: u32) -> Self {
        Self {
            page_num: page_num.max(1),
            page_size: page_size.max(1),
            sort_field: None,
            sort_order: None,
            filters: Map::new(),
        }
    }

    pub fn order_by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort_field = Some(field.into());
        self.sort_order = Some(order);
        self
    }

    pub fn filter(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.insert(name.into(), value.into());
        self
    }

    /// Get a filter value by name
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.filters.get(name)
    }

    /// Row offset of the first row on this page
    pub fn offset(&self) -> u64 {
        (self.page_num.saturating_sub(1)) as u64 * self.page_size as u64
    }

    /// Render as `key=value` pairs for a GET query string.
    ///
    /// Arrays are joined with commas, nulls are skipped.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("pageNum".to_string(), self.page_num.to_string()),
            ("pageSize".to_string(), self.page_size.to_string()),
        ];
        if let Some(field) = &self.sort_field {
            pairs.push(("sortField".to_string(), field.clone()));
        }
        if let Some(order) = self.sort_order {
            pairs.push(("sortOrder".to_string(), order.as_str().to_string()));
        }
        pairs.extend(map_to_query_pairs(&self.filters));
        pairs
    }
}

/// Flatten a JSON object into query pairs (arrays comma-joined, nulls skipped).
///
/// Non-object values produce no pairs.
pub fn value_to_query_pairs(value: &Value) -> Vec<(String, String)> {
    match value {
        Value::Object(map) => map_to_query_pairs(map),
        _ => Vec::new(),
    }
}

fn map_to_query_pairs(map: &Map<String, Value>) -> Vec<(String, String)> {
    map.iter()
        .filter_map(|(name, value)| render_query_value(value).map(|v| (name.clone(), v)))
        .collect()
}

fn render_query_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(render_query_value)
                .collect::<Vec<_>>()
                .join(","),
        ),
        other => Some(other.to_string()),
    }
}

/// Page of rows returned by a list endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableResult<T> {
    #[serde(default = "Vec::new")]
    pub rows: Vec<T>,
    #[serde(default)]
    pub total: u64,
}

impl<T> Default for TableResult<T> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            total: 0,
        }
    }
}

impl<T> TableResult<T> {
    pub fn new(rows: Vec<T>, total: u64) -> Self {
        Self { rows, total }
    }

    /// Number of pages for the given page size
    pub fn total_pages(&self, page_size: u32) -> u32 {
        if page_size == 0 {
            return 0;
        }
        self.total.div_ceil(page_size as u64) as u32
    }
}
