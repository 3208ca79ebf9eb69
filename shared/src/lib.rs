//! Shared types for the hm console
//!
//! Wire types used by both the HTTP pipeline and the table controller:
//! the response envelope, response codes, list query/result shapes and
//! the API DTOs.

pub mod client;
pub mod models;
pub mod request;
pub mod response;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use request::{SortOrder, TableQuery, TableResult, value_to_query_pairs};
pub use response::{ApiResult, RespCode};
