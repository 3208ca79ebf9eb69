//! hm-client - HTTP pipeline for the hm admin console
//!
//! Every call goes through the same chain: token injection, optional
//! RSA+AES body encryption, response decryption and unified handling of
//! the `{code, msg, data}` envelope (including session-expiry redirect).
//!
//! # Example
//!
//! ```ignore
//! use hm_client::{ClientConfig, HttpClient, MemoryStorage, StorageSession};
//! use std::sync::Arc;
//!
//! let session = Arc::new(StorageSession::new(Arc::new(MemoryStorage::new())));
//! let client = HttpClient::builder(ClientConfig::from_env())
//!     .session(session)
//!     .build()?;
//!
//! let info: shared::client::UserInfo = client.get("/system/user/getInfo", Default::default()).await?;
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod http;
pub mod oneshot;
pub mod permission;
pub mod pipeline;
pub mod session;
pub mod storage;
pub mod transport;
pub mod ui;

pub use config::ClientConfig;
pub use error::{ClientError, ClientResult, StorageError};
pub use http::{HttpClient, HttpClientBuilder, RequestOptions};
pub use oneshot::RouterTransport;
pub use permission::{PermissionSet, SUPER_PERMISSION};
pub use pipeline::{RequestBody, ResponseBody, ResponseType};
pub use session::{RememberedLogin, SessionStore, StorageSession};
pub use storage::{FileStorage, KvStorage, MemoryStorage};
pub use transport::{ReqwestTransport, Transport, WireRequest, WireResponse};
pub use ui::{BuiltinMessages, Locale, Navigator, Notifier, TracingNavigator, TracingNotifier, Translate};

// Re-export shared types for convenience
pub use shared::{ApiResult, RespCode, TableQuery, TableResult};
