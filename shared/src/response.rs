//! API Response types
//!
//! The backend wraps every payload in the same envelope:
//! ```json
//! {
//!     "code": 200,
//!     "msg": "操作成功",
//!     "data": { ... }
//! }
//! ```
//! Some endpoints answer with `status`/`message` instead of `code`/`msg`,
//! and a missing code means success.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Response codes understood by the console.
///
/// Only a handful matter to the client; anything not listed is treated as
/// a plain business failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i64)]
pub enum RespCode {
    Success = 200,
    /// Some endpoints use 0 for success
    SuccessAlt = 0,
    Unauthorized = 401,
    Forbidden = 403,
    NotFound = 404,
    InternalServerError = 500,
    GatewayTimeout = 504,
    /// Business warning
    Warn = 601,
}

impl RespCode {
    pub fn code(self) -> i64 {
        self as i64
    }

    /// 200 and 0 both count as success
    pub fn is_success(code: i64) -> bool {
        code == Self::Success.code() || code == Self::SuccessAlt.code()
    }

    /// The session is gone and the user must log in again
    pub fn need_relogin(code: i64) -> bool {
        code == Self::Unauthorized.code()
    }
}

fn default_code() -> i64 {
    RespCode::Success.code()
}

/// Unified API response envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResult<T> {
    #[serde(default = "default_code", alias = "status")]
    pub code: i64,
    #[serde(default, alias = "message", skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResult<T> {
    pub fn ok(data: T) -> Self {
        Self {
            code: RespCode::Success.code(),
            msg: None,
            data: Some(data),
        }
    }

    pub fn error(code: i64, msg: impl Into<String>) -> Self {
        Self {
            code,
            msg: Some(msg.into()),
            data: None,
        }
    }

    pub fn is_success(&self) -> bool {
        RespCode::is_success(self.code)
    }
}

/// Read `code`, falling back to `status`, then to 200.
///
/// Works on the raw JSON so the pipeline can inspect any body shape,
/// including bare arrays and strings (which count as success).
/// A null field counts as missing. A code that is present but not a
/// whole number is a failure (500), never a success.
pub fn code_of(body: &Value) -> i64 {
    let field = [body.get("code"), body.get("status")]
        .into_iter()
        .flatten()
        .find(|v| !v.is_null());
    match field {
        None => default_code(),
        Some(v) => numeric_code(v).unwrap_or(RespCode::InternalServerError.code()),
    }
}

fn numeric_code(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| whole(n.as_f64()?)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| whole(s.parse::<f64>().ok()?))
        }
        _ => None,
    }
}

fn whole(f: f64) -> Option<i64> {
    (f.is_finite() && f.fract() == 0.0).then_some(f as i64)
}

/// Read `msg`, falling back to `message`.
pub fn message_of(body: &Value) -> Option<String> {
    body.get("msg")
        .or_else(|| body.get("message"))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// `data.data` when present and non-null, otherwise the whole body.
pub fn unwrap_data(body: Value) -> Value {
    match body {
        Value::Object(mut map) => match map.remove("data") {
            Some(inner) if !inner.is_null() => inner,
            Some(inner) => {
                map.insert("data".to_string(), inner);
                Value::Object(map)
            }
            None => Value::Object(map),
        },
        other => other,
    }
}
