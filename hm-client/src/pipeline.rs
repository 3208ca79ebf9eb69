//! Request / response interceptor chain
//!
//! Both phases are explicit, ordered tables of named steps. Each step takes
//! the context by value and returns it (possibly changed) or an error that
//! ends the call.
//!
//! Request phase:
//! 1. `attach_token` - `clientid` header, `Authorization: Bearer` unless `isToken: false`
//! 2. `encrypt_body` - `isEncrypt: true` on POST/PUT: AES body, RSA-wrapped key in `encrypt-key`
//! 3. `default_content_type` - JSON when a body exists and nothing was set
//! 4. `strip_control_headers` - drop `isToken`
//!
//! Response phase:
//! 1. `decrypt_body` - `encrypt-key` header + text body, best effort
//! 2. `interpret_binary` - blob/arraybuffer bodies that are really JSON errors
//! 3. `check_envelope` - `{code, msg, data}` success / 401 / business failure

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::session::SessionStore;
use crate::transport::{WireRequest, WireResponse};
use crate::ui::{Navigator, Notifier, Translate, keys};
use bytes::Bytes;
use hm_crypto::CryptoError;
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde_json::Value;
use shared::RespCode;
use shared::response::{code_of, message_of};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Request-local flag: `false` skips the bearer token (stripped before send)
pub const IS_TOKEN: HeaderName = HeaderName::from_static("istoken");
/// Request flag: `true` encrypts the body (left for the server)
pub const IS_ENCRYPT: HeaderName = HeaderName::from_static("isencrypt");
/// Key material header, both directions
pub const ENCRYPT_KEY: HeaderName = HeaderName::from_static("encrypt-key");
pub const CLIENT_ID: HeaderName = HeaderName::from_static("clientid");

pub const JSON_CONTENT_TYPE: &str = "application/json;charset=utf-8";

/// How the caller wants the response body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseType {
    #[default]
    Json,
    Text,
    Blob,
    ArrayBuffer,
}

impl ResponseType {
    pub fn is_binary(self) -> bool {
        matches!(self, Self::Blob | Self::ArrayBuffer)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(Value),
    Text(String),
}

impl RequestBody {
    fn to_bytes(&self) -> ClientResult<Bytes> {
        Ok(match self {
            Self::Json(value) => Bytes::from(serde_json::to_vec(value)?),
            Self::Text(text) => Bytes::from(text.clone()),
        })
    }
}

/// Request moving through the request phase
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub query: Vec<(String, String)>,
    pub body: Option<RequestBody>,
    pub timeout: Duration,
}

impl RequestContext {
    fn flag(&self, name: &HeaderName) -> Option<bool> {
        let value = self.headers.get(name)?.to_str().ok()?.trim();
        if value.eq_ignore_ascii_case("true") {
            Some(true)
        } else if value.eq_ignore_ascii_case("false") {
            Some(false)
        } else {
            None
        }
    }

    pub fn into_wire(self) -> ClientResult<WireRequest> {
        let body = self.body.as_ref().map(RequestBody::to_bytes).transpose()?;
        Ok(WireRequest {
            method: self.method,
            url: self.url,
            query: self.query,
            headers: self.headers,
            body,
            timeout: self.timeout,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
    Binary(Bytes),
}

/// Response moving through the response phase
#[derive(Debug, Clone)]
pub struct ResponseContext {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: ResponseBody,
    pub response_type: ResponseType,
}

impl ResponseContext {
    pub fn from_wire(response: WireResponse, response_type: ResponseType) -> Self {
        let body = if response_type.is_binary() {
            ResponseBody::Binary(response.body)
        } else {
            let text = String::from_utf8_lossy(&response.body).into_owned();
            match response_type {
                ResponseType::Json => match serde_json::from_str::<Value>(&text) {
                    Ok(value) => ResponseBody::Json(value),
                    // 加密响应体是 base64 字符串
                    Err(_) => ResponseBody::Text(text),
                },
                _ => ResponseBody::Text(text),
            }
        };
        Self {
            status: response.status,
            headers: response.headers,
            body,
            response_type,
        }
    }

    fn header(&self, name: &HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    fn is_json_content(&self) -> bool {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("application/json"))
    }
}

pub type RequestStep = fn(&Interceptors, RequestContext) -> ClientResult<RequestContext>;
pub type ResponseStep = fn(&Interceptors, ResponseContext) -> ClientResult<ResponseContext>;

pub const REQUEST_STEPS: &[(&str, RequestStep)] = &[
    ("attach_token", attach_token),
    ("encrypt_body", encrypt_body),
    ("default_content_type", default_content_type),
    ("strip_control_headers", strip_control_headers),
];

pub const RESPONSE_STEPS: &[(&str, ResponseStep)] = &[
    ("decrypt_body", decrypt_body),
    ("interpret_binary", interpret_binary),
    ("check_envelope", check_envelope),
];

/// Collaborators shared by every step
pub struct Interceptors {
    pub(crate) config: ClientConfig,
    pub(crate) session: Arc<dyn SessionStore>,
    pub(crate) notifier: Arc<dyn Notifier>,
    pub(crate) navigator: Arc<dyn Navigator>,
    pub(crate) messages: Arc<dyn Translate>,
    relogin_pending: Arc<AtomicBool>,
}

impl Interceptors {
    pub fn new(
        config: ClientConfig,
        session: Arc<dyn SessionStore>,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
        messages: Arc<dyn Translate>,
    ) -> Self {
        Self {
            config,
            session,
            notifier,
            navigator,
            messages,
            relogin_pending: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &Arc<dyn SessionStore> {
        &self.session
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    pub fn messages(&self) -> &Arc<dyn Translate> {
        &self.messages
    }

    /// Whether a login redirect is scheduled but not yet done
    pub fn relogin_pending(&self) -> bool {
        self.relogin_pending.load(Ordering::SeqCst)
    }

    pub fn run_request(&self, mut ctx: RequestContext) -> ClientResult<RequestContext> {
        for (name, step) in REQUEST_STEPS {
            tracing::trace!(step = name, url = %ctx.url, "request step");
            ctx = step(self, ctx)?;
        }
        Ok(ctx)
    }

    pub fn run_response(&self, mut ctx: ResponseContext) -> ClientResult<ResponseContext> {
        for (name, step) in RESPONSE_STEPS {
            tracing::trace!(step = name, status = ctx.status, "response step");
            ctx = step(self, ctx)?;
        }
        Ok(ctx)
    }

    /// Clear the token, tell the user, and redirect to login after the delay.
    ///
    /// While a redirect is pending, further calls only clear the token.
    pub fn session_expired(&self) {
        self.session.clear_token();
        if self.relogin_pending.swap(true, Ordering::SeqCst) {
            tracing::debug!("Login redirect already pending");
            return;
        }
        tracing::info!("Session expired, redirecting to login");
        self.notifier.error(&self.messages.t(keys::SESSION_EXPIRED, &[]));

        let navigator = self.navigator.clone();
        let pending = self.relogin_pending.clone();
        let delay = self.config.relogin_delay;
        let target = self.config.login_path();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            navigator.redirect(&target);
            pending.store(false, Ordering::SeqCst);
        });
    }

    /// Non-2xx status: 401 is a session expiry, anything else a templated error
    pub fn status_failure(&self, response: &WireResponse) -> ClientError {
        if response.status == 401 {
            self.session_expired();
            return ClientError::Unauthorized;
        }
        let server_message = serde_json::from_slice::<Value>(&response.body)
            .ok()
            .as_ref()
            .and_then(message_of);
        let message = server_message.unwrap_or_else(|| {
            let status = response.status.to_string();
            self.messages.t(keys::STATUS_ERROR, &[("status", status.as_str())])
        });
        tracing::warn!(status = response.status, %message, "HTTP error status");
        self.notifier.error(&message);
        ClientError::Http {
            status: response.status,
            message,
        }
    }

    /// Nothing came back
    pub fn network_failure(&self, error: ClientError) -> ClientError {
        match error {
            ClientError::Network(detail) => {
                tracing::warn!(%detail, "Network failure");
                self.notifier.error(&self.messages.t(keys::NETWORK_ERROR, &[]));
                ClientError::Network(detail)
            }
            other => other,
        }
    }
}

// =============================================================================
// Request steps
// =============================================================================

fn attach_token(ic: &Interceptors, mut ctx: RequestContext) -> ClientResult<RequestContext> {
    if !ctx.headers.contains_key(&CLIENT_ID) {
        if let Ok(value) = HeaderValue::from_str(&ic.config.client_id) {
            ctx.headers.insert(CLIENT_ID, value);
        }
    }
    if ctx.flag(&IS_TOKEN) == Some(false) {
        return Ok(ctx);
    }
    if let Some(token) = ic.session.token() {
        match HeaderValue::from_str(&format!("Bearer {token}")) {
            Ok(value) => {
                ctx.headers.insert(AUTHORIZATION, value);
            }
            Err(_) => tracing::warn!("Stored token is not a valid header value, skipping"),
        }
    }
    Ok(ctx)
}

fn encrypt_body(ic: &Interceptors, mut ctx: RequestContext) -> ClientResult<RequestContext> {
    if ctx.flag(&IS_ENCRYPT) != Some(true) {
        return Ok(ctx);
    }
    if ctx.method != Method::POST && ctx.method != Method::PUT {
        return Ok(ctx);
    }
    let Some(body) = ctx.body.take() else {
        return Ok(ctx);
    };

    let public_key = ic
        .config
        .rsa_public_key
        .as_deref()
        .ok_or_else(|| CryptoError::Config("RSA public key is not configured".into()))?;

    let plain = match &body {
        RequestBody::Json(value) => serde_json::to_string(value)?,
        RequestBody::Text(text) => serde_json::to_string(text)?,
    };
    let aes_key = hm_crypto::generate_aes_key();
    let wrapped = hm_crypto::encrypt_with_public_key(&hm_crypto::encode_base64(&aes_key), public_key)?;
    let ciphertext = hm_crypto::encrypt_with_aes(&plain, &aes_key)?;

    let header = HeaderValue::from_str(&wrapped)
        .map_err(|e| CryptoError::Config(format!("wrapped key is not a header value: {e}")))?;
    ctx.headers.insert(ENCRYPT_KEY, header);
    ctx.body = Some(RequestBody::Text(ciphertext));
    tracing::debug!(url = %ctx.url, "Request body encrypted");
    Ok(ctx)
}

fn default_content_type(_: &Interceptors, mut ctx: RequestContext) -> ClientResult<RequestContext> {
    if ctx.body.is_some() && !ctx.headers.contains_key(CONTENT_TYPE) {
        ctx.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
    }
    Ok(ctx)
}

fn strip_control_headers(_: &Interceptors, mut ctx: RequestContext) -> ClientResult<RequestContext> {
    ctx.headers.remove(IS_TOKEN);
    Ok(ctx)
}

// =============================================================================
// Response steps
// =============================================================================

fn decrypt_body(_: &Interceptors, mut ctx: ResponseContext) -> ClientResult<ResponseContext> {
    let Some(encoded_key) = ctx.header(&ENCRYPT_KEY).map(str::to_string) else {
        return Ok(ctx);
    };
    // 密文可能被当成 JSON 字符串解析
    let ciphertext = match &ctx.body {
        ResponseBody::Text(text) => text,
        ResponseBody::Json(Value::String(text)) => text,
        _ => return Ok(ctx),
    };

    // 响应侧的 key 只做 base64，不做 RSA 解包
    let decrypted = hm_crypto::decode_base64(&encoded_key)
        .and_then(|key| hm_crypto::decrypt_with_aes(ciphertext, &key))
        .map_err(|e| e.to_string())
        .and_then(|plain| serde_json::from_str::<Value>(&plain).map_err(|e| e.to_string()));

    match decrypted {
        Ok(value) => ctx.body = ResponseBody::Json(value),
        Err(e) => tracing::warn!(error = %e, "Response decryption failed, keeping ciphertext"),
    }
    Ok(ctx)
}

fn interpret_binary(_: &Interceptors, mut ctx: ResponseContext) -> ClientResult<ResponseContext> {
    if !ctx.response_type.is_binary() || !ctx.is_json_content() {
        return Ok(ctx);
    }
    let ResponseBody::Binary(bytes) = &ctx.body else {
        return Ok(ctx);
    };
    // 下载接口出错时返回 JSON，交给 check_envelope 判断
    match serde_json::from_slice::<Value>(bytes) {
        Ok(value) => ctx.body = ResponseBody::Json(value),
        Err(e) => tracing::warn!(error = %e, "JSON-typed binary body does not parse"),
    }
    Ok(ctx)
}

fn check_envelope(ic: &Interceptors, ctx: ResponseContext) -> ClientResult<ResponseContext> {
    let ResponseBody::Json(body) = &ctx.body else {
        return Ok(ctx);
    };
    let code = code_of(body);
    if RespCode::is_success(code) {
        return Ok(ctx);
    }
    if RespCode::need_relogin(code) {
        ic.session_expired();
        return Err(ClientError::Unauthorized);
    }
    let message = message_of(body).unwrap_or_else(|| ic.messages.t(keys::REQUEST_FAILED, &[]));
    tracing::warn!(code, %message, "Business failure");
    ic.notifier.error(&message);
    Err(ClientError::Business { code, message })
}
