// hm-client/src/http.rs
// HTTP 客户端 - 逻辑动词 (get/post/put/delete) 走统一拦截链

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::pipeline::{
    IS_ENCRYPT, IS_TOKEN, Interceptors, RequestBody, RequestContext, ResponseBody,
    ResponseContext, ResponseType,
};
use crate::session::{SessionStore, StorageSession};
use crate::storage::MemoryStorage;
use crate::transport::{ReqwestTransport, Transport};
use crate::ui::{BuiltinMessages, Navigator, Notifier, TracingNavigator, TracingNotifier, Translate};
use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use shared::response::unwrap_data;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Per-call options
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    headers: HeaderMap,
    query: Vec<(String, String)>,
    timeout: Option<Duration>,
    cancel: Option<CancellationToken>,
    response_type: ResponseType,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a header; invalid names or values are logged and dropped
    pub fn header(mut self, name: &str, value: &str) -> Self {
        match (
            HeaderName::from_bytes(name.to_ascii_lowercase().as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            _ => tracing::warn!(name, "Ignoring invalid request header"),
        }
        self
    }

    /// `isToken: false` - send without the bearer token
    pub fn without_token(mut self) -> Self {
        self.headers.insert(IS_TOKEN, HeaderValue::from_static("false"));
        self
    }

    /// `isEncrypt: true` - encrypt the body (POST/PUT only)
    pub fn encrypted(mut self) -> Self {
        self.headers.insert(IS_ENCRYPT, HeaderValue::from_static("true"));
        self
    }

    pub fn query(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((name.into(), value.to_string()));
        self
    }

    /// Flatten a serializable object into query parameters
    pub fn params<P: Serialize + ?Sized>(mut self, params: &P) -> Self {
        match serde_json::to_value(params) {
            Ok(value) => self.query.extend(shared::value_to_query_pairs(&value)),
            Err(e) => tracing::warn!(error = %e, "Query params do not serialize, ignoring"),
        }
        self
    }

    /// Override the client's default timeout for this call
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn cancel_with(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn response_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = response_type;
        self
    }
}

struct Inner {
    interceptors: Interceptors,
    transport: Arc<dyn Transport>,
}

/// HTTP client running every call through the interceptor chain.
///
/// Cheap to clone; clones share session, collaborators and transport.
#[derive(Clone)]
pub struct HttpClient {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.inner.interceptors.config().base_url)
            .finish()
    }
}

impl HttpClient {
    pub fn builder(config: ClientConfig) -> HttpClientBuilder {
        HttpClientBuilder::new(config)
    }

    pub fn config(&self) -> &ClientConfig {
        self.inner.interceptors.config()
    }

    pub fn session(&self) -> &Arc<dyn SessionStore> {
        self.inner.interceptors.session()
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        self.inner.interceptors.notifier()
    }

    pub fn messages(&self) -> &Arc<dyn Translate> {
        self.inner.interceptors.messages()
    }

    pub fn relogin_pending(&self) -> bool {
        self.inner.interceptors.relogin_pending()
    }

    /// Run one call through both phases
    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<RequestBody>,
        options: RequestOptions,
    ) -> ClientResult<ResponseContext> {
        let interceptors = &self.inner.interceptors;
        let ctx = RequestContext {
            method,
            url: interceptors.config().url_for(path),
            headers: options.headers,
            query: options.query,
            body,
            timeout: options.timeout.unwrap_or(interceptors.config().timeout),
        };

        let ctx = interceptors.run_request(ctx).map_err(|e| {
            tracing::error!(url = %path, error = %e, "Request rejected before sending");
            e
        })?;
        tracing::debug!(method = %ctx.method, url = %ctx.url, "Request");
        let wire = ctx.into_wire()?;

        let send = self.inner.transport.send(wire);
        let result = match &options.cancel {
            Some(token) => {
                if token.is_cancelled() {
                    return Err(ClientError::Aborted);
                }
                tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        tracing::debug!(url = %path, "Request aborted");
                        return Err(ClientError::Aborted);
                    }
                    result = send => result,
                }
            }
            None => send.await,
        };

        let response = result.map_err(|e| interceptors.network_failure(e))?;
        tracing::debug!(url = %path, status = response.status, "Response");
        if !response.is_success() {
            return Err(interceptors.status_failure(&response));
        }

        interceptors.run_response(ResponseContext::from_wire(response, options.response_type))
    }

    async fn execute_value(
        &self,
        method: Method,
        path: &str,
        body: Option<RequestBody>,
        options: RequestOptions,
    ) -> ClientResult<Value> {
        let ctx = self.execute(method, path, body, options).await?;
        match ctx.body {
            ResponseBody::Json(value) => Ok(value),
            ResponseBody::Text(text) => Ok(Value::String(text)),
            ResponseBody::Binary(_) => Err(ClientError::InvalidResponse(
                "binary body where JSON was expected".into(),
            )),
        }
    }

    async fn execute_unwrapped<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<RequestBody>,
        options: RequestOptions,
    ) -> ClientResult<T> {
        let value = self.execute_value(method, path, body, options).await?;
        serde_json::from_value(unwrap_data(value))
            .map_err(|e| ClientError::InvalidResponse(format!("JSON parse error: {e}")))
    }

    fn json_body<B: Serialize + ?Sized>(body: &B) -> ClientResult<Option<RequestBody>> {
        Ok(Some(RequestBody::Json(serde_json::to_value(body)?)))
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str, options: RequestOptions) -> ClientResult<T> {
        self.execute_unwrapped(Method::GET, path, None, options).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        options: RequestOptions,
    ) -> ClientResult<T> {
        let body = Self::json_body(body)?;
        self.execute_unwrapped(Method::POST, path, body, options).await
    }

    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str, options: RequestOptions) -> ClientResult<T> {
        self.execute_unwrapped(Method::POST, path, None, options).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        options: RequestOptions,
    ) -> ClientResult<T> {
        let body = Self::json_body(body)?;
        self.execute_unwrapped(Method::PUT, path, body, options).await
    }

    /// DELETE, returning the whole envelope
    pub async fn delete(&self, path: &str, options: RequestOptions) -> ClientResult<Value> {
        self.raw(Method::DELETE, path, None, options).await
    }

    /// Any verb, returning the checked envelope without unwrapping `data`
    pub async fn raw(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        options: RequestOptions,
    ) -> ClientResult<Value> {
        self.execute_value(method, path, body.map(RequestBody::Json), options)
            .await
    }

    /// Download a file body
    pub async fn get_bytes(&self, path: &str, options: RequestOptions) -> ClientResult<Bytes> {
        let options = options.response_type(ResponseType::Blob);
        let ctx = self.execute(Method::GET, path, None, options).await?;
        match ctx.body {
            ResponseBody::Binary(bytes) => Ok(bytes),
            ResponseBody::Json(value) => Ok(Bytes::from(serde_json::to_vec(&value)?)),
            ResponseBody::Text(text) => Ok(Bytes::from(text)),
        }
    }
}

/// Builder wiring the collaborators into an [`HttpClient`]
pub struct HttpClientBuilder {
    config: ClientConfig,
    session: Option<Arc<dyn SessionStore>>,
    notifier: Arc<dyn Notifier>,
    navigator: Arc<dyn Navigator>,
    messages: Arc<dyn Translate>,
    transport: Option<Arc<dyn Transport>>,
}

impl HttpClientBuilder {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            session: None,
            notifier: Arc::new(TracingNotifier),
            navigator: Arc::new(TracingNavigator),
            messages: Arc::new(BuiltinMessages::default()),
            transport: None,
        }
    }

    pub fn session(mut self, session: Arc<dyn SessionStore>) -> Self {
        self.session = Some(session);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = navigator;
        self
    }

    pub fn messages(mut self, messages: Arc<dyn Translate>) -> Self {
        self.messages = messages;
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Defaults: in-memory session, reqwest transport, log-only UI
    pub fn build(self) -> ClientResult<HttpClient> {
        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new()?),
        };
        let session: Arc<dyn SessionStore> = match self.session {
            Some(session) => session,
            None => Arc::new(StorageSession::new(Arc::new(MemoryStorage::new()))),
        };
        let interceptors = Interceptors::new(
            self.config,
            session,
            self.notifier,
            self.navigator,
            self.messages,
        );
        Ok(HttpClient {
            inner: Arc::new(Inner {
                interceptors,
                transport,
            }),
        })
    }
}
