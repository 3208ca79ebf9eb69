// hm-client/src/oneshot.rs
// Oneshot 传输 - 内存通信
//
// 使用 Tower Service 的 oneshot 模式直接调用 Router，
// 同进程测试 / 本地模式下零网络开销。

use crate::error::{ClientError, ClientResult};
use crate::transport::{Transport, WireRequest, WireResponse};
use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use http::Request;
use reqwest::Url;
use tower::ServiceExt;

/// Transport that dispatches into an in-process axum [`Router`]
///
/// # Example
///
/// ```ignore
/// use axum::{Router, routing::get, Json};
/// use hm_client::RouterTransport;
///
/// let router = Router::new().route("/auth/code", get(|| async { Json(serde_json::json!({"code": 200})) }));
/// let transport = RouterTransport::new(router);
/// ```
#[derive(Debug, Clone)]
pub struct RouterTransport {
    router: Router,
}

impl RouterTransport {
    /// # Arguments
    /// * `router` - 已初始化的 Axum Router (with_state 已调用)
    pub fn new(router: Router) -> Self {
        Self { router }
    }

    fn build_request(request: WireRequest) -> ClientResult<Request<Body>> {
        let url = if request.query.is_empty() {
            Url::parse(&request.url)
        } else {
            Url::parse_with_params(&request.url, &request.query)
        }
        .map_err(|e| ClientError::Network(format!("Invalid URL {}: {e}", request.url)))?;

        let mut builder = Request::builder()
            .method(request.method)
            .uri(url.as_str());
        if let Some(headers) = builder.headers_mut() {
            headers.extend(request.headers);
        }
        builder
            .body(request.body.map(Body::from).unwrap_or_else(Body::empty))
            .map_err(|e| ClientError::Network(format!("Failed to build request: {e}")))
    }
}

#[async_trait]
impl Transport for RouterTransport {
    async fn send(&self, request: WireRequest) -> ClientResult<WireResponse> {
        let timeout = request.timeout;
        let http_request = Self::build_request(request)?;

        let call = self.router.clone().oneshot(http_request);
        let response = tokio::time::timeout(timeout, call)
            .await
            .map_err(|_| ClientError::Network(format!("timeout of {}ms exceeded", timeout.as_millis())))?
            .map_err(|e| ClientError::Network(format!("Oneshot call failed: {e}")))?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .map_err(|e| ClientError::Network(format!("Failed to read body: {e}")))?;

        Ok(WireResponse {
            status,
            headers,
            body,
        })
    }
}
