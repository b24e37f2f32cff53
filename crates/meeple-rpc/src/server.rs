// crates/meeple-rpc/src/server.rs
//
// RPC server setup: MeepleRpcServer and RpcConfig.
//
// Uses a JSON-RPC-over-gRPC approach. A single tonic unary service accepts
// JSON-encoded requests with a method field, dispatches to the appropriate
// handler, and returns JSON-encoded responses. HTTP/1 is accepted, so plain
// `POST` clients work as well.

use std::sync::Arc;
use std::time::Instant;

use http_body::Body as HttpBody;
use http_body_util::BodyExt;
use serde::{Deserialize, Serialize};
use tonic::transport::Server;
use tonic::Status;

use meeple_engine::HybridRecommender;

use crate::handlers;
use crate::handlers::model::ModelProvenance;
use crate::handlers::recommend::{RequestLimits, SharedContent};
use crate::middleware;

/// Largest request body accepted, in bytes.
pub const MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

// ---------------------------------------------------------------------------
// RpcConfig
// ---------------------------------------------------------------------------

/// Configuration for the RPC server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    /// Host to bind to (e.g., "127.0.0.1" or "0.0.0.0").
    pub host: String,
    /// Port to listen on.
    pub port: u16,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 50061,
        }
    }
}

// ---------------------------------------------------------------------------
// JSON-RPC Envelope
// ---------------------------------------------------------------------------

/// A JSON-RPC-style request envelope.
/// The client sends a method name and a JSON params payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// The RPC method to invoke (e.g., "recommend", "model/info").
    pub method: String,
    /// JSON-encoded parameters for the method.
    #[serde(default)]
    pub params: serde_json::Value,
}

/// A JSON-RPC-style response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Whether the request succeeded.
    pub success: bool,
    /// The result data (if success).
    pub result: Option<serde_json::Value>,
    /// Error message (if not success).
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// MeepleRpcServer
// ---------------------------------------------------------------------------

/// The RPC server for the Meeple recommender.
///
/// Holds the shared recommender (and through it the immutable model) plus
/// the optional content collaborator, and exposes them through a tonic-based
/// server with JSON-RPC dispatching.
#[derive(Clone)]
pub struct MeepleRpcServer {
    /// Server configuration.
    config: RpcConfig,
    /// Hybrid recommender over the shared model artifact.
    recommender: Arc<HybridRecommender>,
    /// Content-similarity collaborator, if configured.
    content: Option<SharedContent>,
    /// Boundary limits for recommend requests.
    limits: RequestLimits,
    /// Where the model artifact was loaded from.
    provenance: Option<ModelProvenance>,
    /// Daemon start time for uptime calculation.
    start_time: Option<Instant>,
}

impl std::fmt::Debug for MeepleRpcServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeepleRpcServer")
            .field("config", &self.config)
            .field("limits", &self.limits)
            .field("content_enabled", &self.content.is_some())
            .finish()
    }
}

impl MeepleRpcServer {
    /// Create a new MeepleRpcServer.
    ///
    /// # Arguments
    /// * `config` - Server configuration (host, port).
    /// * `recommender` - Shared hybrid recommender.
    pub fn new(config: RpcConfig, recommender: Arc<HybridRecommender>) -> Self {
        Self {
            config,
            recommender,
            content: None,
            limits: RequestLimits::default(),
            provenance: None,
            start_time: None,
        }
    }

    /// Set the content-similarity collaborator.
    pub fn with_content_service(mut self, content: Option<SharedContent>) -> Self {
        self.content = content;
        self
    }

    /// Set the boundary limits for recommend requests.
    pub fn with_limits(mut self, limits: RequestLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Set the artifact provenance reported by `model/info`.
    pub fn with_provenance(mut self, provenance: ModelProvenance) -> Self {
        self.provenance = Some(provenance);
        self
    }

    /// Set the daemon start time for uptime calculation.
    pub fn with_start_time(mut self, st: Instant) -> Self {
        self.start_time = Some(st);
        self
    }

    fn service(&self) -> MeepleServiceImpl {
        MeepleServiceImpl {
            recommender: self.recommender.clone(),
            content: self.content.clone(),
            limits: Arc::new(self.limits.clone()),
            provenance: self.provenance.clone().map(Arc::new),
            start_time: self.start_time,
        }
    }

    /// Start the RPC server and listen for requests.
    ///
    /// This binds to the configured address and serves requests until
    /// `shutdown` resolves.
    pub async fn start<F>(&self, shutdown: F) -> Result<(), Box<dyn std::error::Error>>
    where
        F: std::future::Future<Output = ()> + Send,
    {
        let addr = format!("{}:{}", self.config.host, self.config.port).parse()?;

        tracing::info!("Meeple RPC server starting on {}", addr);

        Server::builder()
            .accept_http1(true)
            .add_service(
                tonic::service::interceptor::InterceptedService::new(
                    MeepleJsonRpcServer::new(self.service()),
                    middleware::logging_interceptor,
                ),
            )
            .serve_with_shutdown(addr, shutdown)
            .await?;

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// gRPC Service Definition (manual, no proto codegen)
// ---------------------------------------------------------------------------

/// The internal service implementation that holds shared state
/// and dispatches JSON-RPC calls to the appropriate handler.
#[derive(Clone)]
struct MeepleServiceImpl {
    recommender: Arc<HybridRecommender>,
    content: Option<SharedContent>,
    limits: Arc<RequestLimits>,
    provenance: Option<Arc<ModelProvenance>>,
    start_time: Option<Instant>,
}

impl MeepleServiceImpl {
    /// Dispatch a JSON-RPC request to the appropriate handler based on the method name.
    async fn dispatch(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let result = match request.method.as_str() {
            "recommend" => {
                let recommender = self.recommender.clone();
                let content = self.content.clone();
                let limits = self.limits.clone();
                dispatch_handler(request.params, |r| async move {
                    handlers::recommend::handle_recommend(&recommender, content.as_ref(), &limits, r)
                        .await
                })
                .await
            }
            "model/info" => {
                let recommender = self.recommender.clone();
                let provenance = self.provenance.clone();
                dispatch_handler(request.params, |r| async move {
                    handlers::model::handle_get_model_info(
                        r,
                        &recommender,
                        provenance.as_deref(),
                    )
                    .await
                })
                .await
            }
            "node/health" => {
                let items = self.recommender.artifact().len();
                let content_service = self.content.is_some();
                let start_time = self.start_time;
                dispatch_handler(request.params, |r| async move {
                    handlers::node::handle_get_health(r, items, content_service, start_time).await
                })
                .await
            }

            _ => Err(format!("Unknown method: {}", request.method)),
        };

        match result {
            Ok(value) => JsonRpcResponse {
                success: true,
                result: Some(value),
                error: None,
            },
            Err(err) => JsonRpcResponse {
                success: false,
                result: None,
                error: Some(err),
            },
        }
    }
}

/// Generic dispatch helper: deserialize params into a request type,
/// call the handler, and serialize the result to JSON.
///
/// Missing params (`null`) are treated as an empty object.
async fn dispatch_handler<Req, Resp, F, Fut>(
    params: serde_json::Value,
    handler: F,
) -> Result<serde_json::Value, String>
where
    Req: serde::de::DeserializeOwned,
    Resp: serde::Serialize,
    F: FnOnce(Req) -> Fut,
    Fut: std::future::Future<Output = Result<Resp, String>>,
{
    let params = if params.is_null() {
        serde_json::Value::Object(serde_json::Map::new())
    } else {
        params
    };
    let request: Req = serde_json::from_value(params)
        .map_err(|e| format!("Failed to deserialize request: {}", e))?;
    let response = handler(request).await?;
    serde_json::to_value(response).map_err(|e| format!("Failed to serialize response: {}", e))
}

// ---------------------------------------------------------------------------
// Tonic Service Wiring
// ---------------------------------------------------------------------------
// We define a single gRPC service with one method: `Call`.
// The request and response are raw bytes (JSON-encoded JsonRpcRequest/Response).
// This avoids proto codegen entirely.

/// The tonic service wrapper. Implements the low-level gRPC service
/// by accepting bytes, deserializing as JSON-RPC, and dispatching.
#[derive(Clone)]
pub struct MeepleJsonRpcServer {
    inner: MeepleServiceImpl,
}

impl std::fmt::Debug for MeepleJsonRpcServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeepleJsonRpcServer").finish()
    }
}

impl MeepleJsonRpcServer {
    fn new(inner: MeepleServiceImpl) -> Self {
        Self { inner }
    }
}

impl tonic::server::NamedService for MeepleJsonRpcServer {
    const NAME: &'static str = "meeple.rpc.RecommenderService";
}

impl<B> tower_service::Service<http::Request<B>> for MeepleJsonRpcServer
where
    B: HttpBody + Send + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>> + Send,
    B::Data: Send,
{
    type Response = http::Response<tonic::body::BoxBody>;
    type Error = std::convert::Infallible;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: http::Request<B>) -> Self::Future {
        let inner = self.inner.clone();

        Box::pin(async move {
            // Read the full request body.
            let body = req.into_body();
            let body_bytes = match collect_body(body, MAX_BODY_BYTES).await {
                Ok(b) => b,
                Err(e) => {
                    tracing::error!("Failed to read request body: {}", e);
                    return Ok(error_response(format!("Failed to read request body: {}", e)));
                }
            };

            // Deserialize the JSON-RPC request.
            let rpc_request: JsonRpcRequest = match serde_json::from_slice(&body_bytes) {
                Ok(r) => r,
                Err(e) => {
                    return Ok(error_response(format!("Invalid JSON-RPC request: {}", e)));
                }
            };

            // Dispatch to the appropriate handler.
            let rpc_response = inner.dispatch(rpc_request).await;
            let json = serde_json::to_vec(&rpc_response).unwrap_or_default();
            Ok(build_response(json))
        })
    }
}

/// Collect the body of an HTTP request into bytes, failing once it grows
/// past `limit`.
async fn collect_body<B>(body: B, limit: usize) -> Result<Vec<u8>, String>
where
    B: HttpBody + Send,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    B::Data: Send,
{
    let mut collected = Vec::new();
    let mut body = std::pin::pin!(body);

    loop {
        match std::future::poll_fn(|cx| HttpBody::poll_frame(body.as_mut(), cx)).await {
            Some(Ok(frame)) => {
                if let Ok(data) = frame.into_data() {
                    use bytes::Buf;
                    if collected.len() + data.remaining() > limit {
                        return Err(format!("body exceeds {} bytes", limit));
                    }
                    collected.extend_from_slice(data.chunk());
                }
            }
            Some(Err(e)) => return Err(e.into().to_string()),
            None => break,
        }
    }

    Ok(collected)
}

/// Build an HTTP response carrying a failed JSON-RPC envelope.
fn error_response(message: String) -> http::Response<tonic::body::BoxBody> {
    let resp = JsonRpcResponse {
        success: false,
        result: None,
        error: Some(message),
    };
    build_response(serde_json::to_vec(&resp).unwrap_or_default())
}

/// Build an HTTP response with the given JSON body.
fn build_response(json: Vec<u8>) -> http::Response<tonic::body::BoxBody> {
    let body = tonic::body::BoxBody::new(
        http_body_util::Full::new(bytes::Bytes::from(json))
            .map_err(|e| Status::internal(format!("body error: {}", e))),
    );

    let mut response = http::Response::new(body);
    response.headers_mut().insert(
        http::header::CONTENT_TYPE,
        http::HeaderValue::from_static("application/json"),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use meeple_core::ModelArtifact;
    use meeple_engine::BlendConfig;

    fn server() -> MeepleRpcServer {
        let artifact = ModelArtifact::new(
            vec![100, 200, 300],
            vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0]],
            vec![0.1, 0.0, -0.1],
            6.0,
            0.1,
        )
        .unwrap();
        let recommender =
            HybridRecommender::new(Arc::new(artifact), BlendConfig::default()).unwrap();
        MeepleRpcServer::new(RpcConfig::default(), Arc::new(recommender))
            .with_start_time(Instant::now())
    }

    fn call(method: &str, params: serde_json::Value) -> JsonRpcRequest {
        JsonRpcRequest {
            method: method.to_string(),
            params,
        }
    }

    #[tokio::test]
    async fn test_dispatch_recommend() {
        let service = server().service();
        let resp = service
            .dispatch(call(
                "recommend",
                serde_json::json!({ "username": "carol", "ratings": [[100, 9.0]], "top_n": 5 }),
            ))
            .await;
        assert!(resp.success, "{:?}", resp.error);
        let result = resp.result.unwrap();
        assert_eq!(result["username"], "carol");
        let recs = result["recommendations"].as_array().unwrap();
        assert_eq!(recs.len(), 2);
        assert!(recs.iter().all(|pair| pair[0] != 100));
    }

    #[tokio::test]
    async fn test_dispatch_rejects_malformed_params() {
        let service = server().service();
        let resp = service
            .dispatch(call("recommend", serde_json::json!({ "ratings": "lots" })))
            .await;
        assert!(!resp.success);
        assert!(resp.error.unwrap().starts_with("Failed to deserialize request"));
    }

    #[tokio::test]
    async fn test_dispatch_null_params_use_defaults() {
        let service = server().service();
        let resp = service
            .dispatch(call("recommend", serde_json::Value::Null))
            .await;
        assert!(resp.success);
        let result = resp.result.unwrap();
        assert_eq!(result["username"], "unknown");
        assert_eq!(result["fold_in"], "no_ratings");
        assert_eq!(result["recommendations"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_dispatch_model_info_and_health() {
        let service = server().service();
        let info = service.dispatch(call("model/info", serde_json::json!({}))).await;
        assert!(info.success);
        assert_eq!(info.result.unwrap()["items"], 3);

        let health = service.dispatch(call("node/health", serde_json::json!({}))).await;
        assert!(health.success);
        assert_eq!(health.result.unwrap()["status"], "degraded");
    }

    #[tokio::test]
    async fn test_collect_body_enforces_limit() {
        let small = http_body_util::Full::new(bytes::Bytes::from_static(b"{\"method\":\"x\"}"));
        assert_eq!(collect_body(small, 64).await.unwrap().len(), 14);

        let large = http_body_util::Full::new(bytes::Bytes::from(vec![b' '; 65]));
        let err = collect_body(large, 64).await.unwrap_err();
        assert_eq!(err, "body exceeds 64 bytes");
    }

    #[tokio::test]
    async fn test_dispatch_unknown_method() {
        let service = server().service();
        let resp = service.dispatch(call("items/list", serde_json::json!({}))).await;
        assert!(!resp.success);
        assert_eq!(resp.error.as_deref(), Some("Unknown method: items/list"));
    }
}
