// crates/meeple-rpc/src/middleware.rs
//
// Middleware for the RPC server.

use tonic::{Request, Status};

/// Logging interceptor for incoming RPC requests.
///
/// Records the caller's user agent and content type at debug level; the
/// recommend handler logs the per-request outcome itself.
pub fn logging_interceptor(req: Request<()>) -> Result<Request<()>, Status> {
    let metadata = req.metadata();
    let field = |key: &str| {
        metadata
            .get(key)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-")
            .to_string()
    };
    tracing::debug!(
        user_agent = %field("user-agent"),
        content_type = %field("content-type"),
        remote = ?req.remote_addr(),
        "Incoming RPC request"
    );
    Ok(req)
}
