// crates/meeple-rpc/src/handlers/node.rs
//
// Node health handler: GetHealth.

use std::time::Instant;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// GetHealth
// ---------------------------------------------------------------------------

/// Request for node health status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetHealthRequest {}

/// Response containing node health status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetHealthResponse {
    /// Overall health: "healthy" or "degraded".
    pub status: String,
    /// Software version.
    pub version: String,
    /// Uptime in seconds.
    pub uptime_seconds: u64,
    /// Number of catalog items being served.
    pub catalog_items: usize,
    /// Whether a content-similarity service is configured.
    pub content_service: bool,
    /// Human-readable details.
    pub details: Option<String>,
}

/// Handle a GetHealth request.
///
/// Without a content service the node still serves, but only in the
/// CF-only degraded mode, and reports "degraded".
pub async fn handle_get_health(
    _request: GetHealthRequest,
    catalog_items: usize,
    content_service: bool,
    start_time: Option<Instant>,
) -> Result<GetHealthResponse, String> {
    let (status, details) = if content_service {
        ("healthy", "Serving hybrid CF + content recommendations".to_string())
    } else {
        (
            "degraded",
            "No content service configured: content signal only from precomputed scores"
                .to_string(),
        )
    };

    Ok(GetHealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: start_time.map(|t| t.elapsed().as_secs()).unwrap_or(0),
        catalog_items,
        content_service,
        details: Some(details),
    })
}
