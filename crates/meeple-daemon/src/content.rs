// crates/meeple-daemon/src/content.rs
//
// HttpContentSimilarity: reqwest client for the external content-similarity
// service. The service receives the user's preference flags and answers with
// sparse `[item_id, similarity]` pairs, or `null` when it has nothing to say.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use meeple_core::{ContentScores, ContentSimilarity, ItemId, MeepleError};

/// Request body sent to the content service.
#[derive(Debug, Clone, Serialize)]
struct SimilarityRequest<'a> {
    preferences: &'a [bool],
}

/// Response body returned by the content service.
#[derive(Debug, Clone, Deserialize)]
struct SimilarityResponse {
    #[serde(default)]
    scores: Option<Vec<(ItemId, f64)>>,
}

/// Error body the content service sends with a 400 or 422.
#[derive(Debug, Clone, Default, Deserialize)]
struct RejectionBody {
    /// Preference vector length the service expects.
    #[serde(default)]
    expected: Option<usize>,
    #[serde(default)]
    detail: Option<String>,
}

/// Content-similarity collaborator reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpContentSimilarity {
    url: String,
    client: reqwest::Client,
}

impl HttpContentSimilarity {
    /// Create a client for `url` with a per-call timeout.
    pub fn new(url: String, timeout_secs: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { url, client }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Decode a content service body.
///
/// Non-finite similarities are rejected so they never reach normalization.
fn parse_scores(body: &[u8]) -> Result<Option<ContentScores>, MeepleError> {
    let response: SimilarityResponse = serde_json::from_slice(body)?;
    if let Some(scores) = &response.scores {
        if let Some((item_id, _)) = scores.iter().find(|(_, s)| !s.is_finite()) {
            return Err(MeepleError::Content(format!(
                "similarity for item {} is not finite",
                item_id
            )));
        }
    }
    Ok(response.scores)
}

/// Map a 400/422 from the content service to a rejected request.
///
/// With a known expected length this is a shape error on `preferences`.
fn rejection(body: &[u8], actual: usize) -> MeepleError {
    let parsed: RejectionBody = serde_json::from_slice(body).unwrap_or_default();
    match parsed.expected {
        Some(expected) => MeepleError::InvalidInputShape {
            field: "preferences".to_string(),
            expected,
            actual,
        },
        None => MeepleError::InvalidRequest(format!(
            "content service rejected preferences: {}",
            parsed.detail.as_deref().unwrap_or("no detail")
        )),
    }
}

#[async_trait]
impl ContentSimilarity for HttpContentSimilarity {
    async fn similarity(&self, preferences: &[bool]) -> Result<Option<ContentScores>, MeepleError> {
        let resp = self
            .client
            .post(&self.url)
            .json(&SimilarityRequest { preferences })
            .send()
            .await
            .map_err(|e| MeepleError::Content(format!("request to {} failed: {}", self.url, e)))?;

        let status = resp.status();
        if status == reqwest::StatusCode::BAD_REQUEST
            || status == reqwest::StatusCode::UNPROCESSABLE_ENTITY
        {
            let body = resp.bytes().await.unwrap_or_default();
            return Err(rejection(&body, preferences.len()));
        }
        if !status.is_success() {
            return Err(MeepleError::Content(format!(
                "{} returned HTTP {}",
                self.url, status
            )));
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| MeepleError::Content(format!("reading response failed: {}", e)))?;
        let scores = parse_scores(&body)?;
        tracing::debug!(
            url = %self.url,
            matches = scores.as_ref().map(Vec::len).unwrap_or(0),
            "Content service answered"
        );
        Ok(scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sparse_scores() {
        let scores = parse_scores(br#"{"scores": [[13, 0.9], [7, 0.25]]}"#).unwrap();
        assert_eq!(scores, Some(vec![(13, 0.9), (7, 0.25)]));
    }

    #[test]
    fn test_parse_null_scores_is_absent() {
        assert_eq!(parse_scores(br#"{"scores": null}"#).unwrap(), None);
        assert_eq!(parse_scores(b"{}").unwrap(), None);
    }

    #[test]
    fn test_parse_malformed_body() {
        assert!(matches!(
            parse_scores(b"<html>"),
            Err(MeepleError::Serialization(_))
        ));
    }

    #[test]
    fn test_rejection_with_expected_length_is_shape_error() {
        let err = rejection(br#"{"expected": 12}"#, 3);
        assert!(err.is_rejection());
        assert!(matches!(
            err,
            MeepleError::InvalidInputShape { expected: 12, actual: 3, .. }
        ));
    }

    #[test]
    fn test_rejection_without_body_is_invalid_request() {
        let err = rejection(b"", 3);
        assert!(matches!(err, MeepleError::InvalidRequest(_)));
        let err = rejection(br#"{"detail": "bad flags"}"#, 3);
        assert_eq!(
            err.to_string(),
            "Invalid request: content service rejected preferences: bad flags"
        );
    }

    #[test]
    fn test_request_body_shape() {
        let body = serde_json::to_value(SimilarityRequest {
            preferences: &[true, false],
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({ "preferences": [true, false] }));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_content_error() {
        // Port 9 (discard) is closed on test hosts.
        let client = HttpContentSimilarity::new("http://127.0.0.1:9/similarity".to_string(), 1);
        let err = client.similarity(&[true]).await.unwrap_err();
        assert!(matches!(err, MeepleError::Content(_)));
    }
}
