use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SellError};
use crate::session::Session;

/// Fallback shown when the backend rejects a listing without a message
const FALLBACK_MESSAGE: &str = "Failed to create listing. Please try again.";

/// A listing record as the user composes it. `image_urls` stays empty until
/// every upload has settled.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingDraft {
    pub title: String,
    pub description: String,
    pub category: String,
    pub price: u64,
    pub condition: String,
    pub contact_method: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub meeting_location: String,
    pub image_urls: Vec<String>,
}

/// Listing as created by the backend
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingRecord {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Deserialize)]
struct ApiResponse {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<ListingRecord>,
}

/// Client for the listing-creation endpoint.
#[derive(Clone)]
pub struct ListingClient {
    client: reqwest::Client,
    endpoint: String,
    session: Session,
}

impl ListingClient {
    pub fn new(client: reqwest::Client, endpoint: String, session: Session) -> Self {
        Self {
            client,
            endpoint,
            session,
        }
    }

    /// Post the draft as a single record-creation request.
    ///
    /// The draft must already carry its final public image URLs. Any non-success
    /// response surfaces the server-provided message, or a generic fallback.
    /// Nothing is partially persisted on failure; the caller keeps the draft
    /// for retry.
    pub async fn submit(&self, draft: &ListingDraft) -> Result<ListingRecord> {
        if draft.image_urls.is_empty() {
            return Err(SellError::Other(anyhow!(
                "listing draft has no image URLs; uploads must complete first"
            )));
        }

        debug!("Submitting listing '{}' to {}", draft.title, self.endpoint);

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", self.session.bearer())
            .json(draft)
            .send()
            .await?;

        if !response.status().is_success() {
            // Prefer the server's own message when the body is well-formed
            let message = response
                .json::<ApiResponse>()
                .await
                .ok()
                .and_then(|r| r.message)
                .unwrap_or_else(|| FALLBACK_MESSAGE.to_string());
            return Err(SellError::ListingRejected { message });
        }

        let parsed: ApiResponse = response.json().await?;
        if !parsed.success {
            return Err(SellError::ListingRejected {
                message: parsed.message.unwrap_or_else(|| FALLBACK_MESSAGE.to_string()),
            });
        }

        parsed
            .data
            .ok_or_else(|| SellError::Other(anyhow!("backend reported success without a listing record")))
    }
}
