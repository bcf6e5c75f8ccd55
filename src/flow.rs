use std::time::Duration;

use anyhow::anyhow;
use indicatif::MultiProgress;
use tracing::{info, warn};

use crate::broker::BrokerClient;
use crate::error::{Result, SellError};
use crate::listing::{ListingClient, ListingDraft, ListingRecord};
use crate::stager::FileStager;
use crate::uploader;

/// Run the whole sell flow: sign, upload, submit.
///
/// The three stages are strictly ordered: the broker call fully precedes the
/// uploads, and the uploads fully precede the submit. Any stage failure aborts
/// the attempt and leaves the caller's draft and staged files untouched, so
/// the user can retry. If any individual upload fails, the listing is NOT
/// submitted (`UploadsIncomplete`); a listing with dead image URLs is worse
/// than a retried one.
pub async fn submit_listing(
    http: &reqwest::Client,
    broker: &BrokerClient,
    listings: &ListingClient,
    stager: &FileStager,
    draft: &ListingDraft,
    upload_timeout: Duration,
    progress: Option<&MultiProgress>,
) -> Result<ListingRecord> {
    if stager.is_empty() {
        return Err(SellError::Other(anyhow!(
            "a listing needs at least one image; stage a file first"
        )));
    }

    // Stage 1: one batch sign call. Failure here means zero uploads started.
    let targets = broker.request_targets(stager.files()).await?;
    info!("Received {} upload targets", targets.len());

    // Stage 2: all uploads in parallel, settle-all barrier.
    let outcomes =
        uploader::upload_all(http, stager.files(), targets, upload_timeout, progress).await;

    let failed = outcomes.iter().filter(|o| !o.succeeded()).count();
    if failed > 0 {
        for outcome in outcomes.iter().filter(|o| !o.succeeded()) {
            warn!(
                "Not submitting: upload of {} failed: {}",
                outcome.target.filename,
                outcome.error.as_deref().unwrap_or("unknown error")
            );
        }
        return Err(SellError::UploadsIncomplete {
            failed,
            total: outcomes.len(),
        });
    }

    // Stage 3: substitute public URLs (original order) and submit once.
    let mut final_draft = draft.clone();
    final_draft.image_urls = outcomes
        .into_iter()
        .map(|o| o.target.public_url)
        .collect();

    let record = listings.submit(&final_draft).await?;
    info!("Listing created with id {}", record.id);
    Ok(record)
}
