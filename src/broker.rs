use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SellError};
use crate::session::Session;
use crate::stager::StagedFile;

/// One pre-signed upload slot issued by the backend broker.
///
/// Consumed once by the uploader; `public_url` is what the listing record
/// ultimately references.
#[derive(Debug, Clone)]
pub struct UploadTarget {
    pub filename: String,
    pub mime_type: String,
    pub upload_url: String,
    pub public_url: String,
}

#[derive(Serialize)]
struct SignRequest<'a> {
    filenames: Vec<FileSpec<'a>>,
}

#[derive(Serialize)]
struct FileSpec<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    content_type: &'a str,
}

#[derive(Deserialize)]
struct SignResponse {
    #[serde(rename = "signedUrls")]
    signed_urls: Vec<SignedUrlPair>,
}

#[derive(Deserialize)]
struct SignedUrlPair {
    #[serde(rename = "uploadUrl")]
    upload_url: String,
    #[serde(rename = "publicUrl")]
    public_url: String,
}

/// Client for the upload-URL broker endpoint.
#[derive(Clone)]
pub struct BrokerClient {
    client: reqwest::Client,
    endpoint: String,
    session: Session,
}

impl BrokerClient {
    pub fn new(client: reqwest::Client, endpoint: String, session: Session) -> Self {
        Self {
            client,
            endpoint,
            session,
        }
    }

    /// Request one upload/public URL pair per staged file, in one batch call.
    ///
    /// The protocol carries no per-file identifier: the Nth returned pair
    /// belongs to the Nth requested file. The whole call fails if the broker
    /// call fails or the counts disagree; no partial batch is ever used.
    pub async fn request_targets(&self, files: &[StagedFile]) -> Result<Vec<UploadTarget>> {
        let request = SignRequest {
            filenames: files
                .iter()
                .map(|f| FileSpec {
                    name: &f.display_name,
                    content_type: &f.mime_type,
                })
                .collect(),
        };

        debug!("Requesting {} upload targets from {}", files.len(), self.endpoint);

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", self.session.bearer())
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(SellError::Broker { status, message });
        }

        let signed: SignResponse = response.json().await?;
        pair_targets(files, signed.signed_urls)
    }
}

/// Zip files with broker-issued pairs positionally, enforcing the
/// one-target-per-file invariant.
fn pair_targets(files: &[StagedFile], pairs: Vec<SignedUrlPair>) -> Result<Vec<UploadTarget>> {
    if pairs.len() != files.len() {
        return Err(SellError::TargetCountMismatch {
            requested: files.len(),
            returned: pairs.len(),
        });
    }

    Ok(files
        .iter()
        .zip(pairs)
        .map(|(file, pair)| UploadTarget {
            filename: file.display_name.clone(),
            mime_type: file.mime_type.clone(),
            upload_url: pair.upload_url,
            public_url: pair.public_url,
        })
        .collect())
}
