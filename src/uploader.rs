use std::time::Duration;

use anyhow::{Context, Result as AnyResult};
use futures::future::join_all;
use indicatif::{MultiProgress, ProgressBar};
use tracing::{error, info};

use crate::broker::UploadTarget;
use crate::stager::StagedFile;

/// Default per-upload timeout. A hung upload fails that file instead of
/// stalling the whole submit.
pub const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// Outcome of one direct upload attempt.
#[derive(Debug)]
pub struct UploadOutcome {
    pub target: UploadTarget,
    pub error: Option<String>,
}

impl UploadOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Upload every staged file to its positional target, all at once.
///
/// All uploads are launched together and this call returns only after every
/// one settles. A failing upload is recorded in its outcome and logged; it
/// never aborts its siblings and is never propagated as `Err`. Outcomes come
/// back in input order, exactly one per file.
///
/// Callers must pass `targets` positionally matched to `files` (the broker
/// client enforces the count).
pub async fn upload_all(
    client: &reqwest::Client,
    files: &[StagedFile],
    targets: Vec<UploadTarget>,
    timeout: Duration,
    progress: Option<&MultiProgress>,
) -> Vec<UploadOutcome> {
    debug_assert_eq!(files.len(), targets.len());

    let uploads = files.iter().zip(targets).map(|(file, target)| {
        let pb = progress.map(|multi| {
            let pb = multi.add(ProgressBar::new_spinner());
            pb.set_message(format!("Uploading {}", file.display_name));
            pb
        });

        async move {
            let result = tokio::time::timeout(timeout, put_file(client, file, &target)).await;
            let error = match result {
                Ok(Ok(())) => {
                    info!("Uploaded {} ({} bytes)", file.display_name, file.size_bytes);
                    None
                }
                Ok(Err(e)) => {
                    error!("Upload failed for {}: {:#}", file.display_name, e);
                    Some(format!("{:#}", e))
                }
                Err(_) => {
                    error!(
                        "Upload timed out for {} after {}s",
                        file.display_name,
                        timeout.as_secs()
                    );
                    Some(format!("timed out after {}s", timeout.as_secs()))
                }
            };

            if let Some(pb) = pb {
                match &error {
                    None => pb.finish_with_message(format!("Uploaded {}", file.display_name)),
                    Some(e) => pb.finish_with_message(format!("Failed {}: {}", file.display_name, e)),
                }
            }

            UploadOutcome { target, error }
        }
    });

    join_all(uploads).await
}

/// PUT the raw file bytes to the pre-signed URL with the declared MIME type.
async fn put_file(
    client: &reqwest::Client,
    file: &StagedFile,
    target: &UploadTarget,
) -> AnyResult<()> {
    let bytes = tokio::fs::read(&file.path)
        .await
        .with_context(|| format!("Failed to read {}", file.path.display()))?;

    let response = client
        .put(&target.upload_url)
        .header("Content-Type", &target.mime_type)
        .body(bytes)
        .send()
        .await
        .context("Failed to send upload request")?;

    if !response.status().is_success() {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        anyhow::bail!("Storage returned status {}: {}", status, text);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testserver::{CannedResponse, RecordedRequest, TestServer};
    use std::io::Write;
    use std::path::PathBuf;
    use std::sync::Arc;

    fn write_file(dir: &tempfile::TempDir, name: &str, contents: &[u8]) -> StagedFile {
        let path = dir.path().join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(contents).unwrap();
        StagedFile {
            path,
            display_name: name.to_string(),
            mime_type: crate::stager::detect_content_type(&PathBuf::from(name)),
            size_bytes: contents.len() as u64,
        }
    }

    fn target_for(server: &TestServer, file: &StagedFile, slot: usize) -> UploadTarget {
        UploadTarget {
            filename: file.display_name.clone(),
            mime_type: file.mime_type.clone(),
            upload_url: server.url(&format!("/up/{}", slot)),
            public_url: format!("https://cdn.example/img-{}", slot),
        }
    }

    #[tokio::test]
    async fn test_one_failure_does_not_abort_siblings() {
        let server = TestServer::start(|_| {
            Arc::new(|req: &RecordedRequest| {
                if req.path == "/up/1" {
                    CannedResponse::json(500, r#"{"error":"disk full"}"#)
                } else {
                    CannedResponse::json(200, "")
                }
            })
        })
        .await;

        let dir = tempfile::tempdir().unwrap();
        let files = vec![
            write_file(&dir, "a.jpg", b"aaa"),
            write_file(&dir, "b.png", b"bbb"),
            write_file(&dir, "c.webp", b"ccc"),
        ];
        let targets = files
            .iter()
            .enumerate()
            .map(|(i, f)| target_for(&server, f, i))
            .collect();

        let client = reqwest::Client::new();
        let outcomes = upload_all(
            &client,
            &files,
            targets,
            DEFAULT_UPLOAD_TIMEOUT,
            None,
        )
        .await;

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].succeeded());
        assert!(!outcomes[1].succeeded());
        assert!(outcomes[2].succeeded());
        // Input order is preserved in the outcomes
        assert_eq!(outcomes[0].target.filename, "a.jpg");
        assert_eq!(outcomes[1].target.filename, "b.png");
        assert_eq!(outcomes[2].target.filename, "c.webp");
    }

    #[tokio::test]
    async fn test_put_carries_raw_bytes_and_content_type() {
        let server = TestServer::start(|_| {
            Arc::new(|_| CannedResponse::json(200, ""))
        })
        .await;

        let dir = tempfile::tempdir().unwrap();
        let files = vec![write_file(&dir, "photo.jpg", b"raw-jpeg-bytes")];
        let targets = vec![target_for(&server, &files[0], 0)];

        let client = reqwest::Client::new();
        let outcomes = upload_all(
            &client,
            &files,
            targets,
            DEFAULT_UPLOAD_TIMEOUT,
            None,
        )
        .await;
        assert!(outcomes[0].succeeded());

        let requests = server.requests().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "PUT");
        assert_eq!(requests[0].path, "/up/0");
        assert_eq!(requests[0].header("content-type"), Some("image/jpeg"));
        assert_eq!(requests[0].body, b"raw-jpeg-bytes");
    }

    #[tokio::test]
    async fn test_hung_upload_fails_by_timeout() {
        let server = TestServer::start(|_| {
            Arc::new(|_| {
                CannedResponse::json(200, "").with_delay(Duration::from_secs(5))
            })
        })
        .await;

        let dir = tempfile::tempdir().unwrap();
        let files = vec![write_file(&dir, "slow.png", b"zzz")];
        let targets = vec![target_for(&server, &files[0], 0)];

        let client = reqwest::Client::new();
        let outcomes = upload_all(
            &client,
            &files,
            targets,
            Duration::from_millis(200),
            None,
        )
        .await;

        assert_eq!(outcomes.len(), 1);
        assert!(!outcomes[0].succeeded());
        assert!(outcomes[0].error.as_deref().unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_unreadable_file_recorded_not_thrown() {
        let server = TestServer::start(|_| {
            Arc::new(|_| CannedResponse::json(200, ""))
        })
        .await;

        let missing = StagedFile {
            path: PathBuf::from("/nonexistent/gone.jpg"),
            display_name: "gone.jpg".to_string(),
            mime_type: "image/jpeg".to_string(),
            size_bytes: 10,
        };
        let targets = vec![target_for(&server, &missing, 0)];

        let client = reqwest::Client::new();
        let outcomes = upload_all(
            &client,
            std::slice::from_ref(&missing),
            targets,
            DEFAULT_UPLOAD_TIMEOUT,
            None,
        )
        .await;

        assert_eq!(outcomes.len(), 1);
        assert!(!outcomes[0].succeeded());
        // No request ever reached storage
        assert!(server.requests().await.is_empty());
    }
}
