use crate::error::TransferError;
use futures_util::StreamExt;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Byte progress of a running transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub downloaded: u64,
    /// Announced body size, when the server sends `Content-Length`
    pub total: Option<u64>,
}

/// Stream `url` into `dest`.
///
/// The body is written to a `.part` sibling and renamed into place only
/// once the whole body has arrived, so `dest` is either complete or
/// absent. Returns the number of bytes written.
pub async fn download<F>(
    http: &reqwest::Client,
    url: &str,
    dest: &Path,
    mut on_progress: F,
) -> Result<u64, TransferError>
where
    F: FnMut(Progress),
{
    let part = partial_path(dest);

    let result = match stream_to(http, url, &part, &mut on_progress).await {
        Ok(bytes) => tokio::fs::rename(&part, dest)
            .await
            .map(|()| bytes)
            .map_err(|e| TransferError::Io {
                path: dest.to_path_buf(),
                detail: e.to_string(),
            }),
        Err(e) => Err(e),
    };

    if result.is_err() {
        // Nothing to clean up when the request failed before the file was created
        let _ = tokio::fs::remove_file(&part).await;
    }

    result
}

async fn stream_to<F>(
    http: &reqwest::Client,
    url: &str,
    part: &Path,
    on_progress: &mut F,
) -> Result<u64, TransferError>
where
    F: FnMut(Progress),
{
    tracing::debug!("GET {url}");

    let response = http
        .get(url)
        .send()
        .await
        .map_err(|e| TransferError::from_reqwest(url, &e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(TransferError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let io_error = |e: std::io::Error| TransferError::Io {
        path: part.to_path_buf(),
        detail: e.to_string(),
    };

    let total = response.content_length();
    let mut file = tokio::fs::File::create(part).await.map_err(io_error)?;
    let mut stream = response.bytes_stream();
    let mut downloaded = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| TransferError::from_reqwest(url, &e))?;
        file.write_all(&chunk).await.map_err(io_error)?;
        downloaded += chunk.len() as u64;
        on_progress(Progress { downloaded, total });
    }

    file.flush().await.map_err(io_error)?;
    file.sync_all().await.map_err(io_error)?;

    Ok(downloaded)
}

/// Temporary path a transfer writes to before the final rename
#[must_use]
pub fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}

/// Format bytes as human-readable string
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1024), "1.00 KB");
        assert_eq!(format_bytes(1_572_864), "1.50 MB");
        assert_eq!(format_bytes(1_073_741_824), "1.00 GB");
    }

    #[test]
    fn test_partial_path() {
        assert_eq!(
            partial_path(Path::new("/data/papers/2101.00001v1.pdf")),
            PathBuf::from("/data/papers/2101.00001v1.pdf.part")
        );
    }

    #[tokio::test]
    async fn test_download_reports_progress() {
        let server = MockServer::start().await;
        let body = vec![7u8; 4096];
        Mock::given(method("GET"))
            .and(path("/file.bin"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
            .mount(&server)
            .await;

        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("file.bin");
        let mut last = None;

        let bytes = download(
            &reqwest::Client::new(),
            &format!("{}/file.bin", server.uri()),
            &dest,
            |p| last = Some(p),
        )
        .await
        .unwrap();

        assert_eq!(bytes, 4096);
        assert_eq!(std::fs::read(&dest).unwrap(), body);
        assert!(!partial_path(&dest).exists());

        let last = last.expect("progress callback never ran");
        assert_eq!(last.downloaded, 4096);
        assert_eq!(last.total, Some(4096));
    }

    #[tokio::test]
    async fn test_failed_download_leaves_no_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("file.bin");

        let result = download(
            &reqwest::Client::new(),
            &format!("{}/file.bin", server.uri()),
            &dest,
            |_| {},
        )
        .await;

        assert!(matches!(
            result,
            Err(TransferError::HttpStatus { status: 500, .. })
        ));
        assert!(!dest.exists());
        assert!(!partial_path(&dest).exists());
    }
}
