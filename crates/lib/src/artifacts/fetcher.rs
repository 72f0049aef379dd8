//! HTTP download of a generated image into a `TempArtifact`.

use crate::artifacts::temp::TempArtifact;
use futures_util::StreamExt;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("image download failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("image download returned {0}")]
    Status(u16),
    #[error("writing image failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Downloads artifacts into `dir`.
#[derive(Clone)]
pub struct ArtifactFetcher {
    client: reqwest::Client,
    dir: PathBuf,
}

impl ArtifactFetcher {
    pub fn new(dir: PathBuf, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, dir })
    }

    pub fn dir(&self) -> &std::path::Path {
        &self.dir
    }

    /// GET `url` and stream the body into a new uniquely named file.
    /// On any failure the partial file is removed with the guard.
    pub async fn fetch_to_temp_file(&self, url: &str) -> Result<TempArtifact, FetchError> {
        let res = self.client.get(url).send().await?;
        let status = res.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        tokio::fs::create_dir_all(&self.dir).await?;
        let artifact = TempArtifact::reserve(&self.dir);
        let mut file = tokio::fs::File::create(artifact.path()).await?;
        let mut stream = res.bytes_stream();
        let mut written: usize = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len();
        }
        file.flush().await?;
        log::debug!("downloaded {} bytes to {}", written, artifact.path().display());
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("beambot-fetch-test-{}", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn downloads_body_to_unique_file() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/img.png")
            .with_status(200)
            .with_header("content-type", "image/png")
            .with_body(b"\x89PNG\r\n\x1a\nfake".to_vec())
            .create_async()
            .await;

        let fetcher = ArtifactFetcher::new(scratch_dir(), Duration::from_secs(5)).unwrap();
        let url = format!("{}/img.png", server.url());
        let artifact = fetcher.fetch_to_temp_file(&url).await.unwrap();
        assert!(artifact.path().starts_with(fetcher.dir()));
        let bytes = std::fs::read(artifact.path()).unwrap();
        assert_eq!(bytes, b"\x89PNG\r\n\x1a\nfake");
        mock.assert_async().await;

        let path = artifact.path().to_path_buf();
        artifact.remove().await.unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn non_success_status_writes_nothing() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/img.png")
            .with_status(403)
            .create_async()
            .await;

        let dir = scratch_dir();
        let fetcher = ArtifactFetcher::new(dir.clone(), Duration::from_secs(5)).unwrap();
        let url = format!("{}/img.png", server.url());
        let err = fetcher.fetch_to_temp_file(&url).await.unwrap_err();
        assert!(matches!(err, FetchError::Status(403)));
        let leftovers = std::fs::read_dir(&dir).map(|d| d.count()).unwrap_or(0);
        assert_eq!(leftovers, 0);
    }

    /// Serve one response that promises more bytes than it sends, then hang up.
    async fn truncating_server() -> String {
        use tokio::io::AsyncReadExt;
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut req = [0u8; 1024];
            let _ = sock.read(&mut req).await;
            let head = "HTTP/1.1 200 OK\r\ncontent-type: image/png\r\ncontent-length: 100000\r\n\r\n";
            sock.write_all(head.as_bytes()).await.unwrap();
            sock.write_all(&[7u8; 4096]).await.unwrap();
            sock.flush().await.unwrap();
        });
        format!("http://{}/img.png", addr)
    }

    #[tokio::test]
    async fn interrupted_body_removes_partial_file() {
        let url = truncating_server().await;
        let dir = scratch_dir();
        let fetcher = ArtifactFetcher::new(dir.clone(), Duration::from_secs(5)).unwrap();

        let err = fetcher.fetch_to_temp_file(&url).await.unwrap_err();
        assert!(matches!(err, FetchError::Request(_)), "got {err}");
        // The directory was created before the body arrived, so a file could have been left.
        assert!(dir.exists());
        assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 0);
    }
}
