use super::ensure_success;
use crate::error::Error;
use anyhow::Result;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, Response};
use url::Url;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

const DEFAULT_IMAGE_TYPE: &str = "image/jpeg";

/// Fetches snapshots and clips from detection services on behalf of the browser
#[derive(Clone)]
pub struct MediaProxy {
    client: Client,
    /// Without a total timeout; clips outlive any request deadline
    stream_client: Client,
}

impl MediaProxy {
    pub fn new(client: Client, stream_client: Client) -> Self {
        Self {
            client,
            stream_client,
        }
    }

    /// Download an image and inline it as a `data:` URL
    pub async fn proxy_image(&self, raw_url: &str) -> Result<String> {
        let url = parse_media_url(raw_url)?;

        let response = self
            .client
            .get(url)
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .send()
            .await
            .map_err(Error::from)?;
        let response = ensure_success(response, "Failed to fetch image").await?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .unwrap_or(DEFAULT_IMAGE_TYPE)
            .to_string();

        let bytes = response.bytes().await.map_err(Error::from)?;

        Ok(format!("data:{};base64,{}", content_type, STANDARD.encode(&bytes)))
    }

    /// Open an upstream video; the caller streams the body
    pub async fn proxy_video(&self, raw_url: &str) -> Result<Response> {
        let url = parse_media_url(raw_url)?;

        let response = self.stream_client.get(url).send().await.map_err(Error::from)?;
        ensure_success(response, "Failed to fetch video").await
    }
}

/// Only absolute http(s) URLs are proxied
pub fn parse_media_url(raw: &str) -> Result<Url> {
    if raw.trim().is_empty() {
        return Err(Error::Validation("Missing URL".to_string()).into());
    }

    let url = Url::parse(raw.trim())
        .map_err(|e| Error::Validation(format!("Invalid URL: {}", e)))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(Error::Validation(format!("Unsupported URL scheme: {}", scheme)).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{build_http_client, build_streaming_client};
    use futures::StreamExt;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_parse_media_url() {
        assert!(parse_media_url("https://cams.local/snap.jpg").is_ok());
        assert!(parse_media_url("").is_err());
        assert!(parse_media_url("not a url").is_err());
        assert!(parse_media_url("file:///etc/passwd").is_err());
    }

    #[tokio::test]
    async fn test_proxy_image_inlines_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/snap.png"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(vec![1u8, 2, 3], "image/png"),
            )
            .mount(&server)
            .await;

        let proxy = MediaProxy::new(Client::new(), Client::new());
        let data_url = proxy
            .proxy_image(&format!("{}/snap.png", server.uri()))
            .await
            .unwrap();

        assert_eq!(data_url, "data:image/png;base64,AQID");

        let requests = server.received_requests().await.unwrap();
        let agent = requests[0].headers.get("user-agent").unwrap();
        assert_eq!(agent.to_str().unwrap(), BROWSER_USER_AGENT);
    }

    #[tokio::test]
    async fn test_proxy_image_defaults_to_jpeg() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let proxy = MediaProxy::new(Client::new(), Client::new());
        let data_url = proxy.proxy_image(&server.uri()).await.unwrap();

        assert!(data_url.starts_with("data:image/jpeg;base64,"));
    }

    #[tokio::test]
    async fn test_proxy_video_fails_on_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let proxy = MediaProxy::new(Client::new(), Client::new());
        assert!(proxy.proxy_video(&format!("{}/clip.mp4", server.uri())).await.is_err());
    }

    /// Upstream that sends the headers, then the body in delayed chunks
    async fn spawn_slow_upstream(chunks: usize, chunk_len: usize, delay: Duration) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await.unwrap();

            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: video/mp4\r\nContent-Length: {}\r\n\r\n",
                chunks * chunk_len
            );
            socket.write_all(head.as_bytes()).await.unwrap();
            for _ in 0..chunks {
                tokio::time::sleep(delay).await;
                socket.write_all(&vec![7u8; chunk_len]).await.unwrap();
                socket.flush().await.unwrap();
            }
        });

        format!("http://{}/clip.mp4", addr)
    }

    #[tokio::test]
    async fn test_proxy_video_outlives_request_timeout() {
        let url = spawn_slow_upstream(3, 1000, Duration::from_millis(700)).await;
        let proxy = MediaProxy::new(
            build_http_client(1).unwrap(),
            build_streaming_client(1).unwrap(),
        );

        let response = proxy.proxy_video(&url).await.unwrap();
        let mut stream = response.bytes_stream();
        let mut received = 0;
        while let Some(chunk) = stream.next().await {
            received += chunk.unwrap().len();
        }

        assert_eq!(received, 3000);
    }
}
