//! HTTP stream notifier.
//!
//! [`HttpNotifier`] POSTs `{"user": "<key>"}` to the configured recording
//! endpoint once per accepted stream. The response body is only logged.
//! No retries are attempted; the dispatcher records failures.

use std::time::Duration;

use serde::Serialize;

use streamtap_core::config::NotifyConfig;
use streamtap_core::error::NotifyError;
use streamtap_core::event::StreamEvent;
use streamtap_core::pipeline::{BoxFuture, Notifier};

/// Request body sent to the recording endpoint.
#[derive(Debug, Serialize)]
struct RecordRequest<'a> {
    user: &'a str,
}

/// Notifier backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpNotifier {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpNotifier {
    /// Build a notifier from `[notify]`.
    pub fn new(config: &NotifyConfig) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("streamtap/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| NotifyError::Config(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }

    /// Endpoint requests are sent to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn send(&self, event: &StreamEvent) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&RecordRequest { user: &event.key })
            .send()
            .await
            .map_err(|e| NotifyError::Request(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| NotifyError::Request(e.to_string()))?;

        if !status.is_success() {
            return Err(NotifyError::Status {
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!(
            key = %event.key,
            status = status.as_u16(),
            response = %body.trim(),
            "notification sent"
        );
        Ok(())
    }
}

impl Notifier for HttpNotifier {
    fn name(&self) -> &str {
        "http"
    }

    fn notify<'a>(&'a self, event: &'a StreamEvent) -> BoxFuture<'a, Result<(), NotifyError>> {
        Box::pin(self.send(event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve a single HTTP request and return its raw body.
    async fn serve_once(status_line: &'static str, body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];

            let (header_end, content_length) = loop {
                let n = stream.read(&mut chunk).await.unwrap();
                assert!(n > 0, "connection closed before headers");
                buf.extend_from_slice(&chunk[..n]);
                if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                    let headers = String::from_utf8_lossy(&buf[..pos]).to_ascii_lowercase();
                    let length = headers
                        .lines()
                        .find_map(|l| l.strip_prefix("content-length:"))
                        .map(|v| v.trim().parse::<usize>().unwrap())
                        .unwrap_or(0);
                    break (pos + 4, length);
                }
            };

            while buf.len() < header_end + content_length {
                let n = stream.read(&mut chunk).await.unwrap();
                assert!(n > 0, "connection closed before body");
                buf.extend_from_slice(&chunk[..n]);
            }

            let response = format!(
                "{status_line}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();

            String::from_utf8(buf[header_end..header_end + content_length].to_vec()).unwrap()
        });

        (format!("http://{addr}/record"), handle)
    }

    fn notifier(endpoint: String) -> HttpNotifier {
        HttpNotifier::new(&NotifyConfig {
            enabled: true,
            endpoint,
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn posts_user_key_as_json() {
        let (endpoint, server) = serve_once("HTTP/1.1 200 OK", "queued").await;
        let notifier = notifier(endpoint);

        let event = StreamEvent::new("channel123", "/logs/output_log.txt");
        notifier.notify(&event).await.unwrap();

        let body = server.await.unwrap();
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json, serde_json::json!({ "user": "channel123" }));
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let (endpoint, server) = serve_once("HTTP/1.1 503 Service Unavailable", "busy").await;
        let notifier = notifier(endpoint);

        let event = StreamEvent::new("abc", "/logs/output_log.txt");
        let err = notifier.notify(&event).await.unwrap_err();
        server.await.unwrap();

        match err {
            NotifyError::Status { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body, "busy");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_request_error() {
        // Bind then drop so the port refuses connections.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let notifier = notifier(format!("http://{addr}/record"));
        let event = StreamEvent::new("abc", "/logs/output_log.txt");
        let err = notifier.notify(&event).await.unwrap_err();
        assert!(matches!(err, NotifyError::Request(_)));
    }

    #[test]
    fn reports_name_and_endpoint() {
        let notifier = notifier("https://example.invalid/record".to_owned());
        assert_eq!(notifier.name(), "http");
        assert_eq!(notifier.endpoint(), "https://example.invalid/record");
    }
}
