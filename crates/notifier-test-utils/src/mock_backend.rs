//! Mock signaling backend.
//!
//! Accepts `POST /api/v1/room/{token}` and records every request. Captured
//! requests are checked against the shared test secret the same way a real
//! signaling server checks them.

use crate::fixtures::test_secret;
use signaling_notifier::signer::{RequestSigner, CHECKSUM_HEADER, RANDOM_HEADER};
use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// One callback received by the mock backend.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub path: String,
    pub content_type: Option<String>,
    pub random: String,
    pub checksum: String,
    pub body: Vec<u8>,
}

impl CapturedRequest {
    /// Room token from the request path.
    pub fn room_token(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or_default()
    }

    /// Whether the checksum matches `HMAC(secret, random || body)`.
    pub fn checksum_valid(&self) -> bool {
        RequestSigner::new(&test_secret()).verify(&self.random, &self.body, &self.checksum)
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("callback body should be JSON")
    }
}

/// wiremock server standing in for a signaling backend.
pub struct MockSignalingBackend {
    server: MockServer,
    status: u16,
}

impl MockSignalingBackend {
    /// Start a backend that answers every callback with 200.
    pub async fn start() -> Self {
        Self::start_with_status(200).await
    }

    /// Start a backend that answers every callback with `status`.
    pub async fn start_with_status(status: u16) -> Self {
        let backend = Self {
            server: MockServer::start().await,
            status,
        };
        backend.mount_callback().await;
        backend
    }

    async fn mount_callback(&self) {
        Mock::given(method("POST"))
            .and(path_regex(r"^/api/v1/room/[^/]+$"))
            .respond_with(ResponseTemplate::new(self.status))
            .mount(&self.server)
            .await;
    }

    /// URL to put in the `servers` configuration.
    pub fn base_url(&self) -> String {
        self.server.uri()
    }

    /// Every callback received so far, in arrival order.
    pub async fn requests(&self) -> Vec<CapturedRequest> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .map(|request| {
                let header = |name: &str| {
                    request
                        .headers
                        .get(name)
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string)
                };
                CapturedRequest {
                    path: request.url.path().to_string(),
                    content_type: header("Content-Type"),
                    random: header(RANDOM_HEADER).unwrap_or_default(),
                    checksum: header(CHECKSUM_HEADER).unwrap_or_default(),
                    body: request.body.clone(),
                }
            })
            .collect()
    }

    /// Parsed bodies of the callbacks for `room_token`, after asserting each
    /// request is well-formed and correctly signed.
    pub async fn bodies_for(&self, room_token: &str) -> Vec<serde_json::Value> {
        self.requests()
            .await
            .into_iter()
            .filter(|r| r.room_token() == room_token)
            .map(|r| {
                assert_eq!(r.content_type.as_deref(), Some("application/json"));
                assert!(r.random.len() >= 32, "random too short: {}", r.random);
                assert!(r.checksum_valid(), "checksum mismatch on {}", r.path);
                r.json()
            })
            .collect()
    }

    /// Forget all captured requests.
    pub async fn clear(&self) {
        self.server.reset().await;
        self.mount_callback().await;
    }
}
