use async_trait::async_trait;

use super::client::HttpClient;

/// Answers every request with a fixed status and body.
pub(crate) struct StubClient {
    pub status: u16,
    pub body: &'static str,
}

impl StubClient {
    pub fn ok(body: &'static str) -> Self {
        Self { status: 200, body }
    }

    pub fn with_status(status: u16) -> Self {
        Self { status, body: "" }
    }
}

#[async_trait]
impl HttpClient for StubClient {
    async fn execute(&self, _req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        let resp = http::Response::builder()
            .status(self.status)
            .body(self.body)
            .unwrap();
        Ok(reqwest::Response::from(resp))
    }
}
