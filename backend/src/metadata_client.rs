use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::StatusCode;
use song_catalog_shared::SongDetail;
use thiserror::Error;
use url::Url;

const MAX_LOGGED_BODY_CHARS: usize = 512;

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("metadata request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("metadata service returned {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("metadata response is not a song detail: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Client for the external `/info` lookup. One GET per call, no retries.
#[derive(Clone)]
pub struct MetadataClient {
    client: reqwest::Client,
    info_url: Url,
}

impl MetadataClient {
    pub fn new(base_url: &Url, timeout: Option<Duration>) -> Result<Self> {
        let mut info_url = base_url.clone();
        info_url
            .path_segments_mut()
            .map_err(|_| anyhow::anyhow!("metadata base url cannot be a base: {base_url}"))?
            .pop_if_empty()
            .push("info");
        info_url.set_query(None);

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .context("failed to build metadata http client")?;

        Ok(Self { client, info_url })
    }

    pub fn info_url(&self) -> &Url {
        &self.info_url
    }

    pub async fn fetch(&self, group: &str, song: &str) -> Result<SongDetail, MetadataError> {
        tracing::info!(group, song, url = %self.info_url, "requesting song detail");
        let response = self
            .client
            .get(self.info_url.clone())
            .query(&[("group", group), ("song", song)])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            tracing::warn!(
                status = status.as_u16(),
                body = %truncate_for_log(&body),
                "metadata service returned non-success status"
            );
            return Err(MetadataError::Status { status, body });
        }

        serde_json::from_str::<SongDetail>(&body).map_err(|err| {
            tracing::warn!(body = %truncate_for_log(&body), "undecodable metadata response");
            MetadataError::Decode(err)
        })
    }
}

fn truncate_for_log(body: &str) -> &str {
    match body.char_indices().nth(MAX_LOGGED_BODY_CHARS) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::{
        matchers::{method, path, query_param},
        Mock, MockServer, ResponseTemplate,
    };

    use super::*;

    async fn client_for(server: &MockServer) -> MetadataClient {
        let base = Url::parse(&server.uri()).expect("mock server url");
        MetadataClient::new(&base, None).expect("client")
    }

    #[test]
    fn info_path_is_appended_to_base_path() {
        let base = Url::parse("http://music.local/api/").expect("url");
        let client = MetadataClient::new(&base, None).expect("client");
        assert_eq!(client.info_url().as_str(), "http://music.local/api/info");

        let base = Url::parse("http://music.local").expect("url");
        let client = MetadataClient::new(&base, None).expect("client");
        assert_eq!(client.info_url().as_str(), "http://music.local/info");
    }

    #[tokio::test]
    async fn fetch_sends_encoded_query_and_decodes_detail() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/info"))
            .and(query_param("group", "Guns N' Roses"))
            .and(query_param("song", "Sweet Child & Mine"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "releaseDate": "17.08.1987",
                "text": "She's got a smile\n\nthat it seems to me",
                "link": "https://example.com/watch"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let detail = client_for(&server)
            .await
            .fetch("Guns N' Roses", "Sweet Child & Mine")
            .await
            .expect("detail");
        assert_eq!(detail.release_date, "17.08.1987");
        assert_eq!(detail.link, "https://example.com/watch");
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/info"))
            .respond_with(ResponseTemplate::new(503).set_body_string("down"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .await
            .fetch("Muse", "Hysteria")
            .await
            .expect_err("503 must fail");
        match err {
            MetadataError::Status { status, body } => {
                assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
                assert_eq!(body, "down");
            },
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn wrong_shape_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/info"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"date": "x"})))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .await
            .fetch("Muse", "Hysteria")
            .await
            .expect_err("shape mismatch must fail");
        assert!(matches!(err, MetadataError::Decode(_)));
    }

    #[tokio::test]
    async fn unreachable_service_is_a_request_error() {
        let base = Url::parse("http://127.0.0.1:9").expect("url");
        let client = MetadataClient::new(&base, Some(Duration::from_secs(2))).expect("client");
        let err = client.fetch("Muse", "Hysteria").await.expect_err("no listener");
        assert!(matches!(err, MetadataError::Request(_)));
    }

    #[test]
    fn long_bodies_are_truncated_for_logs() {
        let body = "é".repeat(MAX_LOGGED_BODY_CHARS + 10);
        assert_eq!(truncate_for_log(&body).chars().count(), MAX_LOGGED_BODY_CHARS);
        assert_eq!(truncate_for_log("short"), "short");
    }
}
