//! Content delivery API access.

use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder};
use serde_json::Value;

use crate::cli::Cli;
use crate::error::{Result, VerifyError};

/// Linked entries are resolved two levels deep.
const INCLUDE_DEPTH: &str = "2";

#[derive(Debug)]
pub struct DeliveryClient {
    client: Client,
    entries_url: String,
    access_token: String,
    content_type: String,
}

impl DeliveryClient {
    pub fn new(cli: &Cli) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(cli.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            entries_url: format!(
                "{}/spaces/{}/entries",
                cli.base_url.trim_end_matches('/'),
                cli.space_id
            ),
            access_token: cli.access_token.clone(),
            content_type: cli.content_type.clone(),
        })
    }

    /// Every entry of the configured content type.
    pub fn fetch_entries(&self) -> Result<Vec<Value>> {
        self.fetch_items(self.entries_request(None))
    }

    /// First entry whose `slug` field equals `slug`.
    pub fn fetch_by_slug(&self, slug: &str) -> Result<Option<Value>> {
        let mut items = self.fetch_items(self.entries_request(Some(slug)))?;
        Ok(if items.is_empty() {
            None
        } else {
            Some(items.swap_remove(0))
        })
    }

    fn entries_request(&self, slug: Option<&str>) -> RequestBuilder {
        let mut query = vec![
            ("content_type", self.content_type.as_str()),
            ("include", INCLUDE_DEPTH),
        ];
        if let Some(slug) = slug {
            query.push(("fields.slug", slug));
        }
        self.client
            .get(&self.entries_url)
            .bearer_auth(&self.access_token)
            .query(&query)
    }

    fn fetch_items(&self, request: RequestBuilder) -> Result<Vec<Value>> {
        let response = request.send()?;
        let status = response.status();
        let url = response.url().to_string();
        log::debug!("GET {url} -> {status}");
        if !status.is_success() {
            return Err(VerifyError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let body: Value = serde_json::from_str(&response.text()?)?;
        Ok(match body.get("items") {
            Some(Value::Array(items)) => items.clone(),
            _ => Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn client(args: &[&str]) -> DeliveryClient {
        let mut argv = vec!["strata-verify"];
        argv.extend_from_slice(args);
        DeliveryClient::new(&Cli::try_parse_from(argv).unwrap()).unwrap()
    }

    #[test]
    fn entries_request_carries_query_and_token() {
        let client = client(&["--space-id", "sp1", "--access-token", "tok"]);
        let request = client.entries_request(None).build().unwrap();
        assert_eq!(
            request.url().as_str(),
            "https://cdn.contentful.com/spaces/sp1/entries?content_type=landingPage&include=2"
        );
        let auth = request.headers().get(reqwest::header::AUTHORIZATION).unwrap();
        assert_eq!(auth.to_str().unwrap(), "Bearer tok");
    }

    #[test]
    fn slug_request_is_encoded() {
        let client = client(&["--base-url", "http://localhost:8080/", "--space-id", "sp1"]);
        let request = client.entries_request(Some("about us")).build().unwrap();
        let url = request.url().as_str();
        assert!(url.starts_with("http://localhost:8080/spaces/sp1/entries?"));
        assert!(url.ends_with("&fields.slug=about+us"));
    }
}
