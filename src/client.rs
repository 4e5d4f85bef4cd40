use std::time::Duration;

use anyhow::{bail, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::blocking::Client as HttpClient;
use reqwest::header::USER_AGENT;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use url::Url;

use crate::data::{PageRequest, RecordPage};
use crate::feed::FeedItem;
use crate::schema::FieldMetadata;

// Record ids are 15 or 18 character alphanumeric keys.
static RECORD_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new("^[a-zA-Z0-9]{15,18}$").expect("valid record id pattern"));

/// Validates and trims a record id before it goes into a URL path.
pub fn normalize_record_id(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if !RECORD_ID_PATTERN.is_match(trimmed) {
        bail!("record id must be 15-18 alphanumeric characters, got {raw:?}");
    }
    Ok(trimmed.to_string())
}

#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    pub base_url: String,
    pub user_agent: String,
    pub http_client: Option<HttpClient>,
}

pub struct Client {
    http: HttpClient,
    user_agent: String,
    base_url: Url,
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self> {
        if config.user_agent.trim().is_empty() {
            bail!("records client user agent required");
        }
        if config.base_url.trim().is_empty() {
            bail!("records client base url required");
        }

        let mut base = config.base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)?;

        let http = match config.http_client {
            Some(client) => client,
            None => HttpClient::builder()
                .timeout(Duration::from_secs(20))
                .build()?,
        };

        Ok(Client {
            http,
            user_agent: config.user_agent,
            base_url,
        })
    }

    pub fn record_page(&self, object: &str, request: &PageRequest) -> Result<RecordPage> {
        let url = self.endpoint(&format!("objects/{}/records", object))?;
        let mut params = vec![
            ("page".to_string(), request.page_number.to_string()),
            ("page_size".to_string(), request.page_size.to_string()),
            (
                "sort_dir".to_string(),
                request.sort_direction.as_str().to_string(),
            ),
        ];
        if !request.sort_by.is_empty() {
            params.push(("sort_by".to_string(), request.sort_by.clone()));
        }
        if !request.filter_text.trim().is_empty() {
            params.push(("q".to_string(), request.filter_text.trim().to_string()));
        }
        self.get_json(url, &params)
    }

    pub fn describe_fields(&self, object: &str) -> Result<Vec<FieldMetadata>> {
        let url = self.endpoint(&format!("objects/{}/fields", object))?;
        self.get_json(url, &[])
    }

    pub fn feed_items(&self, record_id: &str) -> Result<Vec<FeedItem>> {
        let record_id = normalize_record_id(record_id)?;
        let url = self.endpoint(&format!("records/{}/feed", record_id))?;
        self.get_json(url, &[])
    }

    pub fn post_comment(&self, parent_id: &str, body: &str) -> Result<FeedItem> {
        if body.trim().is_empty() {
            bail!("comment body cannot be empty");
        }
        let url = self.endpoint("feed")?;
        self.post_json(
            url,
            &json!({
                "parentId": parent_id,
                "body": body,
            }),
        )
    }

    pub fn like(&self, feed_item_id: &str) -> Result<()> {
        let url = self.endpoint(&format!("feed/{}/like", feed_item_id))?;
        let response = self
            .http
            .post(url)
            .header(USER_AGENT, &self.user_agent)
            .send()?;
        response.error_for_status()?;
        Ok(())
    }

    pub fn unlike(&self, feed_item_id: &str) -> Result<()> {
        let url = self.endpoint(&format!("feed/{}/like", feed_item_id))?;
        let response = self
            .http
            .delete(url)
            .header(USER_AGENT, &self.user_agent)
            .send()?;
        response.error_for_status()?;
        Ok(())
    }

    /// The server renders the full (unpaged) CSV payload; the caller decides
    /// where to save it.
    pub fn export_csv(&self, object: &str, filter_text: &str) -> Result<String> {
        let url = self.endpoint(&format!("objects/{}/export", object))?;
        let mut params: Vec<(String, String)> = Vec::new();
        if !filter_text.trim().is_empty() {
            params.push(("q".to_string(), filter_text.trim().to_string()));
        }
        let response = self
            .http
            .get(url)
            .query(&params)
            .header(USER_AGENT, &self.user_agent)
            .send()?;
        Ok(response.error_for_status()?.text()?)
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    fn get_json<T: DeserializeOwned>(&self, url: Url, params: &[(String, String)]) -> Result<T> {
        let response = self
            .http
            .get(url)
            .query(params)
            .header(USER_AGENT, &self.user_agent)
            .send()?;
        Ok(response.error_for_status()?.json()?)
    }

    fn post_json<T: DeserializeOwned, B: Serialize>(&self, url: Url, body: &B) -> Result<T> {
        let response = self
            .http
            .post(url)
            .json(body)
            .header(USER_AGENT, &self.user_agent)
            .send()?;
        Ok(response.error_for_status()?.json()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_id_accepts_15_and_18_char_keys() {
        assert_eq!(
            normalize_record_id("001ak00000iIU6Q").unwrap(),
            "001ak00000iIU6Q"
        );
        assert_eq!(
            normalize_record_id("  001ak00000iIU6QAAW ").unwrap(),
            "001ak00000iIU6QAAW"
        );
    }

    #[test]
    fn record_id_rejects_other_shapes() {
        assert!(normalize_record_id("").is_err());
        assert!(normalize_record_id("short").is_err());
        assert!(normalize_record_id("001ak00000iIU6QAAW1").is_err());
        assert!(normalize_record_id("001ak00000iIU6Q-AW").is_err());
    }

    #[test]
    fn client_requires_user_agent_and_base_url() {
        assert!(Client::new(ClientConfig {
            base_url: "https://example.test/api/".into(),
            user_agent: "  ".into(),
            http_client: None,
        })
        .is_err());
        assert!(Client::new(ClientConfig {
            base_url: String::new(),
            user_agent: "recview/0.1".into(),
            http_client: None,
        })
        .is_err());
    }

    #[test]
    fn endpoint_joins_against_trailing_slash() {
        let client = Client::new(ClientConfig {
            base_url: "https://example.test/api".into(),
            user_agent: "recview/0.1".into(),
            http_client: None,
        })
        .unwrap();
        let url = client.endpoint("objects/Account/records").unwrap();
        assert_eq!(
            url.as_str(),
            "https://example.test/api/objects/Account/records"
        );
    }
}
