use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::client;
use crate::export;
use crate::feed::{FeedItem, FeedLike};
use crate::schema::{self, DataType, FieldMetadata};

/// One record as returned by the data service: an opaque field-name to value
/// mapping. Shape is owned by the server; this layer only checks presence.
pub type Row = serde_json::Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PageRequest {
    pub page_number: u64,
    pub page_size: u64,
    pub sort_by: String,
    pub sort_direction: SortDirection,
    pub filter_text: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RecordPage {
    #[serde(default)]
    pub rows: Vec<Row>,
    #[serde(default)]
    pub page_number: u64,
    #[serde(default)]
    pub page_size: u64,
    #[serde(default)]
    pub total_records: u64,
}

impl RecordPage {
    pub fn total_pages(&self) -> u64 {
        if self.page_size == 0 {
            return 0;
        }
        self.total_records.div_ceil(self.page_size)
    }
}

pub trait RecordService: Send + Sync {
    fn fetch_page(&self, object: &str, request: &PageRequest) -> Result<RecordPage>;
}

pub trait SchemaService: Send + Sync {
    fn describe_fields(&self, object: &str) -> Result<Vec<FieldMetadata>>;
}

pub trait FeedService: Send + Sync {
    fn load_feed(&self, record_id: &str) -> Result<Vec<FeedItem>>;
    fn post_comment(&self, parent_id: &str, body: &str) -> Result<FeedItem>;
    fn like(&self, feed_item_id: &str) -> Result<()>;
    fn unlike(&self, feed_item_id: &str) -> Result<()>;
}

pub trait ExportService: Send + Sync {
    fn export_csv(&self, object: &str, filter_text: &str) -> Result<String>;
}

/// Free-text filter over the current page, applied after the fetch. A row
/// matches when any non-id field's display value contains the term,
/// case-insensitively.
pub fn filter_rows(rows: &[Row], term: &str) -> Vec<Row> {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return rows.to_vec();
    }
    rows.iter()
        .filter(|row| {
            row.iter().any(|(key, value)| {
                if key.eq_ignore_ascii_case("id") {
                    return false;
                }
                match value {
                    Value::Null => false,
                    Value::String(text) => text.to_lowercase().contains(&needle),
                    other => other.to_string().to_lowercase().contains(&needle),
                }
            })
        })
        .cloned()
        .collect()
}

pub struct HttpRecordService {
    client: Arc<client::Client>,
}

impl HttpRecordService {
    pub fn new(client: Arc<client::Client>) -> Self {
        Self { client }
    }
}

impl RecordService for HttpRecordService {
    fn fetch_page(&self, object: &str, request: &PageRequest) -> Result<RecordPage> {
        self.client
            .record_page(object, request)
            .context("fetch record page")
    }
}

pub struct HttpSchemaService {
    client: Arc<client::Client>,
}

impl HttpSchemaService {
    pub fn new(client: Arc<client::Client>) -> Self {
        Self { client }
    }
}

impl SchemaService for HttpSchemaService {
    fn describe_fields(&self, object: &str) -> Result<Vec<FieldMetadata>> {
        self.client
            .describe_fields(object)
            .context("describe object fields")
    }
}

pub struct HttpFeedService {
    client: Arc<client::Client>,
}

impl HttpFeedService {
    pub fn new(client: Arc<client::Client>) -> Self {
        Self { client }
    }
}

impl FeedService for HttpFeedService {
    fn load_feed(&self, record_id: &str) -> Result<Vec<FeedItem>> {
        self.client.feed_items(record_id).context("fetch feed")
    }

    fn post_comment(&self, parent_id: &str, body: &str) -> Result<FeedItem> {
        self.client
            .post_comment(parent_id, body)
            .context("post comment")
    }

    fn like(&self, feed_item_id: &str) -> Result<()> {
        self.client.like(feed_item_id)
    }

    fn unlike(&self, feed_item_id: &str) -> Result<()> {
        self.client.unlike(feed_item_id)
    }
}

pub struct HttpExportService {
    client: Arc<client::Client>,
}

impl HttpExportService {
    pub fn new(client: Arc<client::Client>) -> Self {
        Self { client }
    }
}

impl ExportService for HttpExportService {
    fn export_csv(&self, object: &str, filter_text: &str) -> Result<String> {
        self.client
            .export_csv(object, filter_text)
            .context("export records")
    }
}

/// Offline record source used when no API is configured and in tests.
#[derive(Default)]
pub struct MockRecordService;

fn mock_rows() -> Vec<Row> {
    let accounts = [
        ("001000000000001AAA", "Acme Manufacturing", "Manufacturing", "(555) 010-1200", 1_250_000.0, true),
        ("001000000000002AAA", "Globex Energy", "Energy", "(555) 010-1300", 4_800_000.5, true),
        ("001000000000003AAA", "Initech Software", "Technology", "(555) 010-1400", 950_000.0, false),
        ("001000000000004AAA", "Umbrella Health", "Healthcare", "(555) 010-1500", 2_125_000.75, true),
        ("001000000000005AAA", "Stark Industries", "Manufacturing", "(555) 010-1600", 9_900_000.0, true),
        ("001000000000006AAA", "Wayne Enterprises", "Finance", "(555) 010-1700", 7_300_000.0, false),
        ("001000000000007AAA", "Wonka Confections", "Consumer Goods", "(555) 010-1800", 640_000.25, true),
        ("001000000000008AAA", "Tyrell Analytics", "Technology", "(555) 010-1900", 3_450_000.0, true),
        ("001000000000009AAA", "Cyberdyne Robotics", "Technology", "(555) 010-2000", 5_275_000.0, false),
        ("001000000000010AAA", "Oceanic Freight", "Logistics", "(555) 010-2100", 1_980_000.0, true),
        ("001000000000011AAA", "Gringotts Holdings", "Finance", "(555) 010-2200", 8_860_000.0, true),
        ("001000000000012AAA", "Nakatomi Trading", "Finance", "(555) 010-2300", 2_700_000.0, false),
    ];
    accounts
        .iter()
        .map(|(id, name, industry, phone, revenue, active)| {
            let value = json!({
                "Id": id,
                "Name": name,
                "Industry": industry,
                "Phone": phone,
                "AnnualRevenue": revenue,
                "Active__c": active,
            });
            match value {
                Value::Object(map) => map,
                _ => unreachable!(),
            }
        })
        .collect()
}

impl RecordService for MockRecordService {
    fn fetch_page(&self, _object: &str, request: &PageRequest) -> Result<RecordPage> {
        let mut rows = mock_rows();
        if !request.filter_text.trim().is_empty() {
            rows = filter_rows(&rows, &request.filter_text);
        }
        if !request.sort_by.is_empty() {
            rows.sort_by(|a, b| {
                let left = export::cell_text(a.get(&request.sort_by));
                let right = export::cell_text(b.get(&request.sort_by));
                match request.sort_direction {
                    SortDirection::Asc => left.cmp(&right),
                    SortDirection::Desc => right.cmp(&left),
                }
            });
        }

        let total_records = rows.len() as u64;
        let page_size = request.page_size.max(1);
        let page_number = request.page_number.max(1);
        let start = ((page_number - 1) * page_size) as usize;
        let page_rows: Vec<Row> = rows
            .into_iter()
            .skip(start)
            .take(page_size as usize)
            .collect();

        Ok(RecordPage {
            rows: page_rows,
            page_number,
            page_size,
            total_records,
        })
    }
}

#[derive(Default)]
pub struct MockSchemaService;

impl SchemaService for MockSchemaService {
    fn describe_fields(&self, _object: &str) -> Result<Vec<FieldMetadata>> {
        Ok(vec![
            FieldMetadata {
                api_name: "Name".into(),
                label: "Account Name".into(),
                data_type: DataType::String,
                scale: 0,
                updateable: true,
            },
            FieldMetadata {
                api_name: "Industry".into(),
                label: "Industry".into(),
                data_type: DataType::Picklist,
                scale: 0,
                updateable: true,
            },
            FieldMetadata {
                api_name: "Phone".into(),
                label: "Phone".into(),
                data_type: DataType::Phone,
                scale: 0,
                updateable: true,
            },
            FieldMetadata {
                api_name: "AnnualRevenue".into(),
                label: "Annual Revenue".into(),
                data_type: DataType::Currency,
                scale: 2,
                updateable: false,
            },
            FieldMetadata {
                api_name: "Active__c".into(),
                label: "Active".into(),
                data_type: DataType::Boolean,
                scale: 0,
                updateable: true,
            },
        ])
    }
}

#[derive(Default)]
pub struct MockFeedService;

impl FeedService for MockFeedService {
    fn load_feed(&self, record_id: &str) -> Result<Vec<FeedItem>> {
        let like = |who: &str| FeedLike {
            created_by_id: who.to_string(),
        };
        Ok(vec![
            mock_feed_item(
                "0D5000000000001",
                Some(record_id),
                "sam",
                "Sam Ortiz",
                "<p>Kickoff call went <b>well</b>. Notes attached to the record.</p>",
                vec![like("dana"), like("me")],
            ),
            mock_feed_item(
                "0D5000000000002",
                Some("0D5000000000001"),
                "dana",
                "Dana Li",
                "<p>Thanks! I will follow up with procurement this week.</p>",
                vec![like("sam")],
            ),
            mock_feed_item(
                "0D5000000000003",
                Some("0D5000000000002"),
                "sam",
                "Sam Ortiz",
                "<p>Great, loop me in on the reply.</p>",
                Vec::new(),
            ),
            mock_feed_item(
                "0D5000000000004",
                Some(record_id),
                "priya",
                "Priya Nair",
                "<p>Renewal date moved to <i>next quarter</i>.</p>",
                Vec::new(),
            ),
        ])
    }

    fn post_comment(&self, parent_id: &str, body: &str) -> Result<FeedItem> {
        Ok(mock_feed_item(
            "0D5000000000099",
            Some(parent_id),
            "me",
            "You",
            body,
            Vec::new(),
        ))
    }

    fn like(&self, _feed_item_id: &str) -> Result<()> {
        Ok(())
    }

    fn unlike(&self, _feed_item_id: &str) -> Result<()> {
        Ok(())
    }
}

fn mock_feed_item(
    id: &str,
    parent_id: Option<&str>,
    created_by_id: &str,
    author: &str,
    body: &str,
    likes: Vec<FeedLike>,
) -> FeedItem {
    FeedItem {
        id: id.to_string(),
        parent_id: parent_id.map(str::to_string),
        created_by_id: created_by_id.to_string(),
        author: author.to_string(),
        body: body.to_string(),
        created_utc: 0.0,
        likes,
        like_count: 0,
        is_liked: false,
        replies: Vec::new(),
    }
}

#[derive(Default)]
pub struct MockExportService;

impl ExportService for MockExportService {
    fn export_csv(&self, object: &str, filter_text: &str) -> Result<String> {
        let columns = schema::build_columns(&MockSchemaService.describe_fields(object)?, false);
        let page = MockRecordService.fetch_page(
            object,
            &PageRequest {
                page_number: 1,
                page_size: u64::MAX,
                filter_text: filter_text.to_string(),
                ..PageRequest::default()
            },
        )?;
        export::csv_string(&columns, &page.rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, Value)]) -> Row {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn filter_matches_case_insensitively() {
        let rows = vec![
            row(&[("Id", json!("001x")), ("Name", json!("Acme Corp"))]),
            row(&[("Id", json!("002x")), ("Name", json!("Globex"))]),
        ];
        let hits = filter_rows(&rows, "ACME");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0]["Name"], json!("Acme Corp"));
    }

    #[test]
    fn filter_ignores_id_and_null_fields() {
        let rows = vec![row(&[
            ("Id", json!("ACME0000000001")),
            ("Name", json!(Value::Null)),
        ])];
        assert!(filter_rows(&rows, "acme").is_empty());
    }

    #[test]
    fn filter_matches_non_string_values() {
        let rows = vec![
            row(&[("Name", json!("A")), ("AnnualRevenue", json!(1250000))]),
            row(&[("Name", json!("B")), ("AnnualRevenue", json!(99))]),
        ];
        let hits = filter_rows(&rows, "125");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0]["Name"], json!("A"));
    }

    #[test]
    fn empty_filter_returns_everything() {
        let rows = vec![row(&[("Name", json!("A"))]), row(&[("Name", json!("B"))])];
        assert_eq!(filter_rows(&rows, "  ").len(), 2);
    }

    #[test]
    fn mock_record_service_pages_consistently() {
        let service = MockRecordService;
        let request = PageRequest {
            page_number: 2,
            page_size: 5,
            ..PageRequest::default()
        };
        let page = service.fetch_page("Account", &request).unwrap();
        assert_eq!(page.rows.len(), 5);
        assert_eq!(page.total_records, 12);
        assert_eq!(page.total_pages(), 3);
    }

    #[test]
    fn mock_export_includes_header_and_rows() {
        let payload = MockExportService.export_csv("Account", "").unwrap();
        let mut lines = payload.lines();
        assert_eq!(
            lines.next().unwrap(),
            "Account Name,Industry,Phone,Annual Revenue,Active"
        );
        assert_eq!(lines.count(), 12);
    }
}
