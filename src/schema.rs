use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Field data types reported by the describe endpoint. Anything the server
/// invents that we do not know about lands in `Other` and renders as text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash, Default)]
pub enum DataType {
    #[default]
    String,
    TextArea,
    Picklist,
    Multipicklist,
    Boolean,
    Currency,
    Date,
    Datetime,
    Double,
    Int,
    Long,
    Percent,
    Phone,
    Email,
    Url,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FieldMetadata {
    pub api_name: String,
    pub label: String,
    #[serde(default)]
    pub data_type: DataType,
    #[serde(default)]
    pub scale: u32,
    #[serde(default)]
    pub updateable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RenderType {
    #[default]
    Text,
    Number,
    Currency,
    Date,
    DateLocal,
    Percent,
    Phone,
    Email,
    Url,
    Boolean,
}

impl RenderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderType::Text => "text",
            RenderType::Number => "number",
            RenderType::Currency => "currency",
            RenderType::Date => "date",
            RenderType::DateLocal => "date-local",
            RenderType::Percent => "percent",
            RenderType::Phone => "phone",
            RenderType::Email => "email",
            RenderType::Url => "url",
            RenderType::Boolean => "boolean",
        }
    }
}

/// How one field renders as a table column. Constructed once per describe
/// response and never mutated afterwards.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ColumnDescriptor {
    pub label: String,
    pub field_name: String,
    pub render_type: RenderType,
    pub attributes: Value,
    pub editable: bool,
    pub sortable: bool,
}

/// Maps field metadata to a column descriptor. Total: every input yields
/// exactly one column, unknown data types fall back to text.
pub fn map_field_to_column(field: &FieldMetadata, editable: bool) -> ColumnDescriptor {
    let render_type = render_type_for(field.data_type);
    ColumnDescriptor {
        label: field.label.clone(),
        field_name: field.api_name.clone(),
        attributes: render_attributes(render_type, field),
        editable: editable && field.updateable,
        sortable: true,
        render_type,
    }
}

/// Builds the full column list for a describe response. Returns a fresh
/// vector per call; nothing is accumulated across calls.
pub fn build_columns(fields: &[FieldMetadata], editable: bool) -> Vec<ColumnDescriptor> {
    fields
        .iter()
        .map(|field| map_field_to_column(field, editable))
        .collect()
}

fn render_type_for(data_type: DataType) -> RenderType {
    match data_type {
        DataType::String | DataType::TextArea | DataType::Picklist | DataType::Multipicklist => {
            RenderType::Text
        }
        DataType::Boolean => RenderType::Boolean,
        DataType::Currency => RenderType::Currency,
        DataType::Date => RenderType::DateLocal,
        DataType::Datetime => RenderType::Date,
        DataType::Double | DataType::Int | DataType::Long => RenderType::Number,
        DataType::Percent => RenderType::Percent,
        DataType::Phone => RenderType::Phone,
        DataType::Email => RenderType::Email,
        DataType::Url => RenderType::Url,
        DataType::Other => RenderType::Text,
    }
}

fn render_attributes(render_type: RenderType, field: &FieldMetadata) -> Value {
    match render_type {
        RenderType::Currency => json!({
            "step": "0.01",
            "currencyCode": "USD",
        }),
        RenderType::Date | RenderType::DateLocal => json!({
            "day": "numeric",
            "month": "short",
            "year": "numeric",
            "timeZone": "UTC",
        }),
        RenderType::Number => json!({ "step": number_step(field.scale) }),
        RenderType::Percent => json!({
            "step": "0.01",
            "minimumFractionDigits": 0,
            "maximumFractionDigits": 2,
        }),
        _ => json!({}),
    }
}

// Scale 2 yields "0.01", scale 1 yields "0.1", scale 0 yields "1".
fn number_step(scale: u32) -> String {
    if scale > 0 {
        format!("0.{}1", "0".repeat(scale as usize - 1))
    } else {
        "1".to_string()
    }
}
