// src/models/firestore.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, de};
use std::collections::BTreeMap;

/// Field name -> typed value, as Firestore REST and Eventarc encode document data.
pub type Fields = BTreeMap<String, Value>;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum Value {
    NullValue(()),
    BooleanValue(bool),
    IntegerValue(String), // int64 travels as a decimal string
    #[serde(deserialize_with = "double_value")]
    DoubleValue(f64),
    TimestampValue(DateTime<Utc>),
    StringValue(String),
    BytesValue(String), // base64
    ReferenceValue(String),
    GeoPointValue(LatLng),
    ArrayValue(ArrayValue),
    MapValue(MapValue),
}

/// proto3 JSON writes non-finite doubles as `"NaN"`, `"Infinity"` and `"-Infinity"`.
fn double_value<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    match Repr::deserialize(deserializer)? {
        Repr::Number(n) => Ok(n),
        Repr::Text(text) => match text.as_str() {
            "NaN" => Ok(f64::NAN),
            "Infinity" => Ok(f64::INFINITY),
            "-Infinity" => Ok(f64::NEG_INFINITY),
            other => other
                .parse()
                .map_err(|_| de::Error::custom(format!("invalid doubleValue '{}'", other))),
        },
    }
}

/// Decodes document fields one by one, dropping any field this build cannot
/// represent so a single odd field does not make the whole document unreadable.
fn lenient_fields<'de, D>(deserializer: D) -> Result<Fields, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .filter_map(|(name, raw_value)| match serde_json::from_value::<Value>(raw_value) {
            Ok(value) => Some((name, value)),
            Err(e) => {
                tracing::warn!("Dropping undecodable field {}: {}", name, e);
                None
            }
        })
        .collect())
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LatLng {
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct ArrayValue {
    #[serde(default)]
    pub values: Vec<Value>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct MapValue {
    #[serde(default)]
    pub fields: Fields,
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::BooleanValue(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::StringValue(s) => Some(s),
            _ => None,
        }
    }

    /// Firestore type name, used when reporting malformed fields.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::NullValue(_) => "null",
            Value::BooleanValue(_) => "boolean",
            Value::IntegerValue(_) => "integer",
            Value::DoubleValue(_) => "double",
            Value::TimestampValue(_) => "timestamp",
            Value::StringValue(_) => "string",
            Value::BytesValue(_) => "bytes",
            Value::ReferenceValue(_) => "reference",
            Value::GeoPointValue(_) => "geopoint",
            Value::ArrayValue(_) => "array",
            Value::MapValue(_) => "map",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Full resource name:
    /// `projects/{p}/databases/{d}/documents/{collection}/{id}[/{sub}/{id}...]`
    pub name: String,
    #[serde(default, deserialize_with = "lenient_fields")]
    pub fields: Fields,
    pub create_time: Option<DateTime<Utc>>,
    pub update_time: Option<DateTime<Utc>>,
}

impl Document {
    /// Path relative to the database root, e.g. `requests/abc123`.
    pub fn relative_path(&self) -> &str {
        relative_document_path(&self.name)
    }

    pub fn id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or_default()
    }

    pub fn collection_id(&self) -> Option<&str> {
        let mut segments = self.relative_path().rsplit('/');
        segments.next()?;
        segments.next()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }
}

/// Strips the `projects/../databases/../documents/` prefix when present.
pub fn relative_document_path(name: &str) -> &str {
    match name.find("/documents/") {
        Some(idx) => &name[idx + "/documents/".len()..],
        None => name.trim_start_matches('/'),
    }
}

/// Body of a `google.cloud.firestore.document.v1.*` event in JSON encoding.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct DocumentEventData {
    pub value: Option<Document>,
    pub old_value: Option<Document>,
}
