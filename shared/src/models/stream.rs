//! Stream listing models.

use serde::{Deserialize, Serialize};

/// Response of `GET /api/{org}/streams`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListStreamResponse {
    /// The streams of the requested kind.
    pub list: Vec<StreamInfo>,
}

/// One stream and its schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamInfo {
    /// Stream name, usable as a table name in SQL.
    pub name: String,
    /// Storage backend of the stream.
    pub storage_type: String,
    /// Record kind.
    pub stream_type: String,
    /// Field definitions.
    pub schema: Vec<SchemaField>,
}

impl StreamInfo {
    /// Names of the stream's fields, in schema order.
    #[must_use]
    pub fn field_names(&self) -> Vec<String> {
        self.schema.iter().map(|field| field.name.clone()).collect()
    }
}

/// A field of a stream schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaField {
    /// Field name.
    pub name: String,
    /// Backend type name.
    #[serde(rename = "type")]
    pub field_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_list_streams() {
        let response: ListStreamResponse = serde_json::from_str(
            r#"{"list":[{"name":"default","storage_type":"s3","stream_type":"logs",
                "schema":[{"name":"_timestamp","type":"Int64"},{"name":"log","type":"Utf8"}],
                "stats":{"doc_num":10}}]}"#,
        )
        .unwrap();

        assert_eq!(response.list.len(), 1);
        assert_eq!(response.list[0].name, "default");
        assert_eq!(response.list[0].field_names(), vec!["_timestamp", "log"]);
        assert_eq!(response.list[0].schema[1].field_type, "Utf8");
    }
}
