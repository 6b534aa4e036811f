// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::clock::iso_timestamp;
use crate::error::EnrichError;

pub const BLOB_NAME_KEY: &str = "blob_name";
pub const PROCESSED_KEY: &str = "miztiik_event_processed";
pub const PROCESSED_ON_KEY: &str = "last_processed_on";

/// Returns the last `/`-separated segment of `url`, or the whole string when it has no `/`.
pub fn blob_name_from_url(url: &str) -> &str {
    match url.rfind('/') {
        Some(idx) => &url[idx + 1..],
        None => url,
    }
}

/// Decodes the raw input stream into the JSON object that gets annotated.
pub fn decode_payload(bytes: &[u8]) -> Result<Map<String, Value>, EnrichError> {
    let text = std::str::from_utf8(bytes)?;
    match serde_json::from_str(text).map_err(EnrichError::Parse)? {
        Value::Object(map) => Ok(map),
        Value::Array(_) => Err(EnrichError::NotAnObject("array")),
        Value::String(_) => Err(EnrichError::NotAnObject("string")),
        Value::Number(_) => Err(EnrichError::NotAnObject("number")),
        Value::Bool(_) => Err(EnrichError::NotAnObject("boolean")),
        Value::Null => Err(EnrichError::NotAnObject("null")),
    }
}

/// An input payload with the processing metadata applied.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedPayload {
    blob_name: String,
    fields: Map<String, Value>,
}

impl EnrichedPayload {
    /// Inserts or overwrites `blob_name`, `miztiik_event_processed` and `last_processed_on`.
    /// Existing keys keep their position in the object.
    pub fn new(
        mut fields: Map<String, Value>,
        blob_name: &str,
        processed_on: DateTime<Utc>,
    ) -> Self {
        fields.insert(BLOB_NAME_KEY.to_string(), Value::from(blob_name));
        fields.insert(PROCESSED_KEY.to_string(), Value::Bool(true));
        fields.insert(
            PROCESSED_ON_KEY.to_string(),
            Value::String(iso_timestamp(processed_on)),
        );
        Self {
            blob_name: blob_name.to_string(),
            fields,
        }
    }

    pub fn blob_name(&self) -> &str {
        &self.blob_name
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use duplicate::duplicate_item;
    use proptest::prelude::*;
    use serde_json::json;

    #[duplicate_item(
        test_name                       url                                                             expected;
        [test_blob_name_storage_url]    ["https://acct.blob.core.windows.net/container/myfile.json"]    ["myfile.json"];
        [test_blob_name_nested_path]    ["https://acct.blob.core.windows.net/c/a/b/data.json"]          ["data.json"];
        [test_blob_name_no_slash]       ["myfile.json"]                                                 ["myfile.json"];
        [test_blob_name_trailing_slash] ["https://acct.blob.core.windows.net/container/"]               [""];
        [test_blob_name_empty]          [""]                                                            [""];
    )]
    #[test]
    fn test_name() {
        assert_eq!(blob_name_from_url(url), expected);
    }

    proptest! {
        #[test]
        fn test_blob_name_is_suffix_after_last_slash(url in ".*") {
            let name = blob_name_from_url(&url);
            prop_assert!(!name.contains('/'));
            prop_assert!(url.ends_with(name));
            if url.contains('/') {
                prop_assert_eq!(url.len() - name.len() - 1, url.rfind('/').unwrap());
            } else {
                prop_assert_eq!(name, url.as_str());
            }
        }
    }

    #[test]
    fn test_decode_payload_object() {
        let map = decode_payload(br#"{"a":1,"b":"two"}"#).unwrap();
        assert_eq!(map.get("a"), Some(&json!(1)));
        assert_eq!(map.get("b"), Some(&json!("two")));
    }

    #[test]
    fn test_decode_payload_invalid_utf8() {
        let err = decode_payload(&[b'{', 0xff, b'}']).unwrap_err();
        assert!(matches!(err, EnrichError::Decode(_)));
    }

    #[test]
    fn test_decode_payload_invalid_json() {
        let err = decode_payload(b"{not json").unwrap_err();
        assert!(matches!(err, EnrichError::Parse(_)));
    }

    #[test]
    fn test_decode_payload_not_an_object() {
        assert!(matches!(
            decode_payload(b"[1,2,3]"),
            Err(EnrichError::NotAnObject("array"))
        ));
        assert!(matches!(
            decode_payload(b"null"),
            Err(EnrichError::NotAnObject("null"))
        ));
    }

    #[test]
    fn test_enriched_payload_appends_fields_in_order() {
        let instant = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        let input = decode_payload(br#"{"a":1}"#).unwrap();
        let enriched = EnrichedPayload::new(input, "myfile.json", instant);

        assert_eq!(enriched.blob_name(), "myfile.json");
        let keys: Vec<&str> = enriched.fields().keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec!["a", BLOB_NAME_KEY, PROCESSED_KEY, PROCESSED_ON_KEY]
        );
        assert_eq!(
            Value::Object(enriched.into_fields()),
            json!({
                "a": 1,
                "blob_name": "myfile.json",
                "miztiik_event_processed": true,
                "last_processed_on": "2024-05-01T12:30:00.000000+00:00"
            })
        );
    }

    #[test]
    fn test_enriched_payload_overwrites_existing_fields() {
        let instant = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        let input = decode_payload(
            br#"{"miztiik_event_processed":false,"blob_name":"old.json","z":0}"#,
        )
        .unwrap();
        let enriched = EnrichedPayload::new(input, "new.json", instant);

        let keys: Vec<&str> = enriched.fields().keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec![PROCESSED_KEY, BLOB_NAME_KEY, "z", PROCESSED_ON_KEY]
        );
        assert_eq!(enriched.fields()[BLOB_NAME_KEY], "new.json");
        assert_eq!(enriched.fields()[PROCESSED_KEY], true);
    }
}
