// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! EventGrid event envelope as delivered to the function.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::EnrichError;

const URL_FIELD: &str = "url";

/// A platform-delivered EventGrid notification.
///
/// Only `id`, `topic`, `subject`, `eventType` and `data` are required; the remaining
/// EventGrid schema fields are carried when the platform includes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundEvent {
    pub id: String,
    pub topic: String,
    pub subject: String,
    #[serde(alias = "event_type")]
    pub event_type: String,
    pub data: Value,
    #[serde(default, alias = "event_time", skip_serializing_if = "Option::is_none")]
    pub event_time: Option<String>,
    #[serde(default, alias = "data_version", skip_serializing_if = "Option::is_none")]
    pub data_version: Option<String>,
    #[serde(
        default,
        alias = "metadata_version",
        skip_serializing_if = "Option::is_none"
    )]
    pub metadata_version: Option<String>,
}

impl InboundEvent {
    /// Parses an envelope from an already decoded JSON value. A missing required field is
    /// reported as [`EnrichError::InvalidEvent`].
    pub fn from_value(value: Value) -> Result<Self, EnrichError> {
        serde_json::from_value(value).map_err(EnrichError::InvalidEvent)
    }

    /// Returns `data.url`.
    pub fn blob_url(&self) -> Result<&str, EnrichError> {
        match self.data.get(URL_FIELD) {
            None | Some(Value::Null) => Err(EnrichError::MissingField("data.url")),
            Some(Value::String(url)) => Ok(url),
            Some(_) => Err(EnrichError::InvalidField {
                field: "data.url",
                expected: "string",
            }),
        }
    }

    /// The trace logged for every received event.
    pub fn summary(&self) -> Value {
        json!({
            "id": self.id,
            "data": self.data,
            "topic": self.topic,
            "subject": self.subject,
            "event_type": self.event_type,
        })
    }
}
