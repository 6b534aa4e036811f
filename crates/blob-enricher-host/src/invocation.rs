// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Custom handler payloads exchanged with the Azure Functions host.
//!
//! The host posts one [`InvocationRequest`] per trigger firing, keyed by the binding names
//! from `function.json`:
//!
//! ```json
//! {
//!     "Data": {
//!         "event": { "id": "...", "eventType": "...", "data": { "url": "..." }, ... },
//!         "miztProc": "eyJhIjoxfQ=="
//!     },
//!     "Metadata": { ... }
//! }
//! ```
//!
//! The input blob arrives base64-encoded when it is bound with `dataType: binary`, and as
//! plain text with `dataType: string`.
//!
//! The host expects an [`InvocationResponse`] naming the output bindings to persist:
//!
//! ```json
//! { "Outputs": { "outputBlob": "..." }, "Logs": [ ... ], "ReturnValue": null }
//! ```

use std::io;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use blob_enricher::ports::{ByteStreamReader, OutputBinding, RawEvent};
use blob_enricher::{EnrichError, EventHandler, InvocationOutcome};

use crate::config::{Bindings, InputDataType};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InvocationRequest {
    #[serde(default)]
    pub data: Map<String, Value>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct InvocationResponse {
    pub outputs: Map<String, Value>,
    pub logs: Vec<String>,
    pub return_value: Option<Value>,
}

impl InvocationRequest {
    /// The trigger payload. The host may deliver the EventGrid event either as an object or as
    /// a JSON-encoded string.
    pub fn trigger(&self, binding: &str) -> Value {
        match self.data.get(binding) {
            Some(Value::String(encoded)) => {
                serde_json::from_str(encoded).unwrap_or_else(|_| Value::String(encoded.clone()))
            }
            Some(value) => value.clone(),
            None => Value::Null,
        }
    }

    /// The input binding, decoded according to `data_type` when the invocation reads it.
    pub fn input(&self, binding: &str, data_type: InputDataType) -> BlobInput {
        BlobInput {
            content: self.data.get(binding).cloned(),
            data_type,
        }
    }
}

/// Input blob content as delivered by the host.
#[derive(Debug, Clone)]
pub struct BlobInput {
    content: Option<Value>,
    data_type: InputDataType,
}

#[async_trait]
impl ByteStreamReader for BlobInput {
    /// String values are base64-decoded for binary bindings and used as-is for string
    /// bindings. Anything the host already decoded is re-serialized.
    async fn read_all(&mut self) -> Result<Vec<u8>, EnrichError> {
        match (self.content.take(), self.data_type) {
            (Some(Value::String(content)), InputDataType::Binary) => STANDARD
                .decode(content.trim())
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e).into()),
            (Some(Value::String(content)), InputDataType::Text) => Ok(content.into_bytes()),
            (Some(Value::Null) | None, _) => Ok(Vec::new()),
            (Some(value), _) => Ok(value.to_string().into_bytes()),
        }
    }
}

/// Runs one invocation through `handler` and builds the host response. The outcome is returned
/// alongside so the caller can decide how to report failures.
pub async fn invoke(
    handler: &EventHandler,
    bindings: &Bindings,
    request: &InvocationRequest,
) -> (InvocationResponse, InvocationOutcome) {
    let source = RawEvent(request.trigger(&bindings.trigger));
    let mut reader = request.input(&bindings.input, bindings.input_data_type);
    let mut sink = OutputBinding::new(bindings.output.clone());

    let outcome = handler.invoke(&source, &mut reader, &mut sink).await;

    let mut response = InvocationResponse::default();
    match &outcome {
        InvocationOutcome::Success { blob_name } => {
            if let Some(value) = sink.take() {
                response
                    .outputs
                    .insert(sink.name().to_string(), Value::String(value));
            }
            response
                .logs
                .push(format!("Uploaded {blob_name} to blob storage"));
        }
        InvocationOutcome::SuppressedFailure { error } => {
            response.logs.push(format!("ERROR:{error}"));
        }
    }
    (response, outcome)
}
