// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Helper functions for integration tests

use base64::{engine::general_purpose::STANDARD, Engine};
use blob_enricher_host::http_utils::Body;
use http_body_util::BodyExt;
use hyper::body::Bytes;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::time::timeout;

pub const STORAGE_URL: &str = "https://acct.blob.core.windows.net/container/myfile.json";

/// An EventGrid BlobCreated event for the blob at `url`
pub fn blob_created_event(url: &str) -> Value {
    json!({
        "id": "831e1650-001e-001b-66ab-eeb76e069631",
        "topic": "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Storage/storageAccounts/acct",
        "subject": "/blobServices/default/containers/container/blobs/myfile.json",
        "eventType": "Microsoft.Storage.BlobCreated",
        "eventTime": "2021-03-03T10:15:00.0000000Z",
        "data": { "api": "PutBlob", "url": url },
        "dataVersion": "",
        "metadataVersion": "1"
    })
}

/// Build a custom handler invocation body with the default binding names. The blob content is
/// base64-encoded the way the host delivers a binary input binding.
pub fn create_invocation_payload(event: Value, blob_content: &[u8]) -> Vec<u8> {
    json!({
        "Data": { "event": event, "miztProc": STANDARD.encode(blob_content) },
        "Metadata": { "sys": { "MethodName": "function_code", "UtcNow": "2021-03-03T10:15:01Z" } }
    })
    .to_string()
    .into_bytes()
}

/// Send an HTTP request over TCP and return the response
pub async fn send_tcp_request(
    port: u16,
    uri: &str,
    method: &str,
    body: Option<Vec<u8>>,
) -> Result<Response<hyper::body::Incoming>, Box<dyn std::error::Error>> {
    let stream = timeout(
        Duration::from_secs(2),
        tokio::net::TcpStream::connect(format!("127.0.0.1:{}", port)),
    )
    .await??;

    let io = TokioIo::new(stream);
    let (mut sender, conn) = hyper::client::conn::http1::handshake(io).await?;

    tokio::spawn(async move {
        let _ = conn.await;
    });

    let mut request_builder = Request::builder()
        .uri(uri)
        .method(method)
        .header("Content-Type", "application/json");

    let response = if let Some(body_data) = body {
        let body_len = body_data.len();
        request_builder = request_builder.header("Content-Length", body_len.to_string());
        let request = request_builder.body(Body::from(body_data))?;
        timeout(Duration::from_secs(2), sender.send_request(request)).await??
    } else {
        let request = request_builder.body(Body::new(Bytes::new()))?;
        timeout(Duration::from_secs(2), sender.send_request(request)).await??
    };

    Ok(response)
}

/// Collect a response body as JSON
pub async fn response_json(
    response: Response<hyper::body::Incoming>,
) -> Result<Value, Box<dyn std::error::Error>> {
    let bytes = response.into_body().collect().await?.to_bytes();
    Ok(serde_json::from_slice(&bytes)?)
}
