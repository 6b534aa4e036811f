// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Seams between the enrichment logic and the bindings the platform hands to an invocation.

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::EnrichError;
use crate::event::InboundEvent;

#[async_trait]
pub trait EventSource: Send + Sync {
    /// Produces the trigger event for this invocation.
    async fn event(&self) -> Result<InboundEvent, EnrichError>;
}

#[async_trait]
pub trait ByteStreamReader: Send {
    /// Reads the whole input binding.
    async fn read_all(&mut self) -> Result<Vec<u8>, EnrichError>;
}

#[async_trait]
pub trait ObjectSink: Send {
    /// Stores `value` in the output binding, replacing anything set before.
    async fn set(&mut self, value: String) -> Result<(), EnrichError>;
}

#[async_trait]
impl EventSource for InboundEvent {
    async fn event(&self) -> Result<InboundEvent, EnrichError> {
        Ok(self.clone())
    }
}

/// An event envelope that has not been validated yet. Parsing happens when the invocation
/// asks for it so a malformed envelope is reported like any other invocation failure.
#[derive(Debug, Clone)]
pub struct RawEvent(pub Value);

#[async_trait]
impl EventSource for RawEvent {
    async fn event(&self) -> Result<InboundEvent, EnrichError> {
        InboundEvent::from_value(self.0.clone())
    }
}

#[async_trait]
impl<R> ByteStreamReader for R
where
    R: AsyncRead + Unpin + Send,
{
    async fn read_all(&mut self) -> Result<Vec<u8>, EnrichError> {
        let mut buf = Vec::new();
        self.read_to_end(&mut buf).await?;
        Ok(buf)
    }
}

/// A named output slot holding at most one value.
#[derive(Debug, Clone, Default)]
pub struct OutputBinding {
    name: String,
    value: Option<String>,
    writes: usize,
}

impl OutputBinding {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
            writes: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// Number of times `set` has been called.
    pub fn writes(&self) -> usize {
        self.writes
    }

    pub fn take(&mut self) -> Option<String> {
        self.value.take()
    }
}

#[async_trait]
impl ObjectSink for OutputBinding {
    async fn set(&mut self, value: String) -> Result<(), EnrichError> {
        self.value = Some(value);
        self.writes += 1;
        Ok(())
    }
}
