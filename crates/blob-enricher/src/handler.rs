// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::clock::{Clock, SystemClock};
use crate::enrich::{blob_name_from_url, decode_payload, EnrichedPayload};
use crate::error::EnrichError;
use crate::event::InboundEvent;
use crate::ports::{ByteStreamReader, EventSource, ObjectSink};
use crate::render::OutputFormat;

/// Terminal state of one invocation.
#[derive(Debug)]
pub enum InvocationOutcome {
    /// The enriched payload was handed to the sink.
    Success { blob_name: String },
    /// Something failed; the error was logged and nothing was written.
    SuppressedFailure { error: EnrichError },
}

impl InvocationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, InvocationOutcome::Success { .. })
    }

    pub fn error(&self) -> Option<&EnrichError> {
        match self {
            InvocationOutcome::Success { .. } => None,
            InvocationOutcome::SuppressedFailure { error } => Some(error),
        }
    }
}

pub struct EventHandler {
    clock: Arc<dyn Clock>,
    format: OutputFormat,
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new(OutputFormat::default())
    }
}

impl EventHandler {
    pub fn new(format: OutputFormat) -> Self {
        Self::with_clock(Arc::new(SystemClock), format)
    }

    pub fn with_clock(clock: Arc<dyn Clock>, format: OutputFormat) -> Self {
        Self { clock, format }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Decodes `input`, derives the blob name from the event's `data.url` and applies the
    /// processing metadata. The stream is decoded before the URL is looked up, so a broken
    /// stream is reported ahead of a missing url.
    pub fn enrich(
        &self,
        event: &InboundEvent,
        input: &[u8],
    ) -> Result<EnrichedPayload, EnrichError> {
        let payload = decode_payload(input)?;
        let blob_name = blob_name_from_url(event.blob_url()?);
        Ok(EnrichedPayload::new(payload, blob_name, self.clock.now()))
    }

    /// [`EventHandler::enrich`] followed by rendering in the configured output format.
    pub fn handle(&self, event: &InboundEvent, input: &[u8]) -> Result<String, EnrichError> {
        let enriched = self.enrich(event, input)?;
        Ok(self.format.render(enriched.fields()))
    }

    /// Runs one full invocation against the given bindings. Failures never propagate: they
    /// are logged once at error level and returned as
    /// [`InvocationOutcome::SuppressedFailure`], leaving the caller to decide whether the
    /// platform should see them.
    pub async fn invoke<E, R, S>(
        &self,
        source: &E,
        reader: &mut R,
        sink: &mut S,
    ) -> InvocationOutcome
    where
        E: EventSource + ?Sized,
        R: ByteStreamReader + ?Sized,
        S: ObjectSink + ?Sized,
    {
        match self.try_invoke(source, reader, sink).await {
            Ok(blob_name) => InvocationOutcome::Success { blob_name },
            Err(e) => {
                error!(error_kind = %e.kind(), "ERROR:{e}");
                InvocationOutcome::SuppressedFailure { error: e }
            }
        }
    }

    async fn try_invoke<E, R, S>(
        &self,
        source: &E,
        reader: &mut R,
        sink: &mut S,
    ) -> Result<String, EnrichError>
    where
        E: EventSource + ?Sized,
        R: ByteStreamReader + ?Sized,
        S: ObjectSink + ?Sized,
    {
        let event = source.event().await?;
        info!("EventGrid trigger processed an event: {}", event.summary());

        let input = reader.read_all().await?;
        debug!("Read {} bytes from input binding", input.len());

        let enriched = self.enrich(&event, &input)?;
        info!("BLOB DATA: {}", OutputFormat::Json.render(enriched.fields()));

        let blob_name = enriched.blob_name().to_string();
        sink.set(self.format.render(enriched.fields())).await?;
        info!("Uploaded {blob_name} to blob storage");

        Ok(blob_name)
    }
}
