// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::fmt;

/// Errors that can occur while enriching a single invocation's payload
#[derive(Debug, thiserror::Error)]
pub enum EnrichError {
    #[error("Invalid event envelope: {0}")]
    InvalidEvent(#[source] serde_json::Error),

    #[error("Failed to read input stream: {0}")]
    Read(#[from] std::io::Error),

    #[error("Input stream is not valid UTF-8: {0}")]
    Decode(#[from] std::str::Utf8Error),

    #[error("Input stream is not valid JSON: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("Input payload must be a JSON object, got {0}")]
    NotAnObject(&'static str),

    #[error("Missing field '{0}'")]
    MissingField(&'static str),

    #[error("Field '{field}' must be a {expected}")]
    InvalidField {
        field: &'static str,
        expected: &'static str,
    },

    #[error("Failed to write output: {0}")]
    Sink(String),
}

/// Coarse classification of an [`EnrichError`], used as a structured log field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    LookupError,
    ReadError,
    DecodeError,
    ParseError,
    MissingFieldError,
    TypeError,
    SinkError,
}

impl EnrichError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EnrichError::InvalidEvent(_) => ErrorKind::LookupError,
            EnrichError::Read(_) => ErrorKind::ReadError,
            EnrichError::Decode(_) => ErrorKind::DecodeError,
            EnrichError::Parse(_) => ErrorKind::ParseError,
            EnrichError::NotAnObject(_) | EnrichError::InvalidField { .. } => ErrorKind::TypeError,
            EnrichError::MissingField(_) => ErrorKind::MissingFieldError,
            EnrichError::Sink(_) => ErrorKind::SinkError,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::LookupError => "LookupError",
            ErrorKind::ReadError => "ReadError",
            ErrorKind::DecodeError => "DecodeError",
            ErrorKind::ParseError => "ParseError",
            ErrorKind::MissingFieldError => "MissingFieldError",
            ErrorKind::TypeError => "TypeError",
            ErrorKind::SinkError => "SinkError",
        };
        f.write_str(name)
    }
}
