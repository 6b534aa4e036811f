// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod clock;
pub mod enrich;
pub mod error;
pub mod event;
pub mod handler;
pub mod ports;
pub mod render;

pub use error::{EnrichError, ErrorKind};
pub use event::InboundEvent;
pub use handler::{EventHandler, InvocationOutcome};
pub use render::OutputFormat;
