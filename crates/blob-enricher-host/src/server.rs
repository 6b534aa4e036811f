// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use http_body_util::BodyExt;
use hyper::service::service_fn;
use hyper::{http, Method, Request, StatusCode};
use serde_json::json;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, warn};

use blob_enricher::{EventHandler, InvocationOutcome};

use crate::config;
use crate::http_utils::{
    create_http_response, create_json_response, log_and_create_http_response,
    verify_request_content_length, HttpResponse,
};
use crate::invocation::{self, InvocationRequest, InvocationResponse};

const INFO_ENDPOINT_PATH: &str = "/info";

pub struct FunctionHost {
    pub config: Arc<config::Config>,
    pub handler: Arc<EventHandler>,
}

impl FunctionHost {
    pub async fn start(&self) -> Result<(), Box<dyn std::error::Error>> {
        let now = Instant::now();

        // setup our hyper http server, where the endpoint_handler handles incoming requests
        let handler = self.handler.clone();
        let endpoint_config = self.config.clone();

        let service = service_fn(move |req: Request<hyper::body::Incoming>| {
            // called for each http request
            let handler = handler.clone();
            let endpoint_config = endpoint_config.clone();

            FunctionHost::endpoint_handler(endpoint_config, req, handler)
        });

        let addr = SocketAddr::from(([127, 0, 0, 1], self.config.port));
        let listener = tokio::net::TcpListener::bind(&addr).await?;

        debug!(
            "Function host started: listening on port {} for {}",
            self.config.port,
            self.config.invocation_path()
        );
        debug!(
            "Time taken to start the function host: {} ms",
            now.elapsed().as_millis()
        );

        Self::serve_tcp(listener, service).await
    }

    async fn serve_tcp<S>(
        listener: tokio::net::TcpListener,
        service: S,
    ) -> Result<(), Box<dyn std::error::Error>>
    where
        S: hyper::service::Service<
                hyper::Request<hyper::body::Incoming>,
                Response = HttpResponse,
            > + Clone
            + Send
            + 'static,
        S::Future: Send,
        S::Error: std::error::Error + Send + Sync + 'static,
    {
        let server = hyper::server::conn::http1::Builder::new();
        let mut joinset = tokio::task::JoinSet::new();

        loop {
            let conn = tokio::select! {
                con_res = listener.accept() => match con_res {
                    Err(e)
                        if matches!(
                            e.kind(),
                            io::ErrorKind::ConnectionAborted
                                | io::ErrorKind::ConnectionReset
                                | io::ErrorKind::ConnectionRefused
                        ) =>
                    {
                        continue;
                    }
                    Err(e) => {
                        error!("Server error: {e}");
                        return Err(e.into());
                    }
                    Ok((conn, _)) => conn,
                },
                finished = async {
                    match joinset.join_next().await {
                        Some(finished) => finished,
                        None => std::future::pending().await,
                    }
                } => match finished {
                    Err(e) if e.is_panic() => {
                        // Don't kill server on panic - log and continue
                        error!("Connection handler panicked: {:?}", e);
                        continue;
                    },
                    Ok(()) | Err(_) => continue,
                },
            };
            let conn = hyper_util::rt::TokioIo::new(conn);
            let server = server.clone();
            let service = service.clone();
            joinset.spawn(async move {
                if let Err(e) = server.serve_connection(conn, service).await {
                    error!("Connection error: {e}");
                }
            });
        }
    }

    async fn endpoint_handler(
        config: Arc<config::Config>,
        req: Request<hyper::body::Incoming>,
        handler: Arc<EventHandler>,
    ) -> http::Result<HttpResponse> {
        let path = req.uri().path().to_string();
        match (req.method(), path.as_str()) {
            (&Method::POST, p) if p == config.invocation_path() => {
                match Self::invocation_handler(config, req, handler).await {
                    Ok(result) => Ok(result),
                    Err(err) => log_and_create_http_response(
                        &format!("Error processing invocation: {err}"),
                        StatusCode::INTERNAL_SERVER_ERROR,
                    ),
                }
            }
            (_, INFO_ENDPOINT_PATH) => match Self::info_handler(&config, &handler) {
                Ok(result) => Ok(result),
                Err(err) => log_and_create_http_response(
                    &format!("Info endpoint error: {err}"),
                    StatusCode::INTERNAL_SERVER_ERROR,
                ),
            },
            _ => {
                let mut not_found = HttpResponse::default();
                *not_found.status_mut() = StatusCode::NOT_FOUND;
                warn!("No route for {} {}", req.method(), path);
                Ok(not_found)
            }
        }
    }

    async fn invocation_handler(
        config: Arc<config::Config>,
        req: Request<hyper::body::Incoming>,
        handler: Arc<EventHandler>,
    ) -> http::Result<HttpResponse> {
        let (parts, body) = req.into_parts();

        if let Some(response) = verify_request_content_length(
            &parts.headers,
            config.max_request_content_length,
            "Error processing invocation",
        ) {
            return response;
        }

        let body = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => {
                return log_and_create_http_response(
                    &format!("Error reading invocation body: {e}"),
                    StatusCode::BAD_REQUEST,
                );
            }
        };

        // double check content length is < max request content length in case transfer encoding is used
        if body.len() > config.max_request_content_length {
            return log_and_create_http_response(
                "Error processing invocation: Payload too large",
                StatusCode::PAYLOAD_TOO_LARGE,
            );
        }

        let request: InvocationRequest = match serde_json::from_slice(&body) {
            Ok(request) => request,
            Err(e) => {
                return log_and_create_http_response(
                    &format!("Error deserializing invocation request: {e}"),
                    StatusCode::BAD_REQUEST,
                );
            }
        };

        let (response, outcome) = invocation::invoke(&handler, &config.bindings, &request).await;
        Self::invocation_response(&config, &response, outcome)
    }

    /// Maps a finished invocation onto the HTTP answer for the host. The handler has already
    /// logged any failure at error level, so a signalled failure only adds a warning.
    fn invocation_response(
        config: &config::Config,
        response: &InvocationResponse,
        outcome: InvocationOutcome,
    ) -> http::Result<HttpResponse> {
        match outcome {
            InvocationOutcome::SuppressedFailure { error } if config.signal_failures => {
                let message = format!("Invocation failed: {error}");
                warn!("{message}");
                create_http_response(&message, StatusCode::INTERNAL_SERVER_ERROR)
            }
            _ => create_json_response(response, StatusCode::OK),
        }
    }

    fn info_handler(
        config: &config::Config,
        handler: &EventHandler,
    ) -> http::Result<HttpResponse> {
        let response_json = json!({
            "function": config.function_name,
            "endpoints": [config.invocation_path(), INFO_ENDPOINT_PATH],
            "bindings": {
                "trigger": config.bindings.trigger,
                "input": config.bindings.input,
                "output": config.bindings.output,
            },
            "config": {
                "output_format": handler.format().to_string(),
                "signal_failures": config.signal_failures,
                "max_request_content_length": config.max_request_content_length,
            },
            "version": env!("CARGO_PKG_VERSION"),
        });
        create_json_response(&response_json, StatusCode::OK)
    }
}
