// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::env;
use std::str::FromStr;

use blob_enricher::OutputFormat;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_FUNCTION_NAME: &str = "function_code";
const DEFAULT_TRIGGER_BINDING: &str = "event";
const DEFAULT_INPUT_BINDING: &str = "miztProc";
const DEFAULT_OUTPUT_BINDING: &str = "outputBlob";

/// `dataType` of the input blob binding. With `binary` the host hands the blob over
/// base64-encoded, so its bytes reach the handler untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputDataType {
    #[default]
    Binary,
    Text,
}

impl FromStr for InputDataType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "binary" => Ok(InputDataType::Binary),
            "string" | "text" => Ok(InputDataType::Text),
            other => Err(format!(
                "Invalid input data type '{other}'. Must be one of: binary, string"
            )),
        }
    }
}

/// Names of the bindings declared in the function's `function.json`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bindings {
    pub trigger: String,
    pub input: String,
    pub input_data_type: InputDataType,
    pub output: String,
}

impl Default for Bindings {
    fn default() -> Self {
        Self {
            trigger: DEFAULT_TRIGGER_BINDING.to_string(),
            input: DEFAULT_INPUT_BINDING.to_string(),
            input_data_type: InputDataType::default(),
            output: DEFAULT_OUTPUT_BINDING.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// port the Functions host forwards invocations to
    pub port: u16,
    pub function_name: String,
    pub bindings: Bindings,
    pub output_format: OutputFormat,
    /// answer failed invocations with a 500 so the platform sees them
    pub signal_failures: bool,
    pub max_request_content_length: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            function_name: DEFAULT_FUNCTION_NAME.to_string(),
            bindings: Bindings::default(),
            output_format: OutputFormat::default(),
            signal_failures: false,
            max_request_content_length: 10 * 1024 * 1024, // 10MB in Bytes
        }
    }
}

impl Config {
    pub fn new() -> Result<Config, Box<dyn std::error::Error>> {
        // set by the Functions host when it launches a custom handler
        let port = match env::var("FUNCTIONS_CUSTOMHANDLER_PORT") {
            Ok(port) => port.trim().parse::<u16>().map_err(|_| {
                anyhow::anyhow!("FUNCTIONS_CUSTOMHANDLER_PORT must be a valid port, got '{port}'")
            })?,
            Err(_) => DEFAULT_PORT,
        };

        let output_format = match env::var("BLOB_ENRICHER_OUTPUT_FORMAT") {
            Ok(val) => val.parse::<OutputFormat>().map_err(|e| anyhow::anyhow!(e))?,
            Err(_) => OutputFormat::default(),
        };

        let input_data_type = match env::var("BLOB_ENRICHER_INPUT_DATA_TYPE") {
            Ok(val) => val.parse::<InputDataType>().map_err(|e| anyhow::anyhow!(e))?,
            Err(_) => InputDataType::default(),
        };

        let signal_failures = env::var("BLOB_ENRICHER_SIGNAL_FAILURES")
            .map(|val| val.to_lowercase() == "true")
            .unwrap_or(false);

        let config = Config {
            port,
            function_name: non_empty_var("BLOB_ENRICHER_FUNCTION_NAME")
                .unwrap_or_else(|| DEFAULT_FUNCTION_NAME.to_string()),
            bindings: Bindings {
                trigger: non_empty_var("BLOB_ENRICHER_TRIGGER_BINDING")
                    .unwrap_or_else(|| DEFAULT_TRIGGER_BINDING.to_string()),
                input: non_empty_var("BLOB_ENRICHER_INPUT_BINDING")
                    .unwrap_or_else(|| DEFAULT_INPUT_BINDING.to_string()),
                input_data_type,
                output: non_empty_var("BLOB_ENRICHER_OUTPUT_BINDING")
                    .unwrap_or_else(|| DEFAULT_OUTPUT_BINDING.to_string()),
            },
            output_format,
            signal_failures,
            ..Default::default()
        };

        if config.port == 0 {
            return Err(
                anyhow::anyhow!("FUNCTIONS_CUSTOMHANDLER_PORT must be greater than 0").into(),
            );
        }

        Ok(config)
    }

    /// Request path the host posts invocations to.
    pub fn invocation_path(&self) -> String {
        format!("/{}", self.function_name)
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|val| val.trim().to_string())
        .filter(|val| !val.is_empty())
}
