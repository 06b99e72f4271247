//! Raw project payload loading.
//!
//! The backend answers with either a bare JSON array of project objects or
//! an envelope `{ "data": [...] }`. Both are accepted from a file, stdin or
//! a single HTTP request.

use crate::error::SourceError;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

/// Where to read the payload from.
#[derive(Debug, Clone)]
pub enum PayloadSource {
    /// A JSON file on disk.
    File(PathBuf),
    /// Standard input.
    Stdin,
    /// The backend's project endpoint.
    Http(HttpOptions),
}

/// Options for fetching the payload over HTTP.
#[derive(Debug, Clone)]
pub struct HttpOptions {
    /// Endpoint URL.
    pub url: String,
    /// Value for the `Authorization` header, sent as given.
    pub token: Option<String>,
    /// Manager id; when set the request is a POST with `{"id": ...}`.
    pub manager_id: Option<String>,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
    /// Whether to show a spinner while waiting.
    pub show_progress: bool,
}

impl PayloadSource {
    /// Short description for log lines and report metadata.
    pub fn describe(&self) -> String {
        match self {
            PayloadSource::File(path) => path.display().to_string(),
            PayloadSource::Stdin => "stdin".to_string(),
            PayloadSource::Http(options) => options.url.clone(),
        }
    }
}

/// Load the raw project records.
pub async fn load_payload(source: &PayloadSource) -> Result<Vec<Value>, SourceError> {
    info!("Loading projects from {}", source.describe());

    let payload = match source {
        PayloadSource::File(path) => {
            let content = tokio::fs::read_to_string(path)
                .await
                .map_err(|source| SourceError::Io {
                    path: path.display().to_string(),
                    source,
                })?;
            serde_json::from_str(&content)?
        }
        PayloadSource::Stdin => {
            let content = tokio::task::spawn_blocking(|| {
                let mut buf = String::new();
                std::io::stdin().read_to_string(&mut buf).map(|_| buf)
            })
            .await
            .map_err(|e| SourceError::Shape(format!("stdin reader failed: {}", e)))?
            .map_err(|source| SourceError::Io {
                path: "stdin".to_string(),
                source,
            })?;
            serde_json::from_str(&content)?
        }
        PayloadSource::Http(options) => fetch(options).await?,
    };

    let records = extract_records(payload)?;
    debug!("Payload contains {} raw records", records.len());
    Ok(records)
}

/// Pull the record array out of a payload.
pub fn extract_records(payload: Value) -> Result<Vec<Value>, SourceError> {
    match payload {
        Value::Array(records) => Ok(records),
        Value::Object(mut envelope) => match envelope.remove("data") {
            Some(Value::Array(records)) => Ok(records),
            Some(Value::Null) => Ok(Vec::new()),
            Some(other) => Err(SourceError::Shape(format!(
                "`data` must be an array, got {}",
                type_name(&other)
            ))),
            None => Err(SourceError::Shape(
                "expected an array or an object with a `data` array".to_string(),
            )),
        },
        other => Err(SourceError::Shape(format!(
            "expected an array or an object, got {}",
            type_name(&other)
        ))),
    }
}

async fn fetch(options: &HttpOptions) -> Result<Value, SourceError> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(options.timeout_seconds))
        .build()?;

    let mut request = match options.manager_id {
        Some(ref id) => client
            .post(&options.url)
            .json(&serde_json::json!({ "id": id })),
        None => client.get(&options.url),
    };

    if let Some(ref token) = options.token {
        request = request.header(reqwest::header::AUTHORIZATION, token);
    }

    let spinner = options.show_progress.then(|| {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(format!("Fetching {}", options.url));
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    });

    let result = send(request).await;

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    result
}

async fn send(request: reqwest::RequestBuilder) -> Result<Value, SourceError> {
    let response = request.send().await?;
    let status = response.status();

    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(SourceError::Api {
            status: status.as_u16(),
            message,
        });
    }

    Ok(response.json::<Value>().await?)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
