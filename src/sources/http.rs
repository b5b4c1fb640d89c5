//! Snapshot of a single HTTP exchange
//!
//! The artifact is a JSON document:
//!
//! ```json
//! {"url": "http://svc/health", "timestamp": "2024-05-01T12:00:00.000000",
//!  "result": 500, "detail": {"status": "KO"}}
//! ```
//!
//! `detail` carries the parsed body of JSON responses, `msg` the raw text of
//! anything else. Without a response `result` is `null` and `msg` holds the error.

use super::{Artifact, Source, SourceError};
use crate::config::HttpSourceConfig;
use crate::utils::http::{HttpClient, HttpRequest, HttpResponse};
use crate::utils::timestamp::{artifact_file_name, now_iso};
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Debug, Serialize)]
struct Snapshot<'a> {
    url: &'a str,
    timestamp: &'a str,
    result: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    msg: Option<String>,
}

pub struct HttpSnapshotSource {
    name: String,
    backup_filename: String,
    request: HttpRequest,
    client: Arc<dyn HttpClient>,
}

impl HttpSnapshotSource {
    pub fn from_config(config: &HttpSourceConfig, client: Arc<dyn HttpClient>) -> Self {
        Self {
            name: config.display_name().to_string(),
            backup_filename: config.backup_filename.clone(),
            request: HttpRequest {
                method: config.method.to_uppercase(),
                url: config.url.clone(),
                options: config.request_params.clone(),
            },
            client,
        }
    }

    pub fn request(&self) -> &HttpRequest {
        &self.request
    }
}

fn response_snapshot<'a>(url: &'a str, timestamp: &'a str, response: HttpResponse) -> Snapshot<'a> {
    let parsed = if response.is_json() {
        serde_json::from_str::<Value>(&response.body).ok()
    } else {
        None
    };
    let msg = match parsed {
        Some(_) => None,
        None => Some(response.body),
    };

    Snapshot {
        url,
        timestamp,
        result: Some(response.status),
        detail: parsed,
        msg,
    }
}

impl Source for HttpSnapshotSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "http"
    }

    fn backup(&self, workspace: &Path) -> Result<Artifact, SourceError> {
        let timestamp = now_iso();
        let path = workspace.join(artifact_file_name(&self.backup_filename, &timestamp, "json"));
        let url = self.request.url.as_str();

        info!("Requesting {} {} for '{}'", self.request.method, url, self.name);

        let (snapshot, failure) = match self.client.execute(&self.request) {
            Ok(response) => {
                let status = response.status;
                let failure = if response.is_success() {
                    None
                } else {
                    error!("'{}': {} answered with status {}", self.name, url, status);
                    Some(format!("status {}", status))
                };
                (response_snapshot(url, &timestamp, response), failure)
            }
            Err(e) => {
                error!("'{}': request to {} failed: {:#}", self.name, url, e);
                let snapshot = Snapshot {
                    url,
                    timestamp: &timestamp,
                    result: None,
                    detail: None,
                    msg: Some(format!("{:#}", e)),
                };
                (snapshot, Some("no response".to_string()))
            }
        };

        let json = serde_json::to_string_pretty(&snapshot).map_err(|e| SourceError::Workspace {
            path: path.clone(),
            source: e.into(),
        })?;
        fs::write(&path, json).map_err(|source| SourceError::Workspace {
            path: path.clone(),
            source,
        })?;

        Ok(match failure {
            None => {
                info!("✓ Snapshot of '{}' complete", self.name);
                Artifact::complete(&self.name, path)
            }
            Some(reason) => Artifact::degraded(&self.name, path, reason),
        })
    }
}
