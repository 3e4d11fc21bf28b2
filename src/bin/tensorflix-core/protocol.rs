//! Newline-delimited JSON request protocol.
//!
//! Each stdin line is one request tagged by `op`; each gets exactly one
//! response line: `{"ok":true,"result":...}` or `{"ok":false,"error":"..."}`.

use serde::Deserialize;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::time::Duration;
use tensorflix_core::{Clock, IntegrationCoordinator, SystemClock};

/// A single request line.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    /// Issue an attribution tag.
    CreateTag {
        submission_id: String,
        miner_id: String,
        /// Submission time; defaults to now.
        #[serde(default)]
        timestamp: Option<f64>,
    },
    /// Verify a post and collect its metrics.
    ProcessPost {
        submission_id: String,
        post_id: String,
        platform: String,
        /// Time the post is expected around; defaults to now.
        #[serde(default)]
        reference_time: Option<f64>,
    },
    /// Copy a file into artifact storage.
    StoreArtifact {
        path: PathBuf,
        #[serde(default)]
        name: Option<String>,
    },
    /// Run storage and tag maintenance.
    Maintenance { max_age_secs: u64 },
}

/// Parse and execute one request line.
pub async fn handle_line(coordinator: &IntegrationCoordinator, line: &str) -> Value {
    let request = match serde_json::from_str::<Request>(line) {
        Ok(request) => request,
        Err(e) => return failure(format!("bad request: {e}")),
    };
    match execute(coordinator, request).await {
        Ok(result) => json!({ "ok": true, "result": result }),
        Err(e) => failure(e.to_string()),
    }
}

async fn execute(
    coordinator: &IntegrationCoordinator,
    request: Request,
) -> tensorflix_core::Result<Value> {
    let now = || SystemClock.now();
    let value = match request {
        Request::CreateTag {
            submission_id,
            miner_id,
            timestamp,
        } => {
            let tag = coordinator.create_tag(
                &submission_id,
                &miner_id,
                timestamp.unwrap_or_else(now),
            )?;
            json!({ "tag": tag })
        }
        Request::ProcessPost {
            submission_id,
            post_id,
            platform,
            reference_time,
        } => {
            let outcome = coordinator
                .process_post(
                    &submission_id,
                    &post_id,
                    &platform,
                    reference_time.unwrap_or_else(now),
                )
                .await?;
            to_value(&outcome)?
        }
        Request::StoreArtifact { path, name } => {
            let stored = coordinator.store_artifact(&path, name.as_deref())?;
            json!({ "path": stored })
        }
        Request::Maintenance { max_age_secs } => {
            let report = coordinator.run_maintenance(Duration::from_secs(max_age_secs))?;
            to_value(&report)?
        }
    };
    Ok(value)
}

fn to_value<T: serde::Serialize>(value: &T) -> tensorflix_core::Result<Value> {
    serde_json::to_value(value).map_err(|e| tensorflix_core::Error::Invalid(e.to_string()))
}

fn failure(message: String) -> Value {
    json!({ "ok": false, "error": message })
}
