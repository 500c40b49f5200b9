//! Request and response bodies of the HTTP API.

use std::collections::BTreeMap;

use lockledger_core::{BatchReport, ContainerOutcome, LedgerError, LockStatus, ObjectEdit};
use lockledger_types::{parse_timestamp, Generation, LockEntry, TypeError};
use serde::{Deserialize, Serialize};

/// API route paths.
pub mod endpoints {
    pub const HEALTH: &str = "/v1/health";
    pub const INFO: &str = "/v1/info";
    pub const FILES: &str = "/v1/containers/:container/files";
    pub const ALL_FILES: &str = "/v1/files";
    pub const RECONCILE: &str = "/v1/containers/:container/files/:name/reconcile";
    pub const EXISTS: &str = "/v1/containers/:container/exists";
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".into(),
            version: env!("CARGO_PKG_VERSION").into(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InfoResponse {
    pub name: String,
    pub version: String,
    pub grace_window_secs: i64,
    pub ledger_suffix: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct FilesQuery {
    pub page: Option<usize>,
    pub limit: Option<usize>,
    #[serde(default)]
    pub query: String,
}

/// One page of ledger entries.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FilesPage {
    pub files: Vec<LockEntry>,
    pub page: usize,
    pub size: usize,
    pub total: usize,
    pub pages: usize,
    pub version: Generation,
}

#[derive(Clone, Copy, Debug, Deserialize)]
pub struct VersionQuery {
    pub version: u64,
}

/// A lock change as the front end sends it.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LockStatusBody {
    pub temporary_hold: bool,
    /// RFC 3339 timestamp or bare `YYYY-MM-DD`. Empty means "no expiry".
    #[serde(default)]
    pub hold_expiry: Option<String>,
}

/// One object edit in a batch request.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FileUpdate {
    pub filename: String,
    #[serde(default)]
    pub metadata: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub lockstatus: Option<LockStatusBody>,
}

impl FileUpdate {
    pub fn into_edit(self) -> Result<ObjectEdit, TypeError> {
        let lock_status = match self.lockstatus {
            Some(body) => {
                let hold_expiry = match body.hold_expiry.as_deref().map(str::trim) {
                    Some(value) if !value.is_empty() => Some(parse_timestamp(value)?),
                    _ => None,
                };
                Some(LockStatus {
                    temporary_hold: body.temporary_hold,
                    hold_expiry,
                })
            }
            None => None,
        };
        Ok(ObjectEdit {
            name: self.filename,
            metadata: self.metadata,
            lock_status,
        })
    }
}

pub fn into_edits(updates: Vec<FileUpdate>) -> Result<Vec<ObjectEdit>, TypeError> {
    updates.into_iter().map(FileUpdate::into_edit).collect()
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BatchResponse {
    pub message: String,
    pub updated: usize,
    pub dropped: Vec<String>,
    pub version: Generation,
    pub protected: bool,
}

impl From<BatchReport> for BatchResponse {
    fn from(report: BatchReport) -> Self {
        Self {
            message: report.message(),
            updated: report.updated,
            dropped: report.dropped,
            version: report.version,
            protected: report.protected,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct ContainerUpdate {
    pub container: String,
    pub version: u64,
    #[serde(default)]
    pub files: Vec<FileUpdate>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct MultiBatchRequest {
    pub containers: Vec<ContainerUpdate>,
}

/// Outcome for one container of a multi-container batch.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ContainerResult {
    pub container: String,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<BatchResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mutated: Vec<String>,
}

impl ContainerResult {
    pub fn failed(container: impl Into<String>, error: &LedgerError) -> Self {
        Self {
            mutated: error.mutated().to_vec(),
            ..Self::rejected(container, error.to_string())
        }
    }

    /// A container batch refused before it reached the ledger.
    pub fn rejected(container: impl Into<String>, error: String) -> Self {
        Self {
            container: container.into(),
            ok: false,
            result: None,
            error: Some(error),
            mutated: Vec::new(),
        }
    }
}

impl From<ContainerOutcome> for ContainerResult {
    fn from(outcome: ContainerOutcome) -> Self {
        match outcome.result {
            Ok(report) => Self {
                container: outcome.container,
                ok: true,
                result: Some(report.into()),
                error: None,
                mutated: Vec::new(),
            },
            Err(error) => Self::failed(outcome.container, &error),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MultiBatchResponse {
    pub results: Vec<ContainerResult>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReconcileResponse {
    pub filename: String,
    pub locked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry: Option<LockEntry>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ExistsQuery {
    pub filename: String,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ExistsResponse {
    pub exists: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn health_response_defaults() {
        let h = HealthResponse::default();
        assert_eq!(h.status, "ok");
        assert!(!h.version.is_empty());
    }

    #[test]
    fn file_update_parses_front_end_shape() {
        let update: FileUpdate = serde_json::from_str(
            r#"{"filename":"a.txt","lockstatus":{"temporary_hold":false,"hold_expiry":"2030-01-02"}}"#,
        )
        .unwrap();
        let edit = update.into_edit().unwrap();
        assert_eq!(edit.name, "a.txt");
        assert!(edit.metadata.is_none());
        let lock = edit.lock_status.unwrap();
        assert!(!lock.temporary_hold);
        assert_eq!(
            lock.hold_expiry,
            Some(Utc.with_ymd_and_hms(2030, 1, 2, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn blank_expiry_means_none() {
        let update = FileUpdate {
            filename: "a.txt".into(),
            metadata: None,
            lockstatus: Some(LockStatusBody {
                temporary_hold: true,
                hold_expiry: Some("  ".into()),
            }),
        };
        let lock = update.into_edit().unwrap().lock_status.unwrap();
        assert!(lock.hold_expiry.is_none());
    }

    #[test]
    fn bad_expiry_is_rejected() {
        let updates = vec![FileUpdate {
            filename: "a.txt".into(),
            metadata: None,
            lockstatus: Some(LockStatusBody {
                temporary_hold: true,
                hold_expiry: Some("next tuesday".into()),
            }),
        }];
        assert!(matches!(
            into_edits(updates),
            Err(TypeError::InvalidTimestamp { .. })
        ));
    }

    #[test]
    fn failed_container_result_carries_mutations() {
        let err = LedgerError::Conflict {
            container: "docs".into(),
            expected: Some(Generation::new(1)),
            found: Some(Generation::new(2)),
            object: None,
            mutated: vec!["a.txt".into()],
        };
        let result = ContainerResult::failed("docs", &err);
        assert!(!result.ok);
        assert_eq!(result.mutated, ["a.txt"]);
        let value = serde_json::to_value(&result).unwrap();
        assert!(value.get("result").is_none());
    }
}
