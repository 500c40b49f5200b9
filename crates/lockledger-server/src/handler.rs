use axum::extract::{Path, Query, State};
use axum::response::Json;
use lockledger_core::{ContainerBatch, LedgerError, LedgerResult, SingleEntryOutcome};
use lockledger_types::{validate_container_name, Generation, LEDGER_OBJECT_SUFFIX};

use crate::api::{
    into_edits, BatchResponse, ContainerResult, ExistsQuery, ExistsResponse, FileUpdate,
    FilesPage, FilesQuery, HealthResponse, InfoResponse, MultiBatchRequest, MultiBatchResponse,
    ReconcileResponse, VersionQuery,
};
use crate::error::{ServerError, ServerResult};
use crate::query;
use crate::state::AppState;

/// Run a blocking core call on the blocking pool.
async fn blocking<T, F>(work: F) -> ServerResult<T>
where
    F: FnOnce() -> LedgerResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))?
        .map_err(ServerError::from)
}

/// Health check handler.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}

/// Info handler.
pub async fn info_handler(State(state): State<AppState>) -> Json<InfoResponse> {
    Json(InfoResponse {
        name: "lockledger-server".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        grace_window_secs: state.store.config().grace_window.num_seconds(),
        ledger_suffix: LEDGER_OBJECT_SUFFIX.into(),
    })
}

/// List one page of a container's ledger, bootstrapping it on first access.
pub async fn list_files(
    State(state): State<AppState>,
    Path(container): Path<String>,
    Query(params): Query<FilesQuery>,
) -> ServerResult<Json<FilesPage>> {
    let store = state.store.clone();
    let ledger = blocking(move || store.bootstrap_or_load(&container)).await?;

    let (page, size) = state.limits.resolve(params.page, params.limit);
    let hits = query::search(&ledger.entries, &params.query, page, size);
    Ok(Json(FilesPage {
        files: hits.items,
        page: hits.page,
        size: hits.size,
        total: hits.total,
        pages: hits.pages,
        version: ledger.version,
    }))
}

/// Apply a batch of edits to one container.
pub async fn update_files(
    State(state): State<AppState>,
    Path(container): Path<String>,
    Query(VersionQuery { version }): Query<VersionQuery>,
    Json(updates): Json<Vec<FileUpdate>>,
) -> ServerResult<Json<BatchResponse>> {
    let edits = into_edits(updates)?;
    let updater = state.updater.clone();
    let report = blocking(move || {
        updater.batch_update(&container, Generation::new(version), &edits)
    })
    .await?;
    Ok(Json(report.into()))
}

/// Apply batches to several containers; each succeeds or fails on its own.
pub async fn update_all(
    State(state): State<AppState>,
    Json(request): Json<MultiBatchRequest>,
) -> ServerResult<Json<MultiBatchResponse>> {
    // Rejected containers fill their slot now; the rest are filled from the
    // batch outcomes, which come back in submission order.
    let mut slots = Vec::with_capacity(request.containers.len());
    let mut batches = Vec::new();
    for update in request.containers {
        match into_edits(update.files) {
            Ok(edits) => {
                batches.push(ContainerBatch {
                    container: update.container,
                    expected: Generation::new(update.version),
                    edits,
                });
                slots.push(None);
            }
            Err(err) => slots.push(Some(ContainerResult::rejected(
                update.container,
                err.to_string(),
            ))),
        }
    }

    let updater = state.updater.clone();
    let outcomes = tokio::task::spawn_blocking(move || updater.batch_update_many(batches))
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))?;
    let mut outcomes = outcomes.into_iter().map(ContainerResult::from);
    let results = slots
        .into_iter()
        .filter_map(|slot| slot.or_else(|| outcomes.next()))
        .collect();
    Ok(Json(MultiBatchResponse { results }))
}

/// Re-read one object and bring its ledger entry up to date.
pub async fn reconcile_file(
    State(state): State<AppState>,
    Path((container, name)): Path<(String, String)>,
) -> ServerResult<Json<ReconcileResponse>> {
    let store = state.store.clone();
    let filename = name.clone();
    let outcome = blocking(move || store.update_single_entry(&container, &name)).await?;
    let entry = match outcome {
        SingleEntryOutcome::Locked(entry) => Some(entry),
        SingleEntryOutcome::Removed => None,
    };
    Ok(Json(ReconcileResponse {
        filename,
        locked: entry.is_some(),
        entry,
    }))
}

/// Check whether an object exists in a container.
pub async fn file_exists(
    State(state): State<AppState>,
    Path(container): Path<String>,
    Query(ExistsQuery { filename }): Query<ExistsQuery>,
) -> ServerResult<Json<ExistsResponse>> {
    let store = state.store.clone();
    let exists = blocking(move || {
        validate_container_name(&container)?;
        store
            .accessor()
            .exists(&container, &filename)
            .map_err(|e| LedgerError::from_store(&container, e))
    })
    .await?;
    Ok(Json(ExistsResponse { exists }))
}
