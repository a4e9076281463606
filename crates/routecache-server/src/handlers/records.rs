//! Demo resource: JSON records kept in memory.
//!
//! Reads go through the cache subscriber middleware; writes go through the
//! publisher, which also invalidates the collection.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::instrument;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub data: Value,
}

/// In-memory record table. Counts handler reads so cache hits are observable.
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    records: Arc<RwLock<BTreeMap<String, Value>>>,
    reads: Arc<AtomicU64>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn list(&self) -> Vec<Record> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.records
            .read()
            .iter()
            .map(|(id, data)| Record {
                id: id.clone(),
                data: data.clone(),
            })
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<Record> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.records.read().get(id).map(|data| Record {
            id: id.to_string(),
            data: data.clone(),
        })
    }

    /// Inserts or replaces a record. Returns true if it already existed.
    pub fn upsert(&self, id: &str, data: Value) -> bool {
        self.records.write().insert(id.to_string(), data).is_some()
    }

    pub fn remove(&self, id: &str) -> bool {
        self.records.write().remove(id).is_some()
    }

    /// Number of reads served by the table itself.
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }
}

/// GET /records
pub async fn list_records(State(state): State<AppState>) -> Json<Vec<Record>> {
    Json(state.records().list())
}

/// GET /records/{id}
#[instrument(skip_all, fields(id = %id))]
pub async fn get_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Record>, AppError> {
    state
        .records()
        .get(&id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Record '{}'", id)))
}

/// PUT /records/{id}
#[instrument(skip_all, fields(id = %id))]
pub async fn put_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(data): Json<Value>,
) -> (StatusCode, Json<Record>) {
    let existed = state.records().upsert(&id, data.clone());
    let status = if existed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };

    (status, Json(Record { id, data }))
}

/// DELETE /records/{id}
#[instrument(skip_all, fields(id = %id))]
pub async fn delete_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if state.records().remove(&id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Record '{}'", id)))
    }
}
