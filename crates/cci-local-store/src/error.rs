// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Store error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to encode or decode a stored record: {0}")]
    Record(#[from] serde_json::Error),

    #[error("payload is missing the fields required to identify the entity")]
    MissingIdentity,

    #[error("no {kind} with id '{id}'")]
    NotFound { kind: &'static str, id: String },
}

pub type StoreResult<T> = Result<T, StoreError>;
