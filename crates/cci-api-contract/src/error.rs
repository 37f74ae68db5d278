// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Error types for contract parsing

use thiserror::Error;

/// Errors that can occur while parsing contract values
#[derive(Debug, Error)]
pub enum ApiContractError {
    #[error("invalid build status: {0}")]
    InvalidBuildStatus(String),

    #[error("invalid action status: {0}")]
    InvalidActionStatus(String),
}
