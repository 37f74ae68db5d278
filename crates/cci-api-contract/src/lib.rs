// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! CircleCI API v1 contract types and JSON mapping
//!
//! This crate defines the entity records mirrored from the CircleCI v1 API
//! (projects, branches, builds, build steps, per-executor actions) together
//! with the wire payload types that map onto them. These types are shared
//! between the REST client and the local store.
//!
//! Payload types declare every mapped JSON field explicitly; applying a
//! payload to a record overwrites only the fields present in the payload, so
//! partial server responses never reset previously-imported data.

pub mod error;
pub mod status;
pub mod types;

pub use error::*;
pub use status::*;
pub use types::*;
