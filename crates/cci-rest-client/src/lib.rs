// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! REST client for the CircleCI API v1
//!
//! Provides [`CircleClient`], a thin authenticated wrapper over the v1
//! JSON endpoints. The API token travels as a `circle-token` query
//! parameter (not a header), so every outgoing URL is rebuilt through one
//! attach-auth step that guarantees the token appears exactly once.
//!
//! All calls are plain async request/response; any in-flight call can be
//! torn down through a [`CancelHandle`]. The [`download`] module streams a
//! log file to disk while reporting progress.

pub mod cancel;
pub mod client;
pub mod download;
pub mod error;

pub use cancel::*;
pub use client::*;
pub use download::*;
pub use error::*;
