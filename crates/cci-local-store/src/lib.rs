// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! SQLite-backed local cache of CircleCI entities
//!
//! The store mirrors server-side entities for offline display. The only
//! consistency guarantee is upsert-by-identifier: importing a payload finds
//! the record by primary key (or creates it) and overwrites the fields the
//! payload carries. There is no multi-entity atomicity, no conflict
//! detection, and no explicit deletion; imported records accumulate and
//! staleness is tolerated for this read-mostly display cache.
//!
//! Display ordering follows the entities' index fields (step index, node
//! index, build number), never insertion order.

pub mod error;
pub mod store;

mod schema;

pub use error::*;
pub use store::*;
