// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Terminal color schemes and ANSI log colorization
//!
//! Two halves that the log view glues together:
//!
//! - [`scheme`]: named color palettes (iTerm-style component tables shipped
//!   as TOML resources) resolved through an explicit, caching
//!   [`scheme::SchemeResolver`], with semantic accessors and the fixed
//!   status-badge color tables.
//! - [`colorize`]: an SGR escape-code interpreter turning raw build output
//!   into styled runs of text against a resolved palette.

pub mod badge;
pub mod colorize;
pub mod scheme;

pub use badge::{action_badge, build_badge, BadgeColor};
pub use colorize::{colorize, Palette, Span, StyledText, TextStyle};
pub use scheme::{Color, ColorScheme, SchemeError, SchemeResolver};
