// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Status badge color tables
//!
//! Fixed mappings from build/action lifecycle states to one of five badge
//! colors. Kept as standalone tables so every call site renders the same
//! color for the same state.

use cci_api_contract::{ActionStatus, BuildStatus};

/// The five colors a status badge can take. Resolved to concrete RGB values
/// by [`crate::scheme::ColorScheme::badge_color`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BadgeColor {
    Green,
    Blue,
    Red,
    Yellow,
    Gray,
}

/// Badge color for a build. A missing status renders gray.
pub fn build_badge(status: Option<BuildStatus>) -> BadgeColor {
    match status {
        Some(BuildStatus::Success) | Some(BuildStatus::Fixed) => BadgeColor::Green,
        Some(BuildStatus::Running) => BadgeColor::Blue,
        Some(BuildStatus::Failed)
        | Some(BuildStatus::Timedout)
        | Some(BuildStatus::InfrastructureFail) => BadgeColor::Red,
        _ => BadgeColor::Gray,
    }
}

/// Badge color for a step action. A missing status renders gray.
pub fn action_badge(status: Option<ActionStatus>) -> BadgeColor {
    match status {
        Some(ActionStatus::Success) => BadgeColor::Green,
        Some(ActionStatus::Running) => BadgeColor::Yellow,
        Some(ActionStatus::Failed) | Some(ActionStatus::Timedout) => BadgeColor::Red,
        _ => BadgeColor::Gray,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_badge_table_is_exhaustive_and_fixed() {
        use BuildStatus::*;
        for status in BuildStatus::ALL {
            let expected = match status {
                Success | Fixed => BadgeColor::Green,
                Running => BadgeColor::Blue,
                Failed | Timedout | InfrastructureFail => BadgeColor::Red,
                Queued | Scheduled | NoTests | Canceled | NotRun => BadgeColor::Gray,
            };
            assert_eq!(build_badge(Some(status)), expected, "status {status}");
        }
        assert_eq!(build_badge(None), BadgeColor::Gray);
    }

    #[test]
    fn action_badge_table_is_exhaustive_and_fixed() {
        use ActionStatus::*;
        for status in ActionStatus::ALL {
            let expected = match status {
                Success => BadgeColor::Green,
                Running => BadgeColor::Yellow,
                Failed | Timedout => BadgeColor::Red,
                Canceled => BadgeColor::Gray,
            };
            assert_eq!(action_badge(Some(status)), expected, "status {status}");
        }
        assert_eq!(action_badge(None), BadgeColor::Gray);
    }
}
