// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Build and action lifecycle states

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ApiContractError;

/// Lifecycle states reported for a build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildStatus {
    Queued,
    Scheduled,
    Running,
    Success,
    Failed,
    Fixed,
    Timedout,
    InfrastructureFail,
    NoTests,
    Canceled,
    NotRun,
}

impl BuildStatus {
    pub const ALL: [BuildStatus; 11] = [
        BuildStatus::Queued,
        BuildStatus::Scheduled,
        BuildStatus::Running,
        BuildStatus::Success,
        BuildStatus::Failed,
        BuildStatus::Fixed,
        BuildStatus::Timedout,
        BuildStatus::InfrastructureFail,
        BuildStatus::NoTests,
        BuildStatus::Canceled,
        BuildStatus::NotRun,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BuildStatus::Queued => "queued",
            BuildStatus::Scheduled => "scheduled",
            BuildStatus::Running => "running",
            BuildStatus::Success => "success",
            BuildStatus::Failed => "failed",
            BuildStatus::Fixed => "fixed",
            BuildStatus::Timedout => "timedout",
            BuildStatus::InfrastructureFail => "infrastructure_fail",
            BuildStatus::NoTests => "no_tests",
            BuildStatus::Canceled => "canceled",
            BuildStatus::NotRun => "not_run",
        }
    }

    /// True once the build can no longer change state on the server.
    pub fn is_finished(&self) -> bool {
        !matches!(
            self,
            BuildStatus::Queued | BuildStatus::Scheduled | BuildStatus::Running
        )
    }
}

impl fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildStatus {
    type Err = ApiContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BuildStatus::ALL
            .iter()
            .find(|v| v.as_str() == s)
            .copied()
            .ok_or_else(|| ApiContractError::InvalidBuildStatus(s.to_string()))
    }
}

/// Lifecycle states reported for a single step action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Success,
    Failed,
    Canceled,
    Timedout,
    Running,
}

impl ActionStatus {
    pub const ALL: [ActionStatus; 5] = [
        ActionStatus::Success,
        ActionStatus::Failed,
        ActionStatus::Canceled,
        ActionStatus::Timedout,
        ActionStatus::Running,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionStatus::Success => "success",
            ActionStatus::Failed => "failed",
            ActionStatus::Canceled => "canceled",
            ActionStatus::Timedout => "timedout",
            ActionStatus::Running => "running",
        }
    }
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionStatus {
    type Err = ApiContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionStatus::ALL
            .iter()
            .find(|v| v.as_str() == s)
            .copied()
            .ok_or_else(|| ApiContractError::InvalidActionStatus(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_status_round_trips_through_serde_names() {
        for status in BuildStatus::ALL {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
            let back: BuildStatus = serde_json::from_str(&json).unwrap();
            assert_eq!(back, status);
        }
    }

    #[test]
    fn multi_word_statuses_use_snake_case() {
        assert_eq!(BuildStatus::InfrastructureFail.as_str(), "infrastructure_fail");
        assert_eq!(BuildStatus::NoTests.as_str(), "no_tests");
        assert_eq!(BuildStatus::NotRun.as_str(), "not_run");
    }

    #[test]
    fn unknown_status_is_an_error() {
        assert!("exploded".parse::<BuildStatus>().is_err());
        assert!("exploded".parse::<ActionStatus>().is_err());
    }
}
