// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Entity records and their wire payload types
//!
//! Records are what the local store persists; payloads are what the API
//! returns. Every payload field is optional and `Payload::apply` copies only
//! the present fields onto a record, which is the partial-update merge rule
//! for the whole system.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Deserializer, Serialize};
use sha2::{Digest, Sha256};

use crate::status::{ActionStatus, BuildStatus};

/// Hash used inside derived action identifiers. Truncated so the composite
/// id stays readable in logs and URLs.
pub fn name_hash(name: &str) -> String {
    let digest = Sha256::digest(name.as_bytes());
    hex::encode(&digest[..16])
}

fn apply<T: Clone>(target: &mut T, source: &Option<T>) {
    if let Some(value) = source {
        *target = value.clone();
    }
}

fn apply_opt<T: Clone>(target: &mut Option<T>, source: &Option<T>) {
    if source.is_some() {
        *target = source.clone();
    }
}

// Statuses arrive as free-form strings and occasionally grow new values on
// the server side; an unknown value must degrade to "no status" instead of
// failing the whole payload.
fn lenient_build_status<'de, D: Deserializer<'de>>(
    de: D,
) -> Result<Option<BuildStatus>, D::Error> {
    let raw: Option<String> = Option::deserialize(de)?;
    Ok(raw.and_then(|s| BuildStatus::from_str(&s).ok()))
}

fn lenient_action_status<'de, D: Deserializer<'de>>(
    de: D,
) -> Result<Option<ActionStatus>, D::Error> {
    let raw: Option<String> = Option::deserialize(de)?;
    Ok(raw.and_then(|s| ActionStatus::from_str(&s).ok()))
}

/// Authenticated user, returned by `GET /me`. Only fetched to validate an
/// API token, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// A followed repository
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// `username/reponame`
    pub id: String,
    pub username: String,
    pub reponame: String,
    pub vcs_url: Option<String>,
    pub parallel: Option<u32>,
}

/// Wire shape for a project, as returned by `GET /projects`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectPayload {
    pub username: Option<String>,
    pub reponame: Option<String>,
    pub vcs_url: Option<String>,
    pub parallel: Option<u32>,
    /// Branch name -> array of build summaries. Only the keys matter here;
    /// the summaries are refetched per branch when needed.
    #[serde(default)]
    pub branches: Option<BTreeMap<String, serde_json::Value>>,
}

impl ProjectPayload {
    /// Primary key derived from the payload, if it carries enough identity.
    pub fn id(&self) -> Option<String> {
        match (&self.username, &self.reponame) {
            (Some(user), Some(repo)) => Some(format!("{user}/{repo}")),
            _ => None,
        }
    }

    pub fn apply(&self, record: &mut Project) {
        if let Some(id) = self.id() {
            record.id = id;
        }
        apply(&mut record.username, &self.username);
        apply(&mut record.reponame, &self.reponame);
        apply_opt(&mut record.vcs_url, &self.vcs_url);
        apply_opt(&mut record.parallel, &self.parallel);
    }

    /// Derive one [`Branch`] per key of the `branches` map. Branch names are
    /// percent-encoded on the wire; the display name is decoded while the
    /// composite id keeps the encoded form so it stays stable across imports.
    pub fn derived_branches(&self) -> Vec<Branch> {
        let (Some(branches), Some(vcs_url)) = (&self.branches, &self.vcs_url) else {
            return Vec::new();
        };
        branches
            .keys()
            .map(|raw| Branch {
                id: Branch::composite_id(vcs_url, raw),
                name: decode_branch_name(raw),
                project_id: self.id().unwrap_or_default(),
            })
            .collect()
    }
}

/// Percent-decode a branch name as it appears in the `branches` map keys.
/// Invalid encodings fall back to the raw text.
pub fn decode_branch_name(raw: &str) -> String {
    percent_decode_str(raw)
        .decode_utf8()
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}

// The characters the server leaves unencoded in `branches` map keys:
// alphanumerics plus `encodeURIComponent`'s unreserved marks.
const BRANCH_NAME: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Percent-encode a branch name the way the `branches` map keys are encoded.
pub fn encode_branch_name(name: &str) -> String {
    utf8_percent_encode(name, BRANCH_NAME).to_string()
}

/// A branch of a project
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    /// `vcsURL#branchName`, with the percent-encoded branch name
    pub id: String,
    pub name: String,
    pub project_id: String,
}

impl Branch {
    /// Composite id `vcsURL#branchName`. The branch name is canonicalized to
    /// its percent-encoded form, so the same branch yields the same id
    /// whether the name came from an encoded `branches` map key or a decoded
    /// `branch` field of a build.
    pub fn composite_id(vcs_url: &str, name: &str) -> String {
        format!("{vcs_url}#{}", encode_branch_name(&decode_branch_name(name)))
    }
}

/// One pipeline execution
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Build {
    /// `vcsURL#buildNum`; v1 has no server-side string id for builds
    pub id: String,
    pub build_num: u64,
    pub status: Option<BuildStatus>,
    pub branch: Option<String>,
    pub vcs_url: Option<String>,
    pub subject: Option<String>,
    pub build_url: Option<String>,
    pub why: Option<String>,
    pub queued_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub stopped_at: Option<DateTime<Utc>>,
}

impl Build {
    pub fn composite_id(vcs_url: &str, build_num: u64) -> String {
        format!("{vcs_url}#{build_num}")
    }

    /// Branch id this build belongs to, when both parts are known.
    pub fn branch_id(&self) -> Option<String> {
        match (&self.vcs_url, &self.branch) {
            (Some(vcs_url), Some(branch)) => Some(Branch::composite_id(vcs_url, branch)),
            _ => None,
        }
    }
}

/// Wire shape for a build, both the summary rows of
/// `GET /project/:user/:repo` and the detail of `GET /project/:user/:repo/:num`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BuildPayload {
    pub build_num: Option<u64>,
    #[serde(default, deserialize_with = "lenient_build_status")]
    pub status: Option<BuildStatus>,
    pub branch: Option<String>,
    pub vcs_url: Option<String>,
    pub subject: Option<String>,
    pub build_url: Option<String>,
    pub why: Option<String>,
    pub queued_at: Option<DateTime<Utc>>,
    #[serde(rename = "start_time")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(rename = "stop_time")]
    pub stopped_at: Option<DateTime<Utc>>,
    /// Present only in the build detail response
    #[serde(default)]
    pub steps: Vec<BuildStepPayload>,
}

impl BuildPayload {
    pub fn id(&self) -> Option<String> {
        match (&self.vcs_url, self.build_num) {
            (Some(vcs_url), Some(num)) => Some(Build::composite_id(vcs_url, num)),
            _ => None,
        }
    }

    pub fn apply(&self, record: &mut Build) {
        if let Some(id) = self.id() {
            record.id = id;
        }
        if let Some(num) = self.build_num {
            record.build_num = num;
        }
        apply_opt(&mut record.status, &self.status);
        apply_opt(&mut record.branch, &self.branch);
        apply_opt(&mut record.vcs_url, &self.vcs_url);
        apply_opt(&mut record.subject, &self.subject);
        apply_opt(&mut record.build_url, &self.build_url);
        apply_opt(&mut record.why, &self.why);
        apply_opt(&mut record.queued_at, &self.queued_at);
        apply_opt(&mut record.started_at, &self.started_at);
        apply_opt(&mut record.stopped_at, &self.stopped_at);
    }
}

/// An ordered step within a build
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStep {
    /// `buildId.stepIndex`
    pub id: String,
    pub build_id: String,
    pub name: String,
    pub index: u32,
}

impl BuildStep {
    pub fn composite_id(build_id: &str, index: u32) -> String {
        format!("{build_id}.{index}")
    }
}

/// Wire shape for one entry of a build detail's `steps` array
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BuildStepPayload {
    pub name: Option<String>,
    #[serde(default)]
    pub actions: Vec<BuildActionPayload>,
}

impl BuildStepPayload {
    /// Step index as reported by the actions themselves, falling back to the
    /// position in the `steps` array.
    pub fn index(&self, position: usize) -> u32 {
        self.actions
            .iter()
            .find_map(|a| a.step)
            .unwrap_or(position as u32)
    }

    pub fn apply(&self, record: &mut BuildStep) {
        apply(&mut record.name, &self.name);
    }
}

/// One per-executor action within a step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildAction {
    /// `stepId@actionType:hash(name):nodeIndex`, assigned lazily by
    /// [`BuildAction::ensure_id`]
    pub id: String,
    pub step_id: String,
    pub name: String,
    pub action_type: String,
    pub status: Option<ActionStatus>,
    pub bash_command: Option<String>,
    pub exit_code: Option<i64>,
    pub node_index: u32,
    pub step: u32,
    pub parallel: bool,
    pub failed: bool,
    pub infrastructure_fail: bool,
    pub timedout: bool,
    pub canceled: bool,
    pub truncated: bool,
    pub is_continue: bool,
    pub has_output: bool,
    pub run_time_millis: Option<u64>,
    pub output_url: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl BuildAction {
    /// Assign the derived id on first need. A no-op once set or while the
    /// owning step is still unknown.
    pub fn ensure_id(&mut self, step_id: &str) {
        if self.id.is_empty() && !step_id.is_empty() {
            self.step_id = step_id.to_string();
            self.id = format!(
                "{step_id}@{}:{}:{}",
                self.action_type,
                name_hash(&self.name),
                self.node_index
            );
        }
    }
}

/// Wire shape for one entry of a step's `actions` array
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BuildActionPayload {
    pub truncated: Option<bool>,
    /// Executor node index
    pub index: Option<u32>,
    pub parallel: Option<bool>,
    pub failed: Option<bool>,
    pub infrastructure_fail: Option<bool>,
    pub name: Option<String>,
    pub bash_command: Option<String>,
    #[serde(default, deserialize_with = "lenient_action_status")]
    pub status: Option<ActionStatus>,
    pub timedout: Option<bool>,
    #[serde(rename = "continue")]
    pub is_continue: Option<bool>,
    #[serde(rename = "type")]
    pub action_type: Option<String>,
    pub output_url: Option<String>,
    pub exit_code: Option<i64>,
    pub canceled: Option<bool>,
    pub step: Option<u32>,
    pub run_time_millis: Option<u64>,
    pub has_output: Option<bool>,
    #[serde(rename = "end_time")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(rename = "start_time")]
    pub started_at: Option<DateTime<Utc>>,
}

impl BuildActionPayload {
    pub fn apply(&self, record: &mut BuildAction) {
        apply(&mut record.name, &self.name);
        apply(&mut record.action_type, &self.action_type);
        apply_opt(&mut record.status, &self.status);
        apply_opt(&mut record.bash_command, &self.bash_command);
        apply_opt(&mut record.exit_code, &self.exit_code);
        if let Some(index) = self.index {
            record.node_index = index;
        }
        if let Some(step) = self.step {
            record.step = step;
        }
        apply(&mut record.parallel, &self.parallel);
        apply(&mut record.failed, &self.failed);
        apply(&mut record.infrastructure_fail, &self.infrastructure_fail);
        apply(&mut record.timedout, &self.timedout);
        apply(&mut record.canceled, &self.canceled);
        apply(&mut record.truncated, &self.truncated);
        apply(&mut record.is_continue, &self.is_continue);
        apply(&mut record.has_output, &self.has_output);
        apply_opt(&mut record.run_time_millis, &self.run_time_millis);
        apply_opt(&mut record.output_url, &self.output_url);
        apply_opt(&mut record.started_at, &self.started_at);
        apply_opt(&mut record.ended_at, &self.ended_at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_payload_derives_branches_from_keys() {
        let payload: ProjectPayload = serde_json::from_str(
            r#"{
                "username": "octocat",
                "reponame": "hello",
                "vcs_url": "https://github.com/octocat/hello",
                "branches": {
                    "master": [],
                    "feature%2Flogin": [{"status": "success"}]
                }
            }"#,
        )
        .unwrap();

        let branches = payload.derived_branches();
        assert_eq!(branches.len(), 2);
        let feature = branches
            .iter()
            .find(|b| b.name == "feature/login")
            .expect("percent-decoded name");
        assert_eq!(
            feature.id,
            "https://github.com/octocat/hello#feature%2Flogin"
        );
        assert_eq!(feature.project_id, "octocat/hello");
    }

    #[test]
    fn branch_ids_agree_between_encoded_keys_and_decoded_fields() {
        let vcs_url = "https://github.com/octocat/hello";
        // The `branches` map key arrives encoded; a build's `branch` field
        // arrives decoded. Both must land on the same id.
        let from_key = Branch::composite_id(vcs_url, "feature%2Flogin");
        let from_field = Branch::composite_id(vcs_url, "feature/login");
        assert_eq!(from_key, from_field);
        assert_eq!(from_key, "https://github.com/octocat/hello#feature%2Flogin");

        let payload: BuildPayload = serde_json::from_str(
            r#"{
                "build_num": 1,
                "vcs_url": "https://github.com/octocat/hello",
                "branch": "feature/login"
            }"#,
        )
        .unwrap();
        let mut record = Build::default();
        payload.apply(&mut record);
        assert_eq!(record.branch_id().as_deref(), Some(from_key.as_str()));
    }

    #[test]
    fn action_payload_missing_status_keeps_previous_value() {
        let mut record = BuildAction {
            status: Some(ActionStatus::Running),
            exit_code: Some(0),
            ..Default::default()
        };

        let payload: BuildActionPayload =
            serde_json::from_str(r#"{"name": "bundle install", "exit_code": 1}"#).unwrap();
        payload.apply(&mut record);

        assert_eq!(record.status, Some(ActionStatus::Running));
        assert_eq!(record.exit_code, Some(1));
        assert_eq!(record.name, "bundle install");
    }

    #[test]
    fn action_payload_maps_reserved_words() {
        let payload: BuildActionPayload = serde_json::from_str(
            r#"{"continue": true, "type": "test", "index": 3, "step": 7}"#,
        )
        .unwrap();
        assert_eq!(payload.is_continue, Some(true));
        assert_eq!(payload.action_type.as_deref(), Some("test"));
        assert_eq!(payload.index, Some(3));
        assert_eq!(payload.step, Some(7));
    }

    #[test]
    fn unknown_status_degrades_to_none() {
        let payload: BuildActionPayload =
            serde_json::from_str(r#"{"status": "brand_new_state"}"#).unwrap();
        assert_eq!(payload.status, None);

        let payload: BuildPayload =
            serde_json::from_str(r#"{"status": "brand_new_state"}"#).unwrap();
        assert_eq!(payload.status, None);
    }

    #[test]
    fn ensure_id_is_lazy_and_stable() {
        let mut action = BuildAction {
            name: "cargo test".to_string(),
            action_type: "test".to_string(),
            node_index: 2,
            ..Default::default()
        };

        action.ensure_id("");
        assert!(action.id.is_empty());

        action.ensure_id("build-1.4");
        let first = action.id.clone();
        assert!(first.starts_with("build-1.4@test:"));
        assert!(first.ends_with(":2"));

        // Second call must not rewrite the id.
        action.ensure_id("build-9.9");
        assert_eq!(action.id, first);
    }

    #[test]
    fn build_timestamps_parse_wire_names() {
        let payload: BuildPayload = serde_json::from_str(
            r#"{
                "build_num": 42,
                "vcs_url": "https://github.com/octocat/hello",
                "queued_at": "2016-01-01T10:00:00Z",
                "start_time": "2016-01-01T10:00:05Z",
                "stop_time": "2016-01-01T10:03:00Z",
                "status": "success"
            }"#,
        )
        .unwrap();

        let mut record = Build::default();
        payload.apply(&mut record);
        assert_eq!(record.id, "https://github.com/octocat/hello#42");
        assert_eq!(record.status, Some(BuildStatus::Success));
        assert!(record.queued_at < record.started_at);
        assert!(record.started_at < record.stopped_at);
    }
}
