// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Import semantics: upsert-by-id, partial payloads, relation replacement.

use cci_api_contract::{ActionStatus, BuildPayload, ProjectPayload};
use cci_local_store::{EntityKind, Store};

fn project_payload(branches: &[&str]) -> ProjectPayload {
    let branch_map: String = branches
        .iter()
        .map(|name| format!("\"{name}\": []"))
        .collect::<Vec<_>>()
        .join(", ");
    serde_json::from_str(&format!(
        r#"{{
            "username": "octocat",
            "reponame": "hello",
            "vcs_url": "https://github.com/octocat/hello",
            "parallel": 2,
            "branches": {{ {branch_map} }}
        }}"#
    ))
    .unwrap()
}

#[test]
fn reimport_replaces_the_branch_relation_exactly() {
    let store = Store::open_in_memory().unwrap();

    let first = project_payload(&["a", "b"]);
    let project = store.import_project(&first).unwrap();
    store.import_project_branches(&first).unwrap();

    let names: Vec<String> = store
        .project_branches(&project.id)
        .unwrap()
        .into_iter()
        .map(|b| b.name)
        .collect();
    assert_eq!(names, ["a", "b"]);

    let b_id_before = store
        .project_branches(&project.id)
        .unwrap()
        .into_iter()
        .find(|b| b.name == "b")
        .unwrap()
        .id;

    let second = project_payload(&["b", "c"]);
    store.import_project_branches(&second).unwrap();

    let branches = store.project_branches(&project.id).unwrap();
    let names: Vec<&str> = branches.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(names, ["b", "c"], "relation is exactly the new payload's set");

    let b_id_after = branches.iter().find(|b| b.name == "b").unwrap().id.clone();
    assert_eq!(b_id_before, b_id_after, "identity stable across re-import");
}

#[test]
fn builds_on_encoded_branches_are_found_by_branch_id() {
    let store = Store::open_in_memory().unwrap();

    let project = project_payload(&["feature%2Flogin"]);
    store.import_project(&project).unwrap();
    let branches = store.import_project_branches(&project).unwrap();
    let branch = &branches[0];
    assert_eq!(branch.name, "feature/login");

    // The build payload carries the branch name decoded, the way the API
    // delivers it.
    let payload: BuildPayload = serde_json::from_str(
        r#"{
            "build_num": 3,
            "vcs_url": "https://github.com/octocat/hello",
            "branch": "feature/login",
            "status": "success"
        }"#,
    )
    .unwrap();
    store.import_build(&payload).unwrap();

    let builds = store.branch_builds(&branch.id).unwrap();
    assert_eq!(builds.len(), 1);
    assert_eq!(builds[0].build_num, 3);
}

#[test]
fn partial_build_payload_keeps_unmentioned_fields() {
    let store = Store::open_in_memory().unwrap();

    let full: BuildPayload = serde_json::from_str(
        r#"{
            "build_num": 7,
            "vcs_url": "https://github.com/octocat/hello",
            "branch": "master",
            "subject": "fix the thing",
            "status": "running"
        }"#,
    )
    .unwrap();
    let build = store.import_build(&full).unwrap();
    assert_eq!(build.subject.as_deref(), Some("fix the thing"));

    // The status-only refresh must not blank out the subject.
    let partial: BuildPayload = serde_json::from_str(
        r#"{
            "build_num": 7,
            "vcs_url": "https://github.com/octocat/hello",
            "status": "success"
        }"#,
    )
    .unwrap();
    let refreshed = store.import_build(&partial).unwrap();
    assert_eq!(refreshed.id, build.id);
    assert_eq!(refreshed.subject.as_deref(), Some("fix the thing"));
    assert_eq!(refreshed.status.unwrap().as_str(), "success");
}

fn build_detail_json() -> &'static str {
    r#"{
        "build_num": 7,
        "vcs_url": "https://github.com/octocat/hello",
        "branch": "master",
        "status": "failed",
        "steps": [
            {
                "name": "checkout",
                "actions": [
                    {"name": "checkout", "type": "checkout", "index": 0, "step": 0,
                     "status": "success", "exit_code": 0, "has_output": true}
                ]
            },
            {
                "name": "test",
                "actions": [
                    {"name": "cargo test", "type": "test", "index": 1, "step": 1,
                     "status": "failed", "exit_code": 101},
                    {"name": "cargo test", "type": "test", "index": 0, "step": 1,
                     "status": "success", "exit_code": 0}
                ]
            }
        ]
    }"#
}

#[test]
fn build_detail_imports_steps_and_actions_in_index_order() {
    let store = Store::open_in_memory().unwrap();
    let payload: BuildPayload = serde_json::from_str(build_detail_json()).unwrap();
    let build = store.import_build(&payload).unwrap();

    let steps = store.build_steps(&build.id).unwrap();
    assert_eq!(steps.len(), 2);
    assert_eq!(steps[0].name, "checkout");
    assert_eq!(steps[1].name, "test");
    assert!(steps[0].index < steps[1].index);

    // Actions come back ordered by node index, not payload order.
    let actions = store.step_actions(&steps[1].id).unwrap();
    assert_eq!(actions.len(), 2);
    assert_eq!(actions[0].node_index, 0);
    assert_eq!(actions[1].node_index, 1);
    assert_eq!(actions[0].status, Some(ActionStatus::Success));
    assert_eq!(actions[1].status, Some(ActionStatus::Failed));

    for action in &actions {
        assert!(action.id.starts_with(&steps[1].id), "derived id keyed by step");
    }
}

#[test]
fn reimporting_a_build_detail_lands_on_the_same_action_rows() {
    let store = Store::open_in_memory().unwrap();
    let payload: BuildPayload = serde_json::from_str(build_detail_json()).unwrap();

    let build = store.import_build(&payload).unwrap();
    let steps = store.build_steps(&build.id).unwrap();
    let before: Vec<String> = store
        .step_actions(&steps[1].id)
        .unwrap()
        .into_iter()
        .map(|a| a.id)
        .collect();

    store.import_build(&payload).unwrap();
    let after: Vec<String> = store
        .step_actions(&steps[1].id)
        .unwrap()
        .into_iter()
        .map(|a| a.id)
        .collect();
    assert_eq!(before, after);
}

#[test]
fn imports_announce_entity_updates() {
    let store = Store::open_in_memory().unwrap();
    let mut events = store.subscribe();

    let payload = project_payload(&["main"]);
    store.import_project(&payload).unwrap();

    let event = events.try_recv().unwrap();
    assert_eq!(event.kind, EntityKind::Project);
    assert_eq!(event.id, "octocat/hello");
}

#[test]
fn store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.db");

    {
        let store = Store::open(&path).unwrap();
        let payload = project_payload(&["main"]);
        store.import_project(&payload).unwrap();
        store.import_project_branches(&payload).unwrap();
    }

    let store = Store::open(&path).unwrap();
    let projects = store.projects().unwrap();
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0].parallel, Some(2));
    assert_eq!(store.project_branches(&projects[0].id).unwrap().len(), 1);
}
