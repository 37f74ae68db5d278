// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! The store itself: imports (upsert-by-id) and display queries

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::broadcast;

use crate::error::{StoreError, StoreResult};
use crate::schema;
use cci_api_contract::{
    Branch, Build, BuildAction, BuildPayload, BuildStep, Project, ProjectPayload,
};

/// Which entity collection a [`StoreEvent`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Project,
    Branch,
    Build,
    BuildStep,
    BuildAction,
}

/// Announcement that an entity was created or updated by an import. The UI
/// layer subscribes to these to refresh its bindings.
#[derive(Debug, Clone)]
pub struct StoreEvent {
    pub kind: EntityKind,
    pub id: String,
}

/// Local entity cache. One connection guarded by a mutex; concurrent
/// imports of the same identifier are last-writer-wins.
pub struct Store {
    conn: Mutex<Connection>,
    events: broadcast::Sender<StoreEvent>,
}

impl Store {
    pub fn open(path: &Path) -> StoreResult<Self> {
        Self::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> StoreResult<Self> {
        schema::init(&conn)?;
        let (events, _) = broadcast::channel(64);
        Ok(Store {
            conn: Mutex::new(conn),
            events,
        })
    }

    /// Subscribe to entity-updated announcements.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    fn notify(&self, kind: EntityKind, id: &str) {
        // No receivers is fine; the store does not care who listens.
        let _ = self.events.send(StoreEvent {
            kind,
            id: id.to_string(),
        });
    }

    // --- imports -----------------------------------------------------------

    /// Upsert a project from its wire payload: find by id or create, then
    /// overwrite the fields the payload carries.
    pub fn import_project(&self, payload: &ProjectPayload) -> StoreResult<Project> {
        let id = payload.id().ok_or(StoreError::MissingIdentity)?;
        let conn = self.lock();

        let mut record: Project = fetch_record(&conn, "projects", &id)?.unwrap_or_default();
        payload.apply(&mut record);
        conn.execute(
            "INSERT INTO projects (id, data) VALUES (?1, ?2)
             ON CONFLICT(id) DO UPDATE SET data = excluded.data",
            params![record.id, serde_json::to_string(&record)?],
        )?;
        drop(conn);

        tracing::debug!(project = %record.id, "imported project");
        self.notify(EntityKind::Project, &record.id);
        Ok(record)
    }

    /// Upsert the branches derived from a project payload's `branches` map
    /// and replace the project's branch relation with exactly that set.
    ///
    /// A later import with a subset of branch names shrinks the project's
    /// visible branch set; the dropped `branches` rows stay in the store.
    pub fn import_project_branches(&self, payload: &ProjectPayload) -> StoreResult<Vec<Branch>> {
        let project_id = payload.id().ok_or(StoreError::MissingIdentity)?;
        let derived = payload.derived_branches();

        let conn = self.lock();
        for branch in &derived {
            let mut record: Branch =
                fetch_record(&conn, "branches", &branch.id)?.unwrap_or_default();
            record.id = branch.id.clone();
            record.name = branch.name.clone();
            record.project_id = branch.project_id.clone();
            conn.execute(
                "INSERT INTO branches (id, project_id, name, data) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO UPDATE SET
                     project_id = excluded.project_id,
                     name = excluded.name,
                     data = excluded.data",
                params![
                    record.id,
                    record.project_id,
                    record.name,
                    serde_json::to_string(&record)?
                ],
            )?;
        }

        conn.execute(
            "DELETE FROM project_branches WHERE project_id = ?1",
            params![project_id],
        )?;
        for branch in &derived {
            conn.execute(
                "INSERT OR IGNORE INTO project_branches (project_id, branch_id) VALUES (?1, ?2)",
                params![project_id, branch.id],
            )?;
        }
        drop(conn);

        tracing::debug!(
            project = %project_id,
            branches = derived.len(),
            "replaced branch relation"
        );
        for branch in &derived {
            self.notify(EntityKind::Branch, &branch.id);
        }
        self.notify(EntityKind::Project, &project_id);
        Ok(derived)
    }

    /// Upsert a build from its wire payload, including its steps and
    /// actions when the payload is a build detail.
    pub fn import_build(&self, payload: &BuildPayload) -> StoreResult<Build> {
        let id = payload.id().ok_or(StoreError::MissingIdentity)?;
        let conn = self.lock();

        let mut record: Build = fetch_record(&conn, "builds", &id)?.unwrap_or_default();
        payload.apply(&mut record);
        conn.execute(
            "INSERT INTO builds (id, branch_id, build_num, data) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
                 branch_id = excluded.branch_id,
                 build_num = excluded.build_num,
                 data = excluded.data",
            params![
                record.id,
                record.branch_id(),
                record.build_num,
                serde_json::to_string(&record)?
            ],
        )?;

        let mut imported = Vec::new();
        for (position, step_payload) in payload.steps.iter().enumerate() {
            let index = step_payload.index(position);
            let step_id = BuildStep::composite_id(&record.id, index);

            let mut step: BuildStep = fetch_record(&conn, "build_steps", &step_id)?
                .unwrap_or_default();
            step.id = step_id.clone();
            step.build_id = record.id.clone();
            step.index = index;
            step_payload.apply(&mut step);
            conn.execute(
                "INSERT INTO build_steps (id, build_id, step_index, data) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO UPDATE SET
                     build_id = excluded.build_id,
                     step_index = excluded.step_index,
                     data = excluded.data",
                params![step.id, step.build_id, step.index, serde_json::to_string(&step)?],
            )?;
            imported.push((EntityKind::BuildStep, step.id.clone()));

            for action_payload in &step_payload.actions {
                // The derived id depends only on the step, the action type,
                // the name and the node index, so re-imports land on the
                // same row.
                let mut candidate = BuildAction::default();
                action_payload.apply(&mut candidate);
                candidate.ensure_id(&step_id);

                let mut action: BuildAction =
                    fetch_record(&conn, "build_actions", &candidate.id)?.unwrap_or(candidate);
                action_payload.apply(&mut action);
                conn.execute(
                    "INSERT INTO build_actions (id, step_id, node_index, data)
                     VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(id) DO UPDATE SET
                         step_id = excluded.step_id,
                         node_index = excluded.node_index,
                         data = excluded.data",
                    params![
                        action.id,
                        action.step_id,
                        action.node_index,
                        serde_json::to_string(&action)?
                    ],
                )?;
                imported.push((EntityKind::BuildAction, action.id.clone()));
            }
        }
        drop(conn);

        tracing::debug!(build = %record.id, steps = payload.steps.len(), "imported build");
        for (kind, entity_id) in imported {
            self.notify(kind, &entity_id);
        }
        self.notify(EntityKind::Build, &record.id);
        Ok(record)
    }

    // --- queries -----------------------------------------------------------

    pub fn project(&self, id: &str) -> StoreResult<Option<Project>> {
        fetch_record(&self.lock(), "projects", id)
    }

    pub fn projects(&self) -> StoreResult<Vec<Project>> {
        self.fetch_all("SELECT data FROM projects ORDER BY id", params![])
    }

    /// The project's visible branch set, by display name.
    pub fn project_branches(&self, project_id: &str) -> StoreResult<Vec<Branch>> {
        self.fetch_all(
            "SELECT b.data FROM branches b
             JOIN project_branches pb ON pb.branch_id = b.id
             WHERE pb.project_id = ?1
             ORDER BY b.name",
            params![project_id],
        )
    }

    /// Builds of a branch, newest first.
    pub fn branch_builds(&self, branch_id: &str) -> StoreResult<Vec<Build>> {
        self.fetch_all(
            "SELECT data FROM builds WHERE branch_id = ?1 ORDER BY build_num DESC",
            params![branch_id],
        )
    }

    pub fn build(&self, id: &str) -> StoreResult<Option<Build>> {
        fetch_record(&self.lock(), "builds", id)
    }

    /// Steps of a build, ordered by step index.
    pub fn build_steps(&self, build_id: &str) -> StoreResult<Vec<BuildStep>> {
        self.fetch_all(
            "SELECT data FROM build_steps WHERE build_id = ?1 ORDER BY step_index",
            params![build_id],
        )
    }

    /// Actions of a step, ordered by executor node index.
    pub fn step_actions(&self, step_id: &str) -> StoreResult<Vec<BuildAction>> {
        self.fetch_all(
            "SELECT data FROM build_actions WHERE step_id = ?1 ORDER BY node_index",
            params![step_id],
        )
    }

    pub fn action(&self, id: &str) -> StoreResult<Option<BuildAction>> {
        fetch_record(&self.lock(), "build_actions", id)
    }

    /// Like [`Store::action`] but a missing record is an error.
    pub fn require_action(&self, id: &str) -> StoreResult<BuildAction> {
        self.action(id)?.ok_or_else(|| StoreError::NotFound {
            kind: "action",
            id: id.to_string(),
        })
    }

    fn fetch_all<T: serde::de::DeserializeOwned>(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> StoreResult<Vec<T>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params, |row| row.get::<_, String>(0))?;
        let mut out = Vec::new();
        for data in rows {
            out.push(serde_json::from_str(&data?)?);
        }
        Ok(out)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().expect("store connection poisoned")
    }
}

fn fetch_record<T: serde::de::DeserializeOwned>(
    conn: &Connection,
    table: &str,
    id: &str,
) -> StoreResult<Option<T>> {
    let sql = format!("SELECT data FROM {table} WHERE id = ?1");
    let data: Option<String> = conn
        .query_row(&sql, params![id], |row| row.get(0))
        .optional()?;
    match data {
        Some(data) => Ok(Some(serde_json::from_str(&data)?)),
        None => Ok(None),
    }
}
