// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Table layout
//!
//! Records are stored as JSON blobs next to the columns the queries need:
//! primary keys, parent relations and the index fields display ordering is
//! based on. The `project_branches` join table holds a project's *visible*
//! branch set; it is replaced wholesale on re-import while `branches` rows
//! themselves are never deleted.

use rusqlite::Connection;

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS projects (
    id   TEXT PRIMARY KEY,
    data TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS branches (
    id         TEXT PRIMARY KEY,
    project_id TEXT NOT NULL,
    name       TEXT NOT NULL,
    data       TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS project_branches (
    project_id TEXT NOT NULL,
    branch_id  TEXT NOT NULL,
    PRIMARY KEY (project_id, branch_id)
);

CREATE TABLE IF NOT EXISTS builds (
    id        TEXT PRIMARY KEY,
    branch_id TEXT,
    build_num INTEGER NOT NULL,
    data      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS build_steps (
    id         TEXT PRIMARY KEY,
    build_id   TEXT NOT NULL,
    step_index INTEGER NOT NULL,
    data       TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS build_actions (
    id         TEXT PRIMARY KEY,
    step_id    TEXT NOT NULL,
    node_index INTEGER NOT NULL,
    data       TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_builds_branch ON builds (branch_id, build_num);
CREATE INDEX IF NOT EXISTS idx_steps_build ON build_steps (build_id, step_index);
CREATE INDEX IF NOT EXISTS idx_actions_step ON build_actions (step_id, node_index);
";

pub fn init(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA)
}
