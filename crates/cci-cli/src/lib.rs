// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Command-line client for browsing CircleCI pipelines
//!
//! The CLI is the exercising surface over the library crates: it wires the
//! REST client, the local store and the color-scheme resolver into one
//! [`context::AppContext`] that is constructed once and threaded through
//! every command.

use clap::{Parser, Subcommand};

pub mod commands;
pub mod context;
pub mod render;
pub mod settings;

#[derive(Parser)]
#[command(name = "cci", about = "Browse CircleCI builds from the terminal", version)]
pub struct Cli {
    /// Override the stored API token for this invocation
    #[arg(long, env = "CIRCLE_TOKEN", global = true)]
    pub token: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate an API token against the account and store it
    Login {
        token: String,
    },
    /// List followed projects and their branches
    Projects,
    /// List recent builds of a project, optionally narrowed to one branch
    Builds {
        /// `username/reponame`
        project: String,
        #[arg(long)]
        branch: Option<String>,
        #[arg(long, default_value_t = 30)]
        limit: u32,
    },
    /// Show one build's steps and actions
    Build {
        project: String,
        build_num: u64,
    },
    /// Download and display an action's log output
    Log {
        project: String,
        build_num: u64,
        /// Step index; defaults to the first step with output
        #[arg(long)]
        step: Option<u32>,
    },
    /// Re-run a build
    Retry {
        project: String,
        build_num: u64,
    },
    /// Cancel a running build
    Cancel {
        project: String,
        build_num: u64,
    },
    /// Clear a project's build cache
    ClearCache {
        project: String,
    },
    /// List available color schemes
    Schemes,
    /// Select the color scheme used for logs and badges
    UseScheme {
        name: String,
    },
}

/// Split a `username/reponame` argument.
pub fn parse_project(arg: &str) -> anyhow::Result<(&str, &str)> {
    arg.split_once('/')
        .filter(|(user, repo)| !user.is_empty() && !repo.is_empty())
        .ok_or_else(|| anyhow::anyhow!("expected project as username/reponame, got '{arg}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_argument_parsing() {
        assert_eq!(parse_project("octocat/hello").unwrap(), ("octocat", "hello"));
        assert!(parse_project("octocat").is_err());
        assert!(parse_project("/hello").is_err());
    }
}
