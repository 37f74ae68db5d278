// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Command implementations

use anyhow::{bail, Context as _, Result};
use futures::StreamExt;
use url::Url;

use crate::context::AppContext;
use crate::render;
use crate::settings::is_valid_token;
use cci_ansi::StyledText;
use cci_api_contract::Build;
use cci_rest_client::CircleClient;

/// Validate a token against the account endpoint, then persist it.
pub async fn login(ctx: &mut AppContext, token: String) -> Result<()> {
    if !is_valid_token(&token) {
        bail!("API tokens are 40 lowercase hex characters");
    }

    let client = CircleClient::new(Some(token.clone()));
    let user = client.me().await.context("token was rejected")?;
    println!("authenticated as {}", user.name.as_deref().unwrap_or(&user.login));

    ctx.settings.api_token = Some(token);
    ctx.settings.save(&ctx.settings_path)?;
    Ok(())
}

/// Fetch followed projects, import them and print the cached view.
pub async fn projects(ctx: &AppContext) -> Result<()> {
    for payload in ctx.client.projects().await? {
        ctx.store.import_project(&payload)?;
        ctx.store.import_project_branches(&payload)?;
    }

    for project in ctx.store.projects()? {
        let branches = ctx.store.project_branches(&project.id)?;
        let names: Vec<&str> = branches.iter().map(|b| b.name.as_str()).collect();
        println!("{}  [{}]", project.id, names.join(", "));
    }
    Ok(())
}

/// Fetch recent builds, import them and print one line per build.
pub async fn builds(
    ctx: &AppContext,
    project: &str,
    branch: Option<&str>,
    limit: u32,
) -> Result<()> {
    let (username, reponame) = crate::parse_project(project)?;
    let payloads = match branch {
        Some(branch) => {
            ctx.client.branch_builds(username, reponame, branch, limit, 0).await?
        }
        None => ctx.client.recent_builds(username, reponame, limit, 0).await?,
    };

    let scheme = ctx.current_scheme()?;
    for payload in payloads {
        let build = ctx.store.import_build(&payload)?;
        print_build_line(&build, &scheme);
    }
    Ok(())
}

fn print_build_line(build: &Build, scheme: &cci_ansi::ColorScheme) {
    let status_text = build.status.map(|s| s.to_string()).unwrap_or_else(|| "-".into());
    let badge = render::badge(&status_text, scheme.badge_color(build.status));
    println!(
        "#{:<6} {:20} {:10} {}",
        build.build_num,
        badge,
        build.branch.as_deref().unwrap_or("-"),
        build.subject.as_deref().unwrap_or("")
    );
}

/// Fetch one build's detail and print its steps and actions.
pub async fn build(ctx: &AppContext, project: &str, build_num: u64) -> Result<()> {
    let (username, reponame) = crate::parse_project(project)?;
    let payload = ctx.client.build(username, reponame, build_num).await?;
    let build = ctx.store.import_build(&payload)?;

    let scheme = ctx.current_scheme()?;
    print_build_line(&build, &scheme);
    for step in ctx.store.build_steps(&build.id)? {
        println!("  {:>3}  {}", step.index, step.name);
        for action in ctx.store.step_actions(&step.id)? {
            let status_text =
                action.status.map(|s| s.to_string()).unwrap_or_else(|| "-".into());
            let badge = render::badge(&status_text, scheme.action_color(action.status));
            let millis = action
                .run_time_millis
                .map(|ms| format!("{ms}ms"))
                .unwrap_or_default();
            println!("       node {}  {:20} {}", action.node_index, badge, millis);
        }
    }
    Ok(())
}

/// Download an action's output and print it colorized.
pub async fn log(
    ctx: &AppContext,
    project: &str,
    build_num: u64,
    step: Option<u32>,
) -> Result<()> {
    let (username, reponame) = crate::parse_project(project)?;
    let payload = ctx.client.build(username, reponame, build_num).await?;
    let build = ctx.store.import_build(&payload)?;

    let steps = ctx.store.build_steps(&build.id)?;
    let mut candidates = Vec::new();
    for record in &steps {
        if step.is_some_and(|wanted| wanted != record.index) {
            continue;
        }
        candidates.extend(ctx.store.step_actions(&record.id)?);
    }
    let action = candidates
        .into_iter()
        .find(|a| a.has_output && a.output_url.is_some())
        .context("no action with output for that build/step")?;

    let remote = Url::parse(action.output_url.as_deref().context("action has no output URL")?)?;
    let dir = tempfile_dir()?;
    let dest = dir.join(format!("{}.log", sanitize(&action.id)));

    let mut task = ctx.client.download_file(&remote, &dest);
    while let Some(progress) = task.next().await {
        let progress = progress?;
        if progress.completed {
            tracing::debug!(bytes = progress.total_bytes_read, "log downloaded");
        }
    }

    let raw = std::fs::read_to_string(&dest)
        .with_context(|| format!("reading downloaded log {}", dest.display()))?;

    let scheme = ctx.current_scheme()?;
    let palette = scheme.palette();
    let mut styled = StyledText::default();
    styled.append_raw(&raw, &palette);
    println!("{}", render::render(&styled));
    Ok(())
}

pub async fn retry(ctx: &AppContext, project: &str, build_num: u64) -> Result<()> {
    let (username, reponame) = crate::parse_project(project)?;
    let payload = ctx.client.retry_build(username, reponame, build_num).await?;
    let build = ctx.store.import_build(&payload)?;
    println!("retried as #{}", build.build_num);
    Ok(())
}

pub async fn cancel(ctx: &AppContext, project: &str, build_num: u64) -> Result<()> {
    let (username, reponame) = crate::parse_project(project)?;
    let payload = ctx.client.cancel_build(username, reponame, build_num).await?;
    let build = ctx.store.import_build(&payload)?;
    println!(
        "build #{} is now {}",
        build.build_num,
        build.status.map(|s| s.to_string()).unwrap_or_else(|| "-".into())
    );
    Ok(())
}

pub async fn clear_cache(ctx: &AppContext, project: &str) -> Result<()> {
    let (username, reponame) = crate::parse_project(project)?;
    ctx.client.clear_build_cache(username, reponame).await?;
    println!("build cache cleared for {project}");
    Ok(())
}

pub fn schemes(ctx: &AppContext) -> Result<()> {
    for name in ctx.schemes.names() {
        let marker = if name == ctx.settings.color_scheme { "*" } else { " " };
        let scheme = ctx.schemes.resolve(&name)?;
        let kind = if scheme.is_light() { "light" } else { "dark" };
        println!("{marker} {name} ({kind})");
    }
    Ok(())
}

pub fn use_scheme(ctx: &mut AppContext, name: String) -> Result<()> {
    // Resolve first so an unknown name fails before anything is persisted.
    ctx.schemes.resolve(&name)?;
    ctx.settings.color_scheme = name;
    ctx.settings.save(&ctx.settings_path)?;
    Ok(())
}

fn tempfile_dir() -> Result<std::path::PathBuf> {
    let dir = std::env::temp_dir().join("cci-logs");
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

fn sanitize(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}
