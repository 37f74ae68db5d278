// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cci_cli::context::AppContext;
use cci_cli::{commands, Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut ctx = AppContext::init(cli.token.clone())?;

    match cli.command {
        Commands::Login { token } => commands::login(&mut ctx, token).await,
        Commands::Projects => commands::projects(&ctx).await,
        Commands::Builds {
            project,
            branch,
            limit,
        } => commands::builds(&ctx, &project, branch.as_deref(), limit).await,
        Commands::Build { project, build_num } => commands::build(&ctx, &project, build_num).await,
        Commands::Log {
            project,
            build_num,
            step,
        } => commands::log(&ctx, &project, build_num, step).await,
        Commands::Retry { project, build_num } => commands::retry(&ctx, &project, build_num).await,
        Commands::Cancel { project, build_num } => {
            commands::cancel(&ctx, &project, build_num).await
        }
        Commands::ClearCache { project } => commands::clear_cache(&ctx, &project).await,
        Commands::Schemes => commands::schemes(&ctx),
        Commands::UseScheme { name } => commands::use_scheme(&mut ctx, name),
    }
}
