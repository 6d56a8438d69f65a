//! `repo-depgraph`: parse repositories into code components, build their
//! dependency graph, and serve or browse the results.
//!
//! # Flow
//! 1. Parse CLI arguments ([`cli`]) and load config ([`config::load_config`]).
//! 2. `serve`: run the HTTP service ([`server`]); each `POST /analyze` clones
//!    ([`repo_loader`]), parses ([`analyzer`]), builds the graph ([`graph`])
//!    and assembles the response ([`pipeline`]).
//! 3. `analyze` / `interactive`: drive the service from the terminal
//!    ([`client`]) and render tabs ([`report`]).
//! 4. `scan`: run the same pipeline on a local checkout without the service.
//! 5. Exit `0`, or `1` when an analysis produced an error.

mod analyzer;
mod cli;
mod client;
mod config;
mod detector;
mod graph;
mod models;
mod pipeline;
mod repo_loader;
mod report;
mod server;

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command, ReportFormat};
use client::{AnalyzeClient, ViewState};
use config::{load_config, Config};
use pipeline::{AnalysisError, AnalysisOptions};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = match cli.command {
        Command::Serve { .. } => "info",
        _ => "warn",
    };
    init_tracing(default_level, cli.log_json);

    let cwd = std::env::current_dir()?;
    let config = load_config(&cwd, cli.config.as_deref())?;

    match cli.command {
        Command::Serve { bind, output_dir } => {
            let mut server = config.server;
            if let Some(bind) = bind {
                server.bind = bind;
            }
            if let Some(dir) = output_dir {
                server.output_dir = dir;
            }
            server::serve(server).await?;
        }
        Command::Analyze {
            url,
            endpoint,
            tab,
            export,
        } => {
            let client = make_client(&config, endpoint.as_deref())?;
            let state = ViewState::new().with_url(url);
            let state = client::run_analysis(&client, &state, !cli.quiet)
                .await
                .select_tab(tab.into());

            println!("{}", report::terminal::render_view(&state));

            if state.error.is_some() {
                std::process::exit(1);
            }
            if export {
                let path = client::export::export_components(&state, &config.client.export_dir)?;
                if !cli.quiet {
                    eprintln!("  {} Exported to {}", "✓".green(), path.display());
                }
            }
        }
        Command::Interactive { url, endpoint } => {
            let client = make_client(&config, endpoint.as_deref())?;
            client::session::run_interactive(&client, &config.client.export_dir, url).await?;
        }
        Command::Scan {
            path,
            report,
            export,
            verbose,
        } => scan(&config, &path, report, export, verbose, cli.quiet)?,
    }

    Ok(())
}

/// Logs go to stderr so stdout stays clean for reports. `RUST_LOG` wins
/// over `default_level`.
fn init_tracing(default_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.with_target(false).init();
    }
}

fn make_client(config: &Config, endpoint: Option<&str>) -> Result<AnalyzeClient> {
    let endpoint = endpoint.unwrap_or(&config.client.endpoint);
    AnalyzeClient::new(endpoint, Duration::from_secs(config.client.timeout_secs))
}

fn scan(
    config: &Config,
    path: &Path,
    report: ReportFormat,
    export: bool,
    verbose: bool,
    quiet: bool,
) -> Result<()> {
    let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

    if !quiet {
        for (language, files) in detector::detect_languages(&path)? {
            eprintln!("  {} {} {} files", "→".cyan(), language, files);
        }
    }

    let analysis = match pipeline::analyze_checkout(&path) {
        Ok(analysis) => analysis,
        Err(AnalysisError::NoComponents) => {
            eprintln!("{}", AnalysisError::NoComponents);
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };

    let options = AnalysisOptions {
        save_json: false,
        include_source: true,
        output_dir: config.server.output_dir.clone(),
        clone_dir: None,
        source_preview_chars: config.server.source_preview_chars,
    };
    let components = pipeline::components_map(&analysis, &options);

    match report {
        ReportFormat::Terminal => {
            let formatted = pipeline::format_analysis_output(
                &analysis.components,
                &analysis.graph,
                &analysis.dfs_order,
                &analysis.topological_order,
            );
            print!(
                "{}",
                report::terminal::render_scan(&analysis, &formatted, &path, verbose, quiet)
            );
        }
        ReportFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&components)?);
        }
    }

    if export {
        let (ir, dag) = pipeline::export_artifacts(&components, &analysis.graph, &options.output_dir)?;
        if !quiet {
            eprintln!("  {} Wrote {} and {}", "✓".green(), ir.display(), dag.display());
        }
    }

    Ok(())
}
