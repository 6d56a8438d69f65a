//! Terminal client for the analysis service.
//!
//! The request cycle is [`ViewState::submit`] → [`AnalyzeClient::analyze`]
//! → [`ViewState::complete`], wired together by [`run_analysis`].

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

pub mod error;
pub mod export;
pub mod request;
pub mod session;
pub mod state;

pub use request::AnalyzeClient;
pub use state::{Tab, ViewState};

/// Run one analysis cycle for `state.url` and return the resulting state.
///
/// A blank URL or a submission while another is pending resolves without
/// touching the network.
pub async fn run_analysis(client: &AnalyzeClient, state: &ViewState, show_spinner: bool) -> ViewState {
    let (pending, ticket) = state.submit();
    let Some(ticket) = ticket else {
        return pending;
    };

    let spinner = show_spinner.then(|| spinner(&ticket.repo_url));
    let outcome = client.analyze(&ticket.repo_url).await;
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    pending.complete(&ticket, outcome)
}

fn spinner(repo_url: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}") {
        pb.set_style(style);
    }
    pb.set_message(format!("Analyzing {}", repo_url.trim()));
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
