use std::fmt;
use std::path::Path;

use anyhow::Result;
use colored::Colorize;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Input, Select};

use super::export::export_components;
use super::{run_analysis, AnalyzeClient, Tab, ViewState};
use crate::report::terminal::render_view;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Analyze,
    ShowTab(Tab),
    Export,
    Quit,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Analyze => write!(f, "Analyze a repository"),
            Action::ShowTab(tab) => write!(f, "Show {tab}"),
            Action::Export => write!(f, "Export components"),
            Action::Quit => write!(f, "Quit"),
        }
    }
}

fn actions(state: &ViewState) -> Vec<Action> {
    let mut actions = vec![Action::Analyze];
    if state.result.is_some() {
        actions.extend(
            Tab::ALL
                .into_iter()
                .filter(|tab| *tab != state.tab)
                .map(Action::ShowTab),
        );
    }
    if state.can_export() {
        actions.push(Action::Export);
    }
    actions.push(Action::Quit);
    actions
}

/// Interactive session: prompt for a URL, analyze it, then browse tabs and
/// export until the user quits. The state lives only for the session.
pub async fn run_interactive(client: &AnalyzeClient, export_dir: &Path, initial_url: Option<String>) -> Result<()> {
    let theme = ColorfulTheme::default();
    let mut state = ViewState::new();

    if let Some(url) = initial_url {
        state = run_analysis(client, &state.with_url(url), true).await;
    }

    loop {
        println!("{}", render_view(&state));

        let choices = actions(&state);
        let picked = Select::with_theme(&theme)
            .with_prompt("Action")
            .items(&choices)
            .default(0)
            .interact()?;

        match choices[picked] {
            Action::Analyze => {
                // Enter on the prompt submits.
                let url: String = Input::with_theme(&theme)
                    .with_prompt("Repository URL")
                    .with_initial_text(state.url.clone())
                    .allow_empty(true)
                    .interact_text()?;
                state = run_analysis(client, &state.with_url(url), true).await;
            }
            Action::ShowTab(tab) => state = state.select_tab(tab),
            Action::Export => match export_components(&state, export_dir) {
                Ok(path) => eprintln!("  {} Exported to {}", "✓".green(), path.display()),
                Err(e) => eprintln!("  {} {e:#}", "✗".red()),
            },
            Action::Quit => break,
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actions_follow_state() {
        let empty = ViewState::new();
        assert_eq!(actions(&empty), vec![Action::Analyze, Action::Quit]);

        let with_result = ViewState::new().with_result(
            serde_json::from_value(serde_json::json!({
                "components": {}, "dag": {}, "stats": {},
                "formatted_output": "", "message": "Analysis complete."
            }))
            .unwrap(),
        );
        let acts = actions(&with_result);
        assert!(acts.contains(&Action::Export));
        assert!(acts.contains(&Action::ShowTab(Tab::Dag)));
        assert!(!acts.contains(&Action::ShowTab(Tab::Formatted)));
        assert_eq!(acts.last(), Some(&Action::Quit));
    }
}
