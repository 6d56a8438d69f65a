//! Client view state.
//!
//! Every transition takes `&self` and returns a new [`ViewState`]; nothing
//! mutates in place. Request completion is keyed by a [`RequestTicket`] so a
//! response can only land on the submission that produced it.

use std::fmt;

use super::error::ClientError;
use crate::models::AnalysisResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Formatted,
    Components,
    Dag,
    Statistics,
}

impl Tab {
    pub const ALL: [Tab; 4] = [Tab::Formatted, Tab::Components, Tab::Dag, Tab::Statistics];
}

impl fmt::Display for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tab::Formatted => write!(f, "Formatted"),
            Tab::Components => write!(f, "Components"),
            Tab::Dag => write!(f, "DAG"),
            Tab::Statistics => write!(f, "Statistics"),
        }
    }
}

/// Handle for one in-flight request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTicket {
    seq: u64,
    /// URL exactly as typed; it is sent untrimmed.
    pub repo_url: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    pub url: String,
    pub result: Option<AnalysisResult>,
    pub loading: bool,
    pub error: Option<String>,
    pub tab: Tab,
    request_seq: u64,
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_url(&self, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..self.clone()
        }
    }

    pub fn select_tab(&self, tab: Tab) -> Self {
        Self { tab, ..self.clone() }
    }

    pub fn can_export(&self) -> bool {
        self.result.is_some()
    }

    /// Start an analysis of the current URL.
    ///
    /// Returns the next state and, when a request should actually be sent,
    /// its ticket. While a request is pending further submissions are
    /// ignored. A blank URL fails immediately with [`ClientError::EmptyInput`].
    pub fn submit(&self) -> (Self, Option<RequestTicket>) {
        if self.loading {
            return (self.clone(), None);
        }

        if self.url.trim().is_empty() {
            let next = Self {
                result: None,
                error: Some(ClientError::EmptyInput.to_string()),
                ..self.clone()
            };
            return (next, None);
        }

        let seq = self.request_seq + 1;
        let next = Self {
            result: None,
            error: None,
            loading: true,
            request_seq: seq,
            ..self.clone()
        };
        let ticket = RequestTicket {
            seq,
            repo_url: self.url.clone(),
        };
        (next, Some(ticket))
    }

    /// Apply the outcome of the request identified by `ticket`. Outcomes of
    /// any other request are dropped.
    pub fn complete(
        &self,
        ticket: &RequestTicket,
        outcome: Result<AnalysisResult, ClientError>,
    ) -> Self {
        if !self.loading || ticket.seq != self.request_seq {
            return self.clone();
        }

        match outcome {
            Ok(result) => Self {
                result: Some(result),
                error: None,
                loading: false,
                ..self.clone()
            },
            Err(err) => Self {
                result: None,
                error: Some(err.to_string()),
                loading: false,
                ..self.clone()
            },
        }
    }

    /// A copy holding `result`, for rendering fixtures.
    #[cfg(test)]
    pub(crate) fn with_result(&self, result: AnalysisResult) -> Self {
        Self {
            result: Some(result),
            ..self.clone()
        }
    }

    /// A copy showing `error`, for rendering fixtures.
    #[cfg(test)]
    pub(crate) fn with_error(&self, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_result(message: &str) -> AnalysisResult {
        serde_json::from_value(serde_json::json!({
            "components": {"a.f": {"type": "function", "file_path": "a.py", "depends_on": []}},
            "dag": {"a.f": []},
            "stats": {"total_components": 1, "functions": 1},
            "formatted_output": "Components:\n  a.f",
            "message": message
        }))
        .unwrap()
    }

    #[test]
    fn test_blank_url_sets_empty_input_error() {
        for url in ["", "   ", "\t\n"] {
            let (next, ticket) = ViewState::new().with_url(url).submit();
            assert!(ticket.is_none());
            assert!(!next.loading);
            assert_eq!(next.error.as_deref(), Some("Please enter a repository URL"));
        }
    }

    #[test]
    fn test_blank_url_clears_stale_result() {
        let (pending, ticket) = ViewState::new().with_url("https://x/y").submit();
        let done = pending.complete(&ticket.unwrap(), Ok(sample_result("ok")));
        assert!(done.result.is_some());

        let (next, _) = done.with_url(" ").submit();
        assert!(next.result.is_none());
        assert!(next.error.is_some());
    }

    #[test]
    fn test_submit_clears_previous_state_and_keeps_raw_url() {
        let state = ViewState::new()
            .with_error("old")
            .with_result(sample_result("old"))
            .with_url("  https://github.com/a/b  ");

        let (next, ticket) = state.submit();
        let ticket = ticket.unwrap();
        assert_eq!(ticket.repo_url, "  https://github.com/a/b  ");
        assert!(next.loading);
        assert!(next.error.is_none());
        assert!(next.result.is_none());
        // The original value is untouched.
        assert!(state.result.is_some());
    }

    #[test]
    fn test_loading_spans_submission_to_first_resolution() {
        let (pending, ticket) = ViewState::new().with_url("https://x/y").submit();
        let ticket = ticket.unwrap();
        assert!(pending.loading);

        let failed = pending.complete(&ticket, Err(ClientError::http_status(502)));
        assert!(!failed.loading);
        assert!(failed.result.is_none());
        assert_eq!(failed.error.as_deref(), Some("HTTP error! status: 502"));

        // A second resolution of the same ticket changes nothing.
        let again = failed.complete(&ticket, Ok(sample_result("late")));
        assert_eq!(again, failed);
    }

    #[test]
    fn test_success_replaces_result_verbatim() {
        let (pending, ticket) = ViewState::new().with_url("https://x/y").submit();
        let result = sample_result("Analysis complete.");
        let done = pending.complete(&ticket.unwrap(), Ok(result.clone()));
        assert_eq!(done.result, Some(result));
        assert!(done.error.is_none());
    }

    #[test]
    fn test_submit_while_pending_is_ignored() {
        let (pending, first) = ViewState::new().with_url("https://x/one").submit();
        let (still_pending, second) = pending.with_url("https://x/two").submit();
        assert!(second.is_none());
        assert!(still_pending.loading);

        let done = still_pending.complete(&first.unwrap(), Ok(sample_result("one")));
        assert_eq!(done.result.unwrap().message, "one");
    }

    #[test]
    fn test_stale_ticket_is_dropped() {
        let (pending, first) = ViewState::new().with_url("https://x/one").submit();
        let first = first.unwrap();
        let failed = pending.complete(&first, Err(ClientError::request("boom")));

        let (pending, second) = failed.with_url("https://x/two").submit();
        let second = second.unwrap();

        let unchanged = pending.complete(&first, Ok(sample_result("one")));
        assert_eq!(unchanged, pending);

        let done = pending.complete(&second, Ok(sample_result("two")));
        assert_eq!(done.result.unwrap().message, "two");
    }

    #[test]
    fn test_select_tab_touches_nothing_else() {
        let (pending, ticket) = ViewState::new().with_url("https://x/y").submit();
        let done = pending.complete(&ticket.unwrap(), Ok(sample_result("ok")));

        for tab in Tab::ALL {
            let next = done.select_tab(tab);
            assert_eq!(next.tab, tab);
            assert_eq!(next.result, done.result);
            assert_eq!(next.error, done.error);
            assert_eq!(next.loading, done.loading);
        }
    }

    #[test]
    fn test_fixture_states_still_accept_tickets() {
        let seeded = ViewState::new()
            .with_result(sample_result("seeded"))
            .with_error("seeded error");
        let (pending, ticket) = seeded.with_url("https://x/y").submit();
        let done = pending.complete(&ticket.unwrap(), Ok(sample_result("fresh")));
        assert_eq!(done.result.unwrap().message, "fresh");
        assert!(done.error.is_none());
    }
}
