use crate::action::{parse_action, ActionRequest};
use crate::backend::ConnectionMode;
use crate::browser::Browser;
use crate::error::CoreError;
use crate::listing::parse_line;
use crate::model::{build_system_prompt, ModelRequest};
use crate::path::{base_name, parent_path};
use crate::permission::{ConfirmStage, PermissionGate};
use crate::state::{LogLevel, RouterPhase, SessionState};
use crate::transfer::{Direction, TransferOrigin, TransferRequest};
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Clone, Debug)]
pub struct PendingRequest {
    pub id: Uuid,
    pub request: ModelRequest,
}

#[derive(Debug)]
pub enum DispatchOutcome {
    Answered,
    Navigated,
    SearchMatched { path: String },
    SearchEmpty,
    CopyApproved(TransferRequest),
    CopyRejected(ConfirmStage),
    Rejected(CoreError),
    Ignored,
}

/// Turns model replies into actions: `Idle -> AwaitingModelResponse ->
/// Dispatching -> Idle`. Only one request may be pending at a time.
pub struct ActionRouter {
    browser: Browser,
    gate: PermissionGate,
}

impl ActionRouter {
    pub fn new(browser: Browser, gate: PermissionGate) -> Self {
        Self { browser, gate }
    }

    pub fn browser(&self) -> &Browser {
        &self.browser
    }

    pub fn begin_request(
        &self,
        state: &mut SessionState,
        utterance: &str,
    ) -> Result<PendingRequest, CoreError> {
        if state.is_busy() {
            state.log.push(
                LogLevel::Warning,
                "Still waiting for the previous request; try again when it finishes.",
            );
            return Err(CoreError::Busy);
        }
        let id = Uuid::new_v4();
        state.log.push(LogLevel::User, utterance);
        state.phase = RouterPhase::AwaitingModelResponse { request_id: id };
        info!(request_id = %id, "model request started");
        Ok(PendingRequest {
            id,
            request: ModelRequest {
                system: build_system_prompt(state.current_path(), &state.overview),
                utterance: utterance.to_string(),
            },
        })
    }

    fn accepts(&self, state: &SessionState, request_id: Uuid) -> bool {
        state.phase == RouterPhase::AwaitingModelResponse { request_id }
    }

    pub async fn handle_reply(
        &self,
        state: &mut SessionState,
        request_id: Uuid,
        reply: &str,
    ) -> DispatchOutcome {
        if !self.accepts(state, request_id) {
            warn!(%request_id, "stale model reply ignored");
            return DispatchOutcome::Ignored;
        }
        state.phase = RouterPhase::Dispatching;
        let outcome = match parse_action(reply) {
            Ok(action) => self.dispatch(state, action).await,
            Err(err) => {
                let message = match &err {
                    CoreError::Parse { reason, raw } => {
                        format!("Error parsing AI response: {reason}\nRaw: {raw}")
                    }
                    CoreError::UnknownAction(name) => {
                        format!("Unknown action '{name}', nothing done.")
                    }
                    other => other.to_string(),
                };
                state.log.push(LogLevel::Error, message);
                DispatchOutcome::Rejected(err)
            }
        };
        state.phase = RouterPhase::Idle;
        outcome
    }

    pub fn handle_failure(&self, state: &mut SessionState, request_id: Uuid, error: &str) {
        if !self.accepts(state, request_id) {
            warn!(%request_id, "stale model failure ignored");
            return;
        }
        state.log.push(LogLevel::Error, format!("Error: {error}"));
        state.phase = RouterPhase::Idle;
    }

    pub async fn dispatch(&self, state: &mut SessionState, action: ActionRequest) -> DispatchOutcome {
        info!(action = action.name(), "dispatch");
        match action {
            ActionRequest::Question { text } => {
                state.log.push(LogLevel::Ai, text);
                DispatchOutcome::Answered
            }
            ActionRequest::Navigate { path } => {
                self.browser.navigate(state, &path, true).await;
                state.log.push(LogLevel::Ai, format!("Navigated to {path}"));
                DispatchOutcome::Navigated
            }
            ActionRequest::Search { query } => self.search(state, &query).await,
            ActionRequest::Copy {
                source,
                destination,
                direction,
            } => {
                let request =
                    TransferRequest::new(source, destination, direction, TransferOrigin::Model);
                self.copy(state, request).await
            }
        }
    }

    async fn search_in(&self, state: &mut SessionState, query: &str, base: &str) -> String {
        match self.browser.executor().search(query, base).await {
            Ok(raw) => raw,
            Err(err) => {
                warn!(query, base, error = %err, "search failed");
                state
                    .log
                    .push(LogLevel::Warning, format!("Search in {base} failed: {err}"));
                String::new()
            }
        }
    }

    async fn search(&self, state: &mut SessionState, query: &str) -> DispatchOutcome {
        state
            .log
            .push(LogLevel::Ai, format!("Searching for '{query}'..."));
        let base = match state.current_path() {
            "" => ".".to_string(),
            path => path.to_string(),
        };
        let mut results = self.search_in(state, query, &base).await;
        if results.is_empty() {
            state.log.push(
                LogLevel::Ai,
                "No results found in current directory. Trying home directory...",
            );
            let home = state.home.clone();
            results = self.search_in(state, query, &home).await;
            if results.is_empty() {
                state
                    .log
                    .push(LogLevel::Ai, "No results found in home directory either.");
            } else {
                state
                    .log
                    .push(LogLevel::Ai, format!("Results (from home):\n{results}"));
            }
        } else {
            state.log.push(LogLevel::Ai, format!("Results:\n{results}"));
        }

        let Some(hit) = results.lines().next().and_then(parse_line) else {
            return DispatchOutcome::SearchEmpty;
        };
        let full = hit.name;
        let parent = match parent_path(&full) {
            p if p.is_empty() => ".".to_string(),
            p => p,
        };
        state.log.push(LogLevel::Ai, format!("Found match at {full}"));
        state
            .log
            .push(LogLevel::Ai, format!("Navigating to context: {parent}"));
        self.browser.navigate(state, &parent, true).await;
        self.browser.select(state, base_name(&full)).await;
        DispatchOutcome::SearchMatched { path: full }
    }

    async fn copy(&self, state: &mut SessionState, request: TransferRequest) -> DispatchOutcome {
        state.log.push(
            LogLevel::System,
            format!(
                "AI requests copy ({}): {} -> {}",
                request.direction.label(),
                request.source,
                request.destination
            ),
        );
        match self.gate.authorize(&request).await {
            Ok(()) => {
                state
                    .log
                    .push(LogLevel::System, "Copy authorized, transfer queued.");
                DispatchOutcome::CopyApproved(request)
            }
            Err(CoreError::PermissionDenied { stage }) => {
                state.log.push(
                    LogLevel::Warning,
                    format!("Copy aborted at stage {}.", stage.number()),
                );
                DispatchOutcome::CopyRejected(stage)
            }
            Err(err) => {
                state.log.push(LogLevel::Error, err.to_string());
                DispatchOutcome::Rejected(err)
            }
        }
    }

    pub async fn complete_transfer(
        &self,
        state: &mut SessionState,
        request: &TransferRequest,
        result: Result<u64, String>,
    ) {
        match result {
            Ok(bytes) => {
                let verb = match (state.mode, request.direction) {
                    (ConnectionMode::Local, _) => "Copied",
                    (ConnectionMode::Remote, Direction::ToClient) => "Downloaded",
                    (ConnectionMode::Remote, Direction::ToHost) => "Uploaded",
                };
                state.log.push(
                    LogLevel::Success,
                    format!(
                        "{verb} {} to {} ({bytes} bytes)",
                        request.source, request.destination
                    ),
                );
                if request.direction == Direction::ToHost {
                    self.browser.refresh(state).await;
                }
            }
            Err(err) => {
                state.log.push(LogLevel::Error, format!("Copy failed: {err}"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::CommandExecutor;
    use crate::state::ActivityLog;
    use crate::testing::{FakeBackend, ScriptedConfirmer};
    use std::sync::Arc;

    struct Harness {
        fake: Arc<FakeBackend>,
        confirmer: Arc<ScriptedConfirmer>,
        router: ActionRouter,
        state: SessionState,
    }

    fn harness(fake: FakeBackend, answers: &[bool], start: &str) -> Harness {
        let fake = Arc::new(fake);
        let confirmer = Arc::new(ScriptedConfirmer::new(answers.to_vec()));
        let executor = Arc::new(CommandExecutor::new(fake.clone()));
        let router = ActionRouter::new(
            Browser::new(executor, 50),
            PermissionGate::new(confirmer.clone()),
        );
        let state = SessionState::new(
            ConnectionMode::Remote,
            "/home/user",
            start,
            "/home/user\n/home/user/docs",
            ActivityLog::new(100),
        );
        Harness {
            fake,
            confirmer,
            router,
            state,
        }
    }

    impl Harness {
        async fn reply(&mut self, text: &str) -> DispatchOutcome {
            let pending = self.router.begin_request(&mut self.state, "do it").unwrap();
            self.router
                .handle_reply(&mut self.state, pending.id, text)
                .await
        }

        fn lists_issued(&self) -> usize {
            self.fake
                .executed()
                .iter()
                .filter(|c| c.starts_with("fs_list"))
                .count()
        }
    }

    #[tokio::test]
    async fn navigate_sets_path_clears_forward_and_lists() {
        let mut h = harness(
            FakeBackend::new().with_listing("/srv", "d|docs|?\nf|report.pdf|120K"),
            &[],
            "/home/user/docs",
        );
        h.state.history.go_back();
        assert!(!h.state.history.forward_stack().is_empty());

        let outcome = h
            .reply(r#"{"action":"navigate","params":{"path":"/srv"}}"#)
            .await;
        assert!(matches!(outcome, DispatchOutcome::Navigated));
        assert_eq!(h.state.current_path(), "/srv");
        assert!(h.state.history.forward_stack().is_empty());
        assert_eq!(h.fake.executed(), ["fs_list '/srv'"]);
        assert_eq!(h.state.listing.len(), 2);
        assert_eq!(h.state.phase, RouterPhase::Idle);
    }

    #[tokio::test]
    async fn copy_rejected_at_stage_two_never_transfers() {
        let mut h = harness(FakeBackend::new(), &[true, false], "/srv");
        let outcome = h
            .reply(r#"{"action":"copy","params":{"source":"/tmp/a.txt","destination":"/srv/a.txt","direction":"to_host"}}"#)
            .await;
        assert!(matches!(
            outcome,
            DispatchOutcome::CopyRejected(ConfirmStage::FinalAuthorization)
        ));
        assert_eq!(h.confirmer.asked().len(), 2);
        assert!(h.state.log.contains("Copy aborted at stage 2."));
        assert_eq!(h.fake.byte_calls(), 0);
        assert_eq!(h.lists_issued(), 0);
    }

    #[tokio::test]
    async fn copy_needs_both_confirmations() {
        for answers in [[false, false], [false, true], [true, false]] {
            let mut h = harness(FakeBackend::new(), &answers, "/srv");
            let outcome = h
                .reply(r#"{"action":"copy","params":{"source":"/srv/a","destination":"/tmp/a","direction":"to_client"}}"#)
                .await;
            assert!(matches!(outcome, DispatchOutcome::CopyRejected(_)), "{answers:?}");
        }
        let mut h = harness(FakeBackend::new(), &[true, true], "/srv");
        let outcome = h
            .reply(r#"{"action":"copy","params":{"source":"/srv/a","destination":"/tmp/a","direction":"to_client"}}"#)
            .await;
        match outcome {
            DispatchOutcome::CopyApproved(request) => {
                assert_eq!(request.source, "/srv/a");
                assert_eq!(request.direction, Direction::ToClient);
                assert_eq!(request.origin, TransferOrigin::Model);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn search_falls_back_to_home_and_selects_match() {
        let fake = FakeBackend::new()
            .with_search(
                "tax",
                "/home/user",
                "f|/home/user/docs/tax_report.pdf|88K\nf|/home/user/old/tax.txt|1K",
            )
            .with_listing("/home/user/docs", "d|old|?\nf|tax_report.pdf|88K");
        let mut h = harness(fake, &[], "/home/user/projects");

        let outcome = h
            .reply(r#"{"action":"search","params":{"query":"tax"}}"#)
            .await;
        match outcome {
            DispatchOutcome::SearchMatched { path } => {
                assert_eq!(path, "/home/user/docs/tax_report.pdf")
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(h.state.current_path(), "/home/user/docs");
        assert!(h.state.history.forward_stack().is_empty());
        assert_eq!(
            h.state.history.back_stack(),
            ["/home/user/projects".to_string()]
        );
        assert_eq!(h.state.selected.as_deref(), Some("tax_report.pdf"));
        assert!(h.state.preview.is_some());
        assert!(h.state.log.contains("Trying home directory"));
        assert!(h.state.log.contains("Results (from home)"));

        let executed = h.fake.executed();
        assert_eq!(executed[0], "fs_search 'tax' '/home/user/projects'");
        assert_eq!(executed[1], "fs_search 'tax' '/home/user'");
    }

    #[tokio::test]
    async fn failed_search_reports_cause_then_tries_home() {
        let fake = FakeBackend::new()
            .with_failure("fs_search", "/srv", "fs_search: permission denied: /srv")
            .with_search("tax", "/home/user", "f|/home/user/tax.txt|1K")
            .with_listing("/home/user", "f|tax.txt|1K");
        let mut h = harness(fake, &[], "/srv");

        let outcome = h
            .reply(r#"{"action":"search","params":{"query":"tax"}}"#)
            .await;
        assert!(matches!(outcome, DispatchOutcome::SearchMatched { .. }));
        assert!(h
            .state
            .log
            .contains("Search in /srv failed: command failed: fs_search: permission denied: /srv"));
        assert!(h.state.log.contains("Trying home directory"));
        assert_eq!(h.state.current_path(), "/home/user");
    }

    #[tokio::test]
    async fn search_without_matches_stays_put() {
        let mut h = harness(FakeBackend::new(), &[], "/srv");
        let outcome = h
            .reply(r#"{"action":"search","params":{"query":"nothing"}}"#)
            .await;
        assert!(matches!(outcome, DispatchOutcome::SearchEmpty));
        assert_eq!(h.state.current_path(), "/srv");
        assert!(h.state.log.contains("home directory either"));
    }

    #[tokio::test]
    async fn malformed_reply_leaves_navigation_untouched() {
        for reply in ["not json", r#"{"params":{"path":"/"}}"#] {
            let mut h = harness(FakeBackend::new(), &[], "/home/user/docs");
            h.state.history.go_back();
            let before = h.state.history.clone();

            let outcome = h.reply(reply).await;
            assert!(matches!(
                outcome,
                DispatchOutcome::Rejected(CoreError::Parse { .. })
            ));
            assert_eq!(h.state.history, before);
            assert!(h.state.log.contains(reply));
            assert_eq!(h.state.phase, RouterPhase::Idle);
            assert!(h.fake.executed().is_empty());
        }
    }

    #[tokio::test]
    async fn unknown_action_does_nothing() {
        let mut h = harness(FakeBackend::new(), &[], "/srv");
        let outcome = h
            .reply(r#"{"action":"delete","params":{"path":"/srv"}}"#)
            .await;
        assert!(matches!(
            outcome,
            DispatchOutcome::Rejected(CoreError::UnknownAction(_))
        ));
        assert!(h.fake.executed().is_empty());
    }

    #[tokio::test]
    async fn question_touches_no_files() {
        let mut h = harness(FakeBackend::new(), &[], "/srv");
        let outcome = h
            .reply(r#"{"action":"question","params":{"text":"Which report?"}}"#)
            .await;
        assert!(matches!(outcome, DispatchOutcome::Answered));
        assert!(h.state.log.contains("Which report?"));
        assert!(h.fake.executed().is_empty());
    }

    #[tokio::test]
    async fn second_request_while_pending_is_rejected() {
        let mut h = harness(FakeBackend::new(), &[], "/srv");
        let first = h.router.begin_request(&mut h.state, "one").unwrap();
        assert!(matches!(
            h.router.begin_request(&mut h.state, "two"),
            Err(CoreError::Busy)
        ));

        h.router.handle_failure(&mut h.state, first.id, "timeout");
        assert!(!h.state.is_busy());
        assert!(h.state.log.contains("Error: timeout"));
        assert!(h.router.begin_request(&mut h.state, "three").is_ok());
    }

    #[tokio::test]
    async fn stale_reply_is_ignored() {
        let mut h = harness(FakeBackend::new(), &[], "/srv");
        let _pending = h.router.begin_request(&mut h.state, "one").unwrap();
        let outcome = h
            .router
            .handle_reply(
                &mut h.state,
                Uuid::new_v4(),
                r#"{"action":"navigate","params":{"path":"/"}}"#,
            )
            .await;
        assert!(matches!(outcome, DispatchOutcome::Ignored));
        assert_eq!(h.state.current_path(), "/srv");
        assert!(h.state.is_busy());
    }

    #[tokio::test]
    async fn only_uploads_refresh_the_listing() {
        let mut h = harness(FakeBackend::new().with_listing("/srv", "f|a.txt|1K"), &[], "/srv");
        let download = TransferRequest::new("/srv/a.txt", "/tmp/a.txt", Direction::ToClient, TransferOrigin::Model);
        h.router
            .complete_transfer(&mut h.state, &download, Ok(3))
            .await;
        assert_eq!(h.lists_issued(), 0);
        assert!(h.state.log.contains("Downloaded /srv/a.txt to /tmp/a.txt"));

        let upload = TransferRequest::new("/tmp/b.txt", "/srv/b.txt", Direction::ToHost, TransferOrigin::Model);
        h.router
            .complete_transfer(&mut h.state, &upload, Ok(3))
            .await;
        assert_eq!(h.lists_issued(), 1);

        h.router
            .complete_transfer(&mut h.state, &upload, Err("disk full".to_string()))
            .await;
        assert_eq!(h.lists_issued(), 1);
        assert!(h.state.log.contains("Copy failed: disk full"));
    }
}
