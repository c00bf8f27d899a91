//! Navigation controller
//!
//! Owns the committed frame, the session history (primary controller only)
//! and the sequence tokens that decide which in-flight fetch may commit.
//!
//! The controller never performs I/O. Starting a navigation hands back a
//! [`NavigationTicket`] describing the fetch to issue; whoever runs the fetch
//! feeds the result back through [`NavigationController::complete`], which
//! reconciles it against the newest token and reports a
//! [`NavigationOutcome`]. Only the most recently issued token can commit:
//! an older result that resolves late is dropped without side effects.

use crate::fetch::{ErrorKind, FetchError, FrameRequest};
use crate::frame::{Frame, FrameId, Message, RenderResponse, Response};
use crate::history::{HistoryEntry, SessionHistory};
use std::sync::Arc;

/// Redirect hops followed for one navigation before it is treated as a
/// server error
pub const MAX_REDIRECTS: u32 = 20;

/// How a commit lands in the session history
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryMode {
    Push,
    Replace,
    /// Back/forward to the entry at this index; the cursor moves on commit
    Traverse(usize),
}

/// New-view transitions replace the page identity (fresh frame id, messages
/// cleared, overlays force-closed); same-view transitions update it in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
    NewView,
    SameView,
}

/// A fetch the caller must run on behalf of the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationTicket {
    pub token: u64,
    pub request: FrameRequest,
}

#[derive(Debug, Clone)]
struct PendingNavigation {
    token: u64,
    path: String,
    history: HistoryMode,
    kind: TransitionKind,
    redirects: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NavigationOutcome {
    /// The result became the current frame
    Committed {
        frame: Arc<Frame>,
        kind: TransitionKind,
        messages: Vec<Message>,
    },

    /// The server redirected; the follow-up fetch has already been issued
    Redirected(NavigationTicket),

    /// The server asked for a full reload of `path`
    ReloadRequested { path: String },

    /// The server asked the overlay owning this controller to close
    CloseOverlayRequested,

    /// The fetch failed; frame and history are untouched
    Failed(ErrorKind),

    /// A newer navigation superseded this result
    Discarded,
}

pub struct NavigationController {
    current: Option<Arc<Frame>>,

    /// Present only on the primary controller
    history: Option<SessionHistory>,

    /// Nested (overlay) controllers tag their requests as overlay fetches
    overlay: bool,

    /// Highest token ever issued
    issued: u64,

    /// Highest token ever committed
    committed: u64,

    in_flight: Option<PendingNavigation>,

    /// Busy flag held by someone else (an overlay open) on our behalf
    external_navigating: bool,

    next_frame_id: u64,
}

impl NavigationController {
    /// The controller of the primary view; owns the session history
    pub fn primary() -> Self {
        Self {
            current: None,
            history: Some(SessionHistory::new()),
            overlay: false,
            issued: 0,
            committed: 0,
            in_flight: None,
            external_navigating: false,
            next_frame_id: 1,
        }
    }

    /// A controller nested inside an overlay, starting from its first render.
    /// Returns the messages that came with that render.
    pub fn nested(path: impl Into<String>, render: RenderResponse) -> (Self, Vec<Message>) {
        let mut controller = Self {
            current: None,
            history: None,
            overlay: true,
            issued: 0,
            committed: 0,
            in_flight: None,
            external_navigating: false,
            next_frame_id: 1,
        };
        let id = controller.mint_frame_id();
        let (frame, messages) = Frame::from_render(id, path, render);
        controller.current = Some(Arc::new(frame));
        (controller, messages)
    }

    pub fn current_frame(&self) -> Option<&Arc<Frame>> {
        self.current.as_ref()
    }

    pub fn current_path(&self) -> Option<&str> {
        self.current.as_deref().map(|frame| frame.path.as_str())
    }

    pub fn history(&self) -> Option<&SessionHistory> {
        self.history.as_ref()
    }

    pub fn is_overlay(&self) -> bool {
        self.overlay
    }

    /// True while a fetch of ours is in flight, or while someone marked us busy
    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some() || self.external_navigating
    }

    /// Mark the controller busy on behalf of a fetch it does not own
    pub fn set_is_navigating(&mut self, navigating: bool) {
        self.external_navigating = navigating;
    }

    pub fn highest_issued_token(&self) -> u64 {
        self.issued
    }

    pub fn highest_committed_token(&self) -> u64 {
        self.committed
    }

    /// Load `path` as a new view
    pub fn navigate(&mut self, path: impl Into<String>, history: HistoryMode) -> NavigationTicket {
        let path = path.into();
        let request = FrameRequest::get(path.clone(), self.overlay);
        self.begin(path, history, TransitionKind::NewView, request, 0)
    }

    /// Load the history entry behind the cursor. The cursor only moves once
    /// the result commits. `None` without history or an earlier entry.
    pub fn back(&mut self) -> Option<NavigationTicket> {
        let (index, entry) = self.history.as_ref()?.back_target()?;
        let path = entry.path.clone();
        Some(self.navigate(path, HistoryMode::Traverse(index)))
    }

    /// Load the history entry ahead of the cursor, like [`Self::back`]
    pub fn forward(&mut self) -> Option<NavigationTicket> {
        let (index, entry) = self.history.as_ref()?.forward_target()?;
        let path = entry.path.clone();
        Some(self.navigate(path, HistoryMode::Traverse(index)))
    }

    /// Submit a form to `path`; the answer is a new view pushed onto history
    pub fn submit_form(&mut self, path: impl Into<String>, fields: Vec<(String, String)>) -> NavigationTicket {
        let path = path.into();
        let request = FrameRequest::post(path.clone(), self.overlay, fields);
        self.begin(path, HistoryMode::Push, TransitionKind::NewView, request, 0)
    }

    /// Reload the current view from `path`, replacing the current entry
    pub fn replace_path(&mut self, path: impl Into<String>) -> NavigationTicket {
        let path = path.into();
        let request = FrameRequest::get(path.clone(), self.overlay);
        self.begin(path, HistoryMode::Replace, TransitionKind::SameView, request, 0)
    }

    /// Re-fetch the current path to refresh its props; `None` before the
    /// first frame has been committed.
    pub fn refresh_props(&mut self) -> Option<NavigationTicket> {
        let path = self.current_path()?.to_string();
        Some(self.replace_path(path))
    }

    fn begin(
        &mut self,
        path: String,
        history: HistoryMode,
        kind: TransitionKind,
        request: FrameRequest,
        redirects: u32,
    ) -> NavigationTicket {
        self.issued += 1;
        let token = self.issued;
        if let Some(superseded) = &self.in_flight {
            log::debug!(
                "Navigation {} to {} supersedes {} to {}",
                token,
                path,
                superseded.token,
                superseded.path
            );
        } else {
            log::debug!("Navigation {} to {} ({:?}, {:?})", token, path, kind, history);
        }
        self.in_flight = Some(PendingNavigation {
            token,
            path,
            history,
            kind,
            redirects,
        });
        NavigationTicket { token, request }
    }

    /// Reconcile a finished fetch against the newest issued token
    pub fn complete(&mut self, token: u64, result: Result<Response, FetchError>) -> NavigationOutcome {
        let pending = match self.in_flight.take() {
            Some(pending) if pending.token == token => pending,
            other => {
                self.in_flight = other;
                log::debug!("Dropping stale navigation result {} (newest is {})", token, self.issued);
                return NavigationOutcome::Discarded;
            }
        };

        if let Ok(response) = &result {
            log::debug!("{} answered with {} (token {})", pending.path, response.action(), token);
        }

        match result {
            Ok(Response::Render(render)) => {
                let kept_id = match pending.kind {
                    TransitionKind::SameView => self.current.as_ref().map(|frame| frame.id),
                    TransitionKind::NewView => None,
                };
                let id = match kept_id {
                    Some(id) => id,
                    None => self.mint_frame_id(),
                };
                let (frame, messages) = Frame::from_render(id, pending.path, render);
                let frame = Arc::new(frame);

                if let Some(history) = self.history.as_mut() {
                    let entry = HistoryEntry::new(Arc::clone(&frame));
                    match pending.history {
                        HistoryMode::Push => history.push(entry),
                        HistoryMode::Replace => history.replace(entry),
                        HistoryMode::Traverse(index) => history.traverse(index, entry),
                    }
                }

                log::info!(
                    "Committed {} {} ({:?}, token {})",
                    frame.path,
                    frame.id,
                    pending.kind,
                    token
                );
                self.current = Some(Arc::clone(&frame));
                self.committed = token;

                NavigationOutcome::Committed {
                    frame,
                    kind: pending.kind,
                    messages,
                }
            }
            Ok(Response::Redirect { path }) => {
                if pending.redirects >= MAX_REDIRECTS {
                    log::warn!(
                        "Giving up on {} after {} redirects (last to {})",
                        pending.path,
                        pending.redirects,
                        path
                    );
                    return NavigationOutcome::Failed(ErrorKind::Server);
                }
                log::info!("{} redirected to {}", pending.path, path);
                // Redirects are always followed with a GET
                let request = FrameRequest::get(path.clone(), self.overlay);
                let ticket = self.begin(path, pending.history, pending.kind, request, pending.redirects + 1);
                NavigationOutcome::Redirected(ticket)
            }
            Ok(Response::Reload) => {
                log::info!("Server requested a reload of {}", pending.path);
                NavigationOutcome::ReloadRequested { path: pending.path }
            }
            Ok(Response::CloseOverlay) => NavigationOutcome::CloseOverlayRequested,
            Err(error) => {
                log::warn!("Navigation to {} failed: {}", pending.path, error);
                NavigationOutcome::Failed(error.kind())
            }
        }
    }

    fn mint_frame_id(&mut self) -> FrameId {
        let id = FrameId(self.next_frame_id);
        self.next_frame_id += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::Method;
    use crate::frame::Metadata;
    use serde_json::{Value, json};

    fn render(title: &str) -> Result<Response, FetchError> {
        Ok(Response::Render(RenderResponse {
            view: "Page".to_string(),
            overlay: false,
            metadata: Metadata { title: title.to_string() },
            props: json!({ "title": title }),
            context: Value::Null,
            messages: Vec::new(),
        }))
    }

    fn committed_path(outcome: &NavigationOutcome) -> Option<&str> {
        match outcome {
            NavigationOutcome::Committed { frame, .. } => Some(frame.path.as_str()),
            _ => None,
        }
    }

    #[test]
    fn test_navigate_commits_and_pushes_history() {
        let mut nav = NavigationController::primary();
        let ticket = nav.navigate("/a", HistoryMode::Push);
        assert!(nav.is_loading());
        assert_eq!(ticket.request, FrameRequest::get("/a", false));

        let outcome = nav.complete(ticket.token, render("A"));
        assert_eq!(committed_path(&outcome), Some("/a"));
        assert!(!nav.is_loading());
        assert_eq!(nav.current_path(), Some("/a"));
        assert_eq!(nav.history().unwrap().len(), 1);
        assert_eq!(nav.highest_committed_token(), ticket.token);
    }

    #[test]
    fn test_later_request_wins_regardless_of_resolution_order() {
        let mut nav = NavigationController::primary();
        let a = nav.navigate("/a", HistoryMode::Push);
        let b = nav.navigate("/b", HistoryMode::Push);

        let outcome_b = nav.complete(b.token, render("B"));
        let outcome_a = nav.complete(a.token, render("A"));

        assert_eq!(committed_path(&outcome_b), Some("/b"));
        assert_eq!(outcome_a, NavigationOutcome::Discarded);
        assert_eq!(nav.current_path(), Some("/b"));
        assert_eq!(nav.history().unwrap().len(), 1);
    }

    #[test]
    fn test_earlier_result_cannot_commit_while_newer_is_in_flight() {
        let mut nav = NavigationController::primary();
        let a = nav.navigate("/a", HistoryMode::Push);
        let b = nav.navigate("/b", HistoryMode::Push);

        assert_eq!(nav.complete(a.token, render("A")), NavigationOutcome::Discarded);
        assert!(nav.current_frame().is_none());
        assert!(nav.is_loading());

        assert_eq!(committed_path(&nav.complete(b.token, render("B"))), Some("/b"));
    }

    #[test]
    fn test_stale_failures_are_not_reported() {
        let mut nav = NavigationController::primary();
        let a = nav.navigate("/a", HistoryMode::Push);
        let b = nav.navigate("/b", HistoryMode::Push);

        let outcome = nav.complete(a.token, Err(FetchError::network("refused")));
        assert_eq!(outcome, NavigationOutcome::Discarded);
        assert!(nav.is_loading());

        nav.complete(b.token, render("B"));
        assert!(!nav.is_loading());
    }

    #[test]
    fn test_failure_leaves_frame_and_history_untouched() {
        let mut nav = NavigationController::primary();
        let first = nav.navigate("/a", HistoryMode::Push);
        nav.complete(first.token, render("A"));

        let second = nav.navigate("/b", HistoryMode::Push);
        let outcome = nav.complete(second.token, Err(FetchError::from_status_code(500)));

        assert_eq!(outcome, NavigationOutcome::Failed(ErrorKind::Server));
        assert_eq!(nav.current_path(), Some("/a"));
        assert_eq!(nav.history().unwrap().len(), 1);
        assert!(!nav.is_loading());
    }

    #[test]
    fn test_replace_history_does_not_grow_stack() {
        let mut nav = NavigationController::primary();
        let a = nav.navigate("/a", HistoryMode::Push);
        nav.complete(a.token, render("A"));
        let b = nav.navigate("/b", HistoryMode::Replace);
        nav.complete(b.token, render("B"));

        let history = nav.history().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history.current().unwrap().path, "/b");
    }

    #[test]
    fn test_same_view_keeps_frame_id_new_view_mints_one() {
        let mut nav = NavigationController::primary();
        let a = nav.navigate("/a", HistoryMode::Push);
        nav.complete(a.token, render("A"));
        let first_id = nav.current_frame().unwrap().id;

        let refresh = nav.refresh_props().unwrap();
        let outcome = nav.complete(refresh.token, render("A, refreshed"));
        assert!(matches!(outcome, NavigationOutcome::Committed { kind: TransitionKind::SameView, .. }));
        assert_eq!(nav.current_frame().unwrap().id, first_id);
        assert_eq!(nav.current_frame().unwrap().title(), "A, refreshed");

        let b = nav.navigate("/b", HistoryMode::Push);
        nav.complete(b.token, render("B"));
        assert!(nav.current_frame().unwrap().id > first_id);
    }

    #[test]
    fn test_refresh_props_needs_a_frame() {
        let mut nav = NavigationController::primary();
        assert!(nav.refresh_props().is_none());
        assert_eq!(nav.highest_issued_token(), 0);
    }

    #[test]
    fn test_submit_form_posts() {
        let mut nav = NavigationController::primary();
        let fields = vec![("title".to_string(), "Hello".to_string())];
        let ticket = nav.submit_form("/posts/add/", fields.clone());
        assert_eq!(ticket.request.method, Method::Post(fields));
    }

    #[test]
    fn test_redirect_issues_follow_up_with_same_mode() {
        let mut nav = NavigationController::primary();
        let ticket = nav.navigate("/old", HistoryMode::Push);
        let outcome = nav.complete(ticket.token, Ok(Response::Redirect { path: "/new".to_string() }));

        let NavigationOutcome::Redirected(follow_up) = outcome else {
            panic!("expected a redirect, got {:?}", outcome);
        };
        assert!(follow_up.token > ticket.token);
        assert_eq!(follow_up.request.path, "/new");
        assert!(nav.is_loading());

        nav.complete(follow_up.token, render("New"));
        assert_eq!(nav.current_path(), Some("/new"));
        assert_eq!(nav.history().unwrap().len(), 1);
    }

    #[test]
    fn test_redirect_loop_fails_after_cap() {
        let mut nav = NavigationController::primary();
        let mut ticket = nav.navigate("/loop", HistoryMode::Push);

        for _ in 0..MAX_REDIRECTS {
            let outcome = nav.complete(ticket.token, Ok(Response::Redirect { path: "/loop".to_string() }));
            let NavigationOutcome::Redirected(follow_up) = outcome else {
                panic!("expected a redirect, got {:?}", outcome);
            };
            ticket = follow_up;
        }

        let outcome = nav.complete(ticket.token, Ok(Response::Redirect { path: "/loop".to_string() }));
        assert_eq!(outcome, NavigationOutcome::Failed(ErrorKind::Server));
        assert!(!nav.is_loading());
        assert!(nav.current_frame().is_none());
        assert!(nav.history().unwrap().is_empty());
    }

    #[test]
    fn test_redirect_count_restarts_with_each_navigation() {
        let mut nav = NavigationController::primary();
        let mut ticket = nav.navigate("/a", HistoryMode::Push);
        for _ in 0..MAX_REDIRECTS {
            match nav.complete(ticket.token, Ok(Response::Redirect { path: "/a".to_string() })) {
                NavigationOutcome::Redirected(follow_up) => ticket = follow_up,
                other => panic!("expected a redirect, got {:?}", other),
            }
        }
        nav.complete(ticket.token, render("A"));

        let fresh = nav.navigate("/b", HistoryMode::Push);
        let outcome = nav.complete(fresh.token, Ok(Response::Redirect { path: "/c".to_string() }));
        assert!(matches!(outcome, NavigationOutcome::Redirected(_)));
    }

    #[test]
    fn test_back_moves_cursor_only_on_commit() {
        let mut nav = NavigationController::primary();
        for path in ["/a", "/b"] {
            let ticket = nav.navigate(path, HistoryMode::Push);
            nav.complete(ticket.token, render(path));
        }

        let failing = nav.back().unwrap();
        assert_eq!(failing.request.path, "/a");
        assert_eq!(nav.history().unwrap().cursor(), Some(1));
        assert_eq!(
            nav.complete(failing.token, Err(FetchError::network("refused"))),
            NavigationOutcome::Failed(ErrorKind::Network)
        );
        assert_eq!(nav.history().unwrap().cursor(), Some(1));
        assert_eq!(nav.history().unwrap().current().unwrap().path, "/b");
        assert_eq!(nav.current_path(), Some("/b"));

        let retry = nav.back().unwrap();
        nav.complete(retry.token, render("A again"));
        let history = nav.history().unwrap();
        assert_eq!(history.cursor(), Some(0));
        assert_eq!(history.len(), 2);
        assert_eq!(nav.current_path(), Some("/a"));
        assert!(nav.back().is_none());

        let forward = nav.forward().unwrap();
        assert_eq!(forward.request.path, "/b");
    }

    #[test]
    fn test_nested_controller_cannot_traverse() {
        let (mut nav, _) = NavigationController::nested(
            "/overlay/",
            RenderResponse {
                view: "Modal".to_string(),
                overlay: true,
                metadata: Metadata::default(),
                props: Value::Null,
                context: Value::Null,
                messages: Vec::new(),
            },
        );
        assert!(nav.back().is_none());
        assert!(nav.forward().is_none());
        assert!(!nav.is_loading());
    }

    #[test]
    fn test_reload_reports_requested_path() {
        let mut nav = NavigationController::primary();
        let ticket = nav.navigate("/a", HistoryMode::Push);
        assert_eq!(
            nav.complete(ticket.token, Ok(Response::Reload)),
            NavigationOutcome::ReloadRequested { path: "/a".to_string() }
        );
        assert!(!nav.is_loading());
    }

    #[test]
    fn test_external_busy_flag() {
        let mut nav = NavigationController::primary();
        nav.set_is_navigating(true);
        assert!(nav.is_loading());

        let ticket = nav.navigate("/a", HistoryMode::Push);
        nav.complete(ticket.token, render("A"));
        assert!(nav.is_loading(), "overlay fetch still holds the busy flag");

        nav.set_is_navigating(false);
        assert!(!nav.is_loading());
    }

    #[test]
    fn test_nested_controller_has_no_history() {
        let (mut nav, _) = NavigationController::nested(
            "/overlay/",
            RenderResponse {
                view: "Modal".to_string(),
                overlay: true,
                metadata: Metadata::default(),
                props: Value::Null,
                context: Value::Null,
                messages: Vec::new(),
            },
        );
        assert!(nav.history().is_none());
        assert!(nav.is_overlay());
        assert_eq!(nav.current_path(), Some("/overlay/"));

        let ticket = nav.navigate("/overlay/step-2/", HistoryMode::Push);
        assert!(ticket.request.overlay);
        nav.complete(ticket.token, render("Step 2"));
        assert_eq!(nav.current_path(), Some("/overlay/step-2/"));
        assert!(nav.history().is_none());
    }
}
