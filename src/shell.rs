//! The application shell
//!
//! [`Shell`] wires the navigation controller, the overlay manager, the
//! dirty-form guard and the message queue to a [`FrameFetcher`]. Every
//! operation that needs the network pushes a future onto an in-flight set;
//! [`Shell::process_next`] awaits whichever resolves first and applies it.
//! Which result may commit is decided by sequence tokens alone, so
//! completions can be applied in any order.

use crate::config::Config;
use crate::dirty_form::{ConfirmPrompt, DirtyFormContext, DirtyFormGuard};
use crate::fetch::{ErrorKind, FetchError, FrameFetcher, FrameRequest};
use crate::frame::{Frame, Message, Response};
use crate::history::SessionHistory;
use crate::messages::MessageQueue;
use crate::navigation::{
    HistoryMode, MAX_REDIRECTS, NavigationController, NavigationOutcome, NavigationTicket, TransitionKind,
};
use crate::overlay::{OnClose, OverlayId, OverlayManager, OverlayOpenOutcome, OverlayRenderer, OverlayState};
use futures::future::{BoxFuture, FutureExt};
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;

/// Receives the kind of every fetch failure that was eligible to commit
pub type ServerErrorListener = Box<dyn FnMut(ErrorKind)>;

/// What applying one completed fetch did to the shell
#[derive(Debug, Clone, PartialEq)]
pub enum ShellUpdate {
    /// The primary view committed a new frame
    Navigated { frame: Arc<Frame>, kind: TransitionKind },

    /// A redirect was followed with a new fetch
    Redirected { path: String },

    /// The service asked for a reload; the shell is re-navigating to `path`
    Reloading { path: String },

    OverlayOpened { id: OverlayId, replaced: Option<OverlayId> },

    /// The service declined to open the overlay
    OverlayOpenCancelled,

    /// The overlay's nested controller committed a new frame
    OverlayNavigated { id: OverlayId, frame: Arc<Frame> },

    /// The service asked the overlay to close; it stays mounted until
    /// [`Shell::complete_overlay_close`]
    OverlayCloseRequested(OverlayId),

    Failed(ErrorKind),

    /// The result was superseded, or its overlay is gone
    Discarded,

    /// The result carried an action that makes no sense where it arrived
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Primary,
    Overlay(OverlayId),
    OverlayOpen,
}

struct Completion {
    target: Target,
    token: u64,
    result: Result<Response, FetchError>,
}

pub struct Shell {
    fetcher: Arc<dyn FrameFetcher>,
    config: Config,
    guard: DirtyFormGuard,
    prompt: Box<dyn ConfirmPrompt>,
    navigation: NavigationController,
    overlay: OverlayManager,
    messages: MessageQueue,
    pending: FuturesUnordered<BoxFuture<'static, Completion>>,
    on_server_error: Option<ServerErrorListener>,

    /// Reload answers since the primary view last committed
    reloads: u32,
}

impl Shell {
    pub fn new(fetcher: Arc<dyn FrameFetcher>, config: Config, prompt: impl ConfirmPrompt + 'static) -> Self {
        Self {
            fetcher,
            config,
            guard: DirtyFormGuard::new(),
            prompt: Box::new(prompt),
            navigation: NavigationController::primary(),
            overlay: OverlayManager::new(),
            messages: MessageQueue::new(),
            pending: FuturesUnordered::new(),
            on_server_error: None,
            reloads: 0,
        }
    }

    pub fn set_server_error_listener(&mut self, listener: impl FnMut(ErrorKind) + 'static) {
        self.on_server_error = Some(Box::new(listener));
    }

    // Accessors

    pub fn current_frame(&self) -> Option<&Arc<Frame>> {
        self.navigation.current_frame()
    }

    pub fn navigation(&self) -> &NavigationController {
        &self.navigation
    }

    pub fn history(&self) -> Option<&SessionHistory> {
        self.navigation.history()
    }

    pub fn overlay(&self) -> Option<&OverlayState> {
        self.overlay.current()
    }

    pub fn messages(&self) -> &MessageQueue {
        &self.messages
    }

    pub fn is_loading(&self) -> bool {
        self.navigation.is_loading()
    }

    pub fn pending_fetches(&self) -> usize {
        self.pending.len()
    }

    pub fn guard(&self) -> &DirtyFormGuard {
        &self.guard
    }

    pub fn should_block_unload(&self) -> bool {
        self.guard.should_block_unload()
    }

    /// Context handed to forms mounted in the primary view
    pub fn primary_form_context(&self) -> DirtyFormContext {
        self.guard.context(self.guard.root())
    }

    /// Context handed to forms mounted in the open overlay
    pub fn overlay_form_context(&self) -> Option<DirtyFormContext> {
        self.overlay.current().map(|state| self.guard.context(state.scope()))
    }

    // Primary view

    /// Follow a link in the primary view, asking first if unsaved edits
    /// would be lost. Returns false when the user declined.
    pub fn follow_link(&mut self, path: impl Into<String>) -> bool {
        if !self.guard.confirm_discard(self.guard.root(), &*self.prompt) {
            return false;
        }
        self.navigate(path, HistoryMode::Push);
        true
    }

    /// Navigate the primary view without consulting the guard
    pub fn navigate(&mut self, path: impl Into<String>, history: HistoryMode) {
        let ticket = self.navigation.navigate(path, history);
        self.spawn(Target::Primary, ticket.token, ticket.request);
    }

    pub fn submit_form(&mut self, path: impl Into<String>, fields: Vec<(String, String)>) {
        let ticket = self.navigation.submit_form(path, fields);
        self.spawn(Target::Primary, ticket.token, ticket.request);
    }

    pub fn replace_path(&mut self, path: impl Into<String>) {
        let ticket = self.navigation.replace_path(path);
        self.spawn(Target::Primary, ticket.token, ticket.request);
    }

    /// Returns false when there is no frame to refresh yet
    pub fn refresh_props(&mut self) -> bool {
        let ticket = self.navigation.refresh_props();
        self.spawn_primary(ticket)
    }

    /// The browser's back button. False when there is nowhere to go or the
    /// user chose to keep unsaved edits; the cursor moves once the entry loads.
    pub fn back(&mut self) -> bool {
        if !self.history().is_some_and(SessionHistory::can_go_back) {
            return false;
        }
        if !self.guard.confirm_discard(self.guard.root(), &*self.prompt) {
            return false;
        }
        let ticket = self.navigation.back();
        self.spawn_primary(ticket)
    }

    /// The browser's forward button, guarded like [`Self::back`]
    pub fn forward(&mut self) -> bool {
        if !self.history().is_some_and(SessionHistory::can_go_forward) {
            return false;
        }
        if !self.guard.confirm_discard(self.guard.root(), &*self.prompt) {
            return false;
        }
        let ticket = self.navigation.forward();
        self.spawn_primary(ticket)
    }

    /// The address changed to `path` outside the shell; load it in place.
    /// False when the user chose to keep unsaved edits.
    pub fn handle_history_change(&mut self, path: impl Into<String>) -> bool {
        if !self.guard.confirm_discard(self.guard.root(), &*self.prompt) {
            return false;
        }
        self.navigate(path, HistoryMode::Replace);
        true
    }

    fn spawn_primary(&mut self, ticket: Option<NavigationTicket>) -> bool {
        match ticket {
            Some(ticket) => {
                self.spawn(Target::Primary, ticket.token, ticket.request);
                true
            }
            None => false,
        }
    }

    // Overlay

    pub fn open_overlay(&mut self, path: impl Into<String>, renderer: OverlayRenderer, on_close: Option<OnClose>) {
        let ticket = self.overlay.begin_open(path, renderer, on_close, &mut self.navigation);
        self.spawn(Target::OverlayOpen, ticket.token, ticket.request);
    }

    /// Follow a link inside the overlay, asking first if the overlay's own
    /// forms hold unsaved edits
    pub fn overlay_follow_link(&mut self, path: impl Into<String>) -> bool {
        let Some(scope) = self.overlay.current().map(OverlayState::scope) else {
            return false;
        };
        if !self.guard.confirm_discard(scope, &*self.prompt) {
            return false;
        }
        self.overlay_navigate(path)
    }

    /// Navigate inside the overlay; false when no overlay is open
    pub fn overlay_navigate(&mut self, path: impl Into<String>) -> bool {
        let Some(state) = self.overlay.current_mut() else {
            return false;
        };
        let id = state.id();
        let ticket = state.controller_mut().navigate(path, HistoryMode::Push);
        self.spawn(Target::Overlay(id), ticket.token, ticket.request);
        true
    }

    pub fn overlay_refresh(&mut self) -> bool {
        let Some(state) = self.overlay.current_mut() else {
            return false;
        };
        let id = state.id();
        match state.controller_mut().refresh_props() {
            Some(ticket) => {
                self.spawn(Target::Overlay(id), ticket.token, ticket.request);
                true
            }
            None => false,
        }
    }

    /// Ask to close the overlay, checking its forms for unsaved edits first.
    /// The overlay stays mounted until [`complete_overlay_close`](Self::complete_overlay_close).
    pub fn request_overlay_close(&mut self) -> bool {
        let Some(scope) = self.overlay.current().map(OverlayState::scope) else {
            return false;
        };
        if !self.guard.confirm_discard(scope, &*self.prompt) {
            return false;
        }
        self.overlay.request_close()
    }

    /// Signal that the overlay's exit transition has finished
    pub fn complete_overlay_close(&mut self) -> bool {
        self.overlay.complete_close(&self.guard)
    }

    // Completions

    /// Wait for the next in-flight fetch and apply it. `None` once nothing
    /// is in flight.
    pub async fn process_next(&mut self) -> Option<ShellUpdate> {
        let completion = self.pending.next().await?;
        Some(self.apply(completion))
    }

    /// Apply completions until nothing is in flight, including follow-up
    /// fetches issued along the way
    pub async fn settle(&mut self) -> Vec<ShellUpdate> {
        let mut updates = Vec::new();
        while let Some(update) = self.process_next().await {
            updates.push(update);
        }
        updates
    }

    fn spawn(&mut self, target: Target, token: u64, request: FrameRequest) {
        let fetcher = Arc::clone(&self.fetcher);
        let unpack = Arc::clone(&self.config.unpack);
        let future = async move {
            let result = match fetcher.fetch(request).await {
                Ok(value) => unpack(value).map_err(|e| FetchError::server(None, format!("{:#}", e))),
                Err(e) => Err(e),
            };
            Completion { target, token, result }
        };
        self.pending.push(future.boxed());
    }

    fn apply(&mut self, completion: Completion) -> ShellUpdate {
        let Completion { target, token, result } = completion;
        match target {
            Target::Primary => self.apply_primary(token, result),
            Target::Overlay(id) => self.apply_overlay(id, token, result),
            Target::OverlayOpen => self.apply_overlay_open(token, result),
        }
    }

    fn apply_primary(&mut self, token: u64, result: Result<Response, FetchError>) -> ShellUpdate {
        match self.navigation.complete(token, result) {
            NavigationOutcome::Committed { frame, kind, messages } => {
                self.reloads = 0;
                if kind == TransitionKind::NewView {
                    self.messages.clear();
                    self.overlay.force_close(&self.guard);
                }
                self.messages.extend(messages);
                ShellUpdate::Navigated { frame, kind }
            }
            NavigationOutcome::Redirected(ticket) => {
                let path = ticket.request.path.clone();
                self.spawn(Target::Primary, ticket.token, ticket.request);
                ShellUpdate::Redirected { path }
            }
            NavigationOutcome::ReloadRequested { path } => self.reload(path),
            NavigationOutcome::CloseOverlayRequested => {
                log::warn!("Ignoring close-overlay response to a primary navigation");
                ShellUpdate::Ignored
            }
            NavigationOutcome::Failed(kind) => self.report_error(kind),
            NavigationOutcome::Discarded => ShellUpdate::Discarded,
        }
    }

    fn apply_overlay(&mut self, id: OverlayId, token: u64, result: Result<Response, FetchError>) -> ShellUpdate {
        let outcome = match self.overlay.current_mut() {
            Some(state) if state.id() == id => state.controller_mut().complete(token, result),
            _ => {
                log::debug!("Dropping result {} for overlay {:?}, which is no longer open", token, id);
                return ShellUpdate::Discarded;
            }
        };

        match outcome {
            NavigationOutcome::Committed { frame, messages, .. } => {
                self.messages.extend(messages);
                ShellUpdate::OverlayNavigated { id, frame }
            }
            NavigationOutcome::Redirected(ticket) => {
                let path = ticket.request.path.clone();
                self.spawn(Target::Overlay(id), ticket.token, ticket.request);
                ShellUpdate::Redirected { path }
            }
            NavigationOutcome::ReloadRequested { path } => self.reload_primary_or(path),
            NavigationOutcome::CloseOverlayRequested => {
                self.overlay.request_close();
                ShellUpdate::OverlayCloseRequested(id)
            }
            NavigationOutcome::Failed(kind) => self.report_error(kind),
            NavigationOutcome::Discarded => ShellUpdate::Discarded,
        }
    }

    fn apply_overlay_open(&mut self, token: u64, result: Result<Response, FetchError>) -> ShellUpdate {
        match self.overlay.complete_open(token, result, &mut self.navigation, &self.guard) {
            OverlayOpenOutcome::Opened { id, replaced, messages } => {
                self.messages.extend(messages);
                ShellUpdate::OverlayOpened { id, replaced }
            }
            OverlayOpenOutcome::Redirected(ticket) => {
                let path = ticket.request.path.clone();
                self.spawn(Target::OverlayOpen, ticket.token, ticket.request);
                ShellUpdate::Redirected { path }
            }
            OverlayOpenOutcome::ReloadRequested { path } => self.reload_primary_or(path),
            OverlayOpenOutcome::Cancelled => ShellUpdate::OverlayOpenCancelled,
            OverlayOpenOutcome::Failed(kind) => self.report_error(kind),
            OverlayOpenOutcome::Discarded => ShellUpdate::Discarded,
        }
    }

    /// A reload asked for from inside an overlay reloads the primary view
    fn reload_primary_or(&mut self, fallback: String) -> ShellUpdate {
        let path = match self.navigation.current_path() {
            Some(path) => path.to_string(),
            None => fallback,
        };
        self.reload(path)
    }

    fn reload(&mut self, path: String) -> ShellUpdate {
        if self.reloads >= MAX_REDIRECTS {
            log::warn!("Giving up on {} after {} reloads", path, self.reloads);
            self.reloads = 0;
            return self.report_error(ErrorKind::Server);
        }
        self.reloads += 1;
        log::info!("Reloading {}", path);
        self.messages.clear();
        self.overlay.force_close(&self.guard);
        let history = if self.navigation.current_path() == Some(path.as_str()) {
            HistoryMode::Replace
        } else {
            HistoryMode::Push
        };
        self.navigate(path.clone(), history);
        ShellUpdate::Reloading { path }
    }

    fn report_error(&mut self, kind: ErrorKind) -> ShellUpdate {
        self.messages.push(Message::error(kind.user_message()));
        if let Some(listener) = self.on_server_error.as_mut() {
            listener(kind);
        }
        ShellUpdate::Failed(kind)
    }
}
