//! Overlay lifecycle
//!
//! At most one overlay is mounted at a time. Opening one fetches its first
//! frame through the same fetcher as the primary view (while the parent
//! controller is marked busy), then mounts an [`OverlayState`] with its own
//! nested [`NavigationController`] and dirty-form scope.
//!
//! Closing goes through [`CloseReason`]:
//! - `UserRequested`: `request_close` flags the overlay, the caller runs
//!   its exit transition, then `complete_close` unmounts it and fires the
//!   close callback.
//! - `Replaced`: a newer overlay finished opening; the old one is unmounted
//!   through the same path, callback included.
//! - `ForcedByNavigation`: the primary view moved to a new page; the overlay
//!   is unmounted at once and its callback dropped unfired, since the
//!   component that registered it is gone too.

use crate::dirty_form::{DirtyFormGuard, ScopeId};
use crate::fetch::{ErrorKind, FetchError, FrameRequest};
use crate::frame::{Frame, Message, Response};
use crate::navigation::{MAX_REDIRECTS, NavigationController};
use std::fmt;
use std::sync::Arc;

/// Invoked once the overlay has fully closed
pub type OnClose = Box<dyn FnOnce()>;

/// Wraps the overlay's current frame in whatever chrome the opener wants
pub type OverlayRenderer = Box<dyn Fn(&Frame) -> String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OverlayId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    UserRequested,
    Replaced,
    ForcedByNavigation,
}

impl CloseReason {
    fn runs_close_callback(&self) -> bool {
        match self {
            CloseReason::UserRequested | CloseReason::Replaced => true,
            CloseReason::ForcedByNavigation => false,
        }
    }
}

pub struct OverlayState {
    id: OverlayId,
    initial_path: String,
    controller: NavigationController,
    scope: ScopeId,
    close_requested: bool,
    on_close: Option<OnClose>,
    renderer: OverlayRenderer,
}

impl OverlayState {
    pub fn id(&self) -> OverlayId {
        self.id
    }

    pub fn initial_path(&self) -> &str {
        &self.initial_path
    }

    pub fn controller(&self) -> &NavigationController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut NavigationController {
        &mut self.controller
    }

    /// Dirty-form scope of forms mounted inside the overlay
    pub fn scope(&self) -> ScopeId {
        self.scope
    }

    pub fn close_requested(&self) -> bool {
        self.close_requested
    }

    pub fn frame(&self) -> Option<&Arc<Frame>> {
        self.controller.current_frame()
    }

    /// Render the current frame through the opener's renderer
    pub fn render(&self) -> Option<String> {
        self.frame().map(|frame| (self.renderer)(frame))
    }
}

impl fmt::Debug for OverlayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverlayState")
            .field("id", &self.id)
            .field("initial_path", &self.initial_path)
            .field("scope", &self.scope)
            .field("close_requested", &self.close_requested)
            .field("has_close_listener", &self.on_close.is_some())
            .finish_non_exhaustive()
    }
}

struct PendingOpen {
    token: u64,
    path: String,
    renderer: OverlayRenderer,
    on_close: Option<OnClose>,
    redirects: u32,
}

/// The fetch that loads an overlay's first frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayTicket {
    pub token: u64,
    pub request: FrameRequest,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OverlayOpenOutcome {
    Opened {
        id: OverlayId,
        /// Overlay that was unmounted to make room
        replaced: Option<OverlayId>,
        messages: Vec<Message>,
    },

    /// The server redirected; the follow-up fetch has already been issued
    Redirected(OverlayTicket),

    ReloadRequested { path: String },

    /// The server answered the open with `close-overlay`
    Cancelled,

    Failed(ErrorKind),

    /// A newer open superseded this one
    Discarded,
}

#[derive(Default)]
pub struct OverlayManager {
    current: Option<OverlayState>,
    pending_open: Option<PendingOpen>,
    issued: u64,
    next_id: u64,
}

impl OverlayManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&OverlayState> {
        self.current.as_ref()
    }

    pub fn current_mut(&mut self) -> Option<&mut OverlayState> {
        self.current.as_mut()
    }

    pub fn is_open(&self) -> bool {
        self.current.is_some()
    }

    /// True while an open fetch is in flight
    pub fn is_opening(&self) -> bool {
        self.pending_open.is_some()
    }

    /// Start opening an overlay at `path`.
    ///
    /// Marks `parent` busy until the open resolves. A newer call supersedes
    /// an open that is still in flight.
    pub fn begin_open(
        &mut self,
        path: impl Into<String>,
        renderer: OverlayRenderer,
        on_close: Option<OnClose>,
        parent: &mut NavigationController,
    ) -> OverlayTicket {
        let path = path.into();
        self.issued += 1;
        let token = self.issued;
        if let Some(superseded) = &self.pending_open {
            log::debug!("Overlay open {} supersedes {} ({})", token, superseded.token, superseded.path);
        }

        parent.set_is_navigating(true);
        let request = FrameRequest::get(path.clone(), true);
        self.pending_open = Some(PendingOpen {
            token,
            path,
            renderer,
            on_close,
            redirects: 0,
        });
        OverlayTicket { token, request }
    }

    pub fn complete_open(
        &mut self,
        token: u64,
        result: Result<Response, FetchError>,
        parent: &mut NavigationController,
        guard: &DirtyFormGuard,
    ) -> OverlayOpenOutcome {
        let mut pending = match self.pending_open.take() {
            Some(pending) if pending.token == token => pending,
            other => {
                self.pending_open = other;
                log::debug!("Dropping stale overlay open {}", token);
                return OverlayOpenOutcome::Discarded;
            }
        };

        match result {
            Ok(Response::Render(render)) => {
                let scope = match guard.create_root_child() {
                    Ok(scope) => scope,
                    Err(e) => {
                        parent.set_is_navigating(false);
                        log::error!("Cannot mount overlay at {}: {:#}", pending.path, e);
                        return OverlayOpenOutcome::Failed(ErrorKind::Server);
                    }
                };
                let replaced = self.unmount(CloseReason::Replaced, guard);

                let id = OverlayId(self.next_id);
                self.next_id += 1;
                let (controller, messages) = NavigationController::nested(pending.path.clone(), render);

                log::info!("Opened overlay {:?} at {}", id, pending.path);
                self.current = Some(OverlayState {
                    id,
                    initial_path: pending.path,
                    controller,
                    scope,
                    close_requested: false,
                    on_close: pending.on_close,
                    renderer: pending.renderer,
                });
                parent.set_is_navigating(false);

                OverlayOpenOutcome::Opened {
                    id,
                    replaced,
                    messages,
                }
            }
            Ok(Response::Redirect { path }) => {
                if pending.redirects >= MAX_REDIRECTS {
                    parent.set_is_navigating(false);
                    log::warn!("Giving up on overlay at {} after {} redirects", pending.path, pending.redirects);
                    return OverlayOpenOutcome::Failed(ErrorKind::Server);
                }
                log::info!("Overlay open of {} redirected to {}", pending.path, path);
                pending.redirects += 1;
                self.issued += 1;
                pending.token = self.issued;
                pending.path = path.clone();
                let ticket = OverlayTicket {
                    token: pending.token,
                    request: FrameRequest::get(path, true),
                };
                self.pending_open = Some(pending);
                OverlayOpenOutcome::Redirected(ticket)
            }
            Ok(Response::Reload) => {
                parent.set_is_navigating(false);
                OverlayOpenOutcome::ReloadRequested { path: pending.path }
            }
            Ok(Response::CloseOverlay) => {
                parent.set_is_navigating(false);
                log::info!("Server declined to open overlay at {}", pending.path);
                OverlayOpenOutcome::Cancelled
            }
            Err(error) => {
                parent.set_is_navigating(false);
                log::warn!("Opening overlay at {} failed: {}", pending.path, error);
                OverlayOpenOutcome::Failed(error.kind())
            }
        }
    }

    /// Flag the overlay for a user-initiated close; it stays mounted until
    /// [`complete_close`](Self::complete_close). Returns false if nothing is open.
    pub fn request_close(&mut self) -> bool {
        match self.current.as_mut() {
            Some(state) => {
                state.close_requested = true;
                true
            }
            None => false,
        }
    }

    /// Finish a requested close: unmount and run the close callback
    pub fn complete_close(&mut self, guard: &DirtyFormGuard) -> bool {
        match &self.current {
            Some(state) if state.close_requested => {}
            Some(state) => {
                log::debug!("Ignoring close completion for {:?}: no close was requested", state.id);
                return false;
            }
            None => return false,
        }
        self.unmount(CloseReason::UserRequested, guard).is_some()
    }

    /// Unmount immediately without consulting the overlay's dirty forms and
    /// without running its close callback
    pub fn force_close(&mut self, guard: &DirtyFormGuard) -> bool {
        self.unmount(CloseReason::ForcedByNavigation, guard).is_some()
    }

    fn unmount(&mut self, reason: CloseReason, guard: &DirtyFormGuard) -> Option<OverlayId> {
        let mut state = self.current.take()?;
        guard.remove_scope(state.scope);

        let listener = state.on_close.take();
        if reason.runs_close_callback() {
            if let Some(listener) = listener {
                listener();
            }
        } else if listener.is_some() {
            log::debug!("Dropping close listener of overlay {:?}", state.id);
        }

        log::info!("Closed overlay {:?} ({:?})", state.id, reason);
        Some(state.id)
    }
}
