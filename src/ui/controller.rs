//! Headless suggestion UI state machine.
//!
//! [`SuggestionController`] owns the [`SearchRuntime`] and drives a
//! [`SuggestionSurface`], the seam behind which a host renders the actual
//! input box and suggestion list. The controller never touches a DOM or a
//! terminal; it receives the host's events (`on_key`, `on_input_changed`,
//! clicks, focus) and answers with surface effects, so the whole state
//! machine is testable with a recording surface.
//!
//! Two invariants hold at every point between method calls:
//!
//! - the expanded-state accessibility flag pushed through
//!   [`SuggestionSurface::set_expanded`] equals "the controller is in
//!   [`Phase::Suggesting`]";
//! - only the response to the most recently issued query is applied to the
//!   surface; stale responses are discarded, not reordered.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::model::Suggestion;
use crate::search::fetch::ShardFetcher;
use crate::search::runtime::SearchRuntime;

/// Suggestions rendered per query unless configured otherwise.
pub const DEFAULT_SUGGESTION_LIMIT: usize = 10;

/// Keys the controller reacts to. Anything else is the host's business.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// `/`, the global shortcut that reaches the search input.
    Slash,
    Escape,
    ArrowDown,
    ArrowUp,
}

/// Controller phase. The suggestion list is visible exactly in `Suggesting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Suggesting,
}

/// Effects the controller asks its host to perform.
///
/// Implementations use interior mutability; every method takes `&self` so a
/// surface can be driven from the controller's shared reference.
pub trait SuggestionSurface {
    fn focus_input(&self);
    fn blur_input(&self);
    fn scroll_input_into_view(&self);
    fn render_suggestions(&self, suggestions: &[Suggestion]);
    fn clear_suggestions(&self);
    /// Mirror of the expanded-state accessibility attribute on the input.
    fn set_expanded(&self, expanded: bool);
    /// Move visual focus to the suggestion at `index`.
    fn focus_suggestion(&self, index: usize);
}

/// Tuning knobs for a controller instance.
#[derive(Debug, Clone)]
pub struct ControllerOptions {
    /// Maximum suggestions rendered per query.
    pub limit: usize,
    /// Client save-data preference. Only an explicit `true` defers artifact
    /// loading from input focus to the first input event; `false` and
    /// unknown both load eagerly.
    pub save_data: Option<bool>,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self { limit: DEFAULT_SUGGESTION_LIMIT, save_data: None }
    }
}

struct ControllerState {
    phase: Phase,
    input_focused: bool,
    focused_suggestion: Option<usize>,
    suggestion_count: usize,
}

/// Event-driven glue between a host surface and the search runtime.
pub struct SuggestionController<F, S> {
    runtime: SearchRuntime<F>,
    surface: S,
    options: ControllerOptions,
    state: Mutex<ControllerState>,
    latest_query: AtomicU64,
}

impl<F: ShardFetcher, S: SuggestionSurface> SuggestionController<F, S> {
    pub fn new(runtime: SearchRuntime<F>, surface: S, options: ControllerOptions) -> Self {
        Self {
            runtime,
            surface,
            options,
            state: Mutex::new(ControllerState {
                phase: Phase::Idle,
                input_focused: false,
                focused_suggestion: None,
                suggestion_count: 0,
            }),
            latest_query: AtomicU64::new(0),
        }
    }

    pub fn phase(&self) -> Phase {
        self.state.lock().phase
    }

    pub fn focused_suggestion(&self) -> Option<usize> {
        self.state.lock().focused_suggestion
    }

    pub fn runtime(&self) -> &SearchRuntime<F> {
        &self.runtime
    }

    /// The input received focus.
    ///
    /// Loads the artifact now unless the client asked to save data, in which
    /// case loading waits for the first input event.
    pub async fn on_input_focus(&self) {
        self.state.lock().input_focused = true;
        if self.options.save_data == Some(true) {
            tracing::debug!("artifact_load_deferred");
            return;
        }
        let _ = self.runtime.ensure_loaded().await;
    }

    /// The input lost focus. The list, if any, stays until dismissed.
    pub fn on_input_blur(&self) {
        self.state.lock().input_focused = false;
    }

    /// A key event from the host. Returns whether the controller consumed it
    /// (consumed keys should not reach the page's default handling).
    pub fn on_key(&self, key: Key) -> bool {
        let mut state = self.state.lock();
        match key {
            Key::Slash => {
                if state.input_focused {
                    // Let the slash be typed.
                    return false;
                }
                self.surface.focus_input();
                self.surface.scroll_input_into_view();
                true
            }
            Key::Escape => {
                if !state.input_focused {
                    return false;
                }
                state.input_focused = false;
                self.surface.blur_input();
                self.dismiss(&mut state);
                true
            }
            Key::ArrowDown | Key::ArrowUp => {
                if state.phase != Phase::Suggesting || state.suggestion_count == 0 {
                    return false;
                }
                let last = state.suggestion_count - 1;
                let down = key == Key::ArrowDown;
                let next = match state.focused_suggestion {
                    // Entering the list from the input lands on the first entry.
                    None => 0,
                    Some(current) if down => current.saturating_add(1).min(last),
                    Some(current) => current.saturating_sub(1),
                };
                state.focused_suggestion = Some(next);
                self.surface.focus_suggestion(next);
                true
            }
        }
    }

    /// The input's text changed.
    ///
    /// Ensures the artifact load has been attempted (a memoized no-op after
    /// the first call), evaluates the query, and applies the result only if
    /// no newer input event has been issued meanwhile.
    pub async fn on_input_changed(&self, text: &str) {
        let seq = self.latest_query.fetch_add(1, Ordering::SeqCst) + 1;
        let _ = self.runtime.ensure_loaded().await;
        let suggestions = self.runtime.search(text, self.options.limit);

        let mut state = self.state.lock();
        if self.latest_query.load(Ordering::SeqCst) != seq {
            tracing::trace!(seq, "stale_query_discarded");
            return;
        }
        self.apply(&mut state, &suggestions);
    }

    /// A suggestion was activated. The host performs the navigation; the
    /// controller only puts the list away.
    pub fn on_suggestion_click(&self) {
        let mut state = self.state.lock();
        self.dismiss(&mut state);
    }

    /// A click landed outside the suggestion container.
    pub fn on_outside_click(&self) {
        let mut state = self.state.lock();
        if state.phase == Phase::Suggesting {
            self.dismiss(&mut state);
        }
    }

    fn apply(&self, state: &mut ControllerState, suggestions: &[Suggestion]) {
        if suggestions.is_empty() {
            self.dismiss(state);
        } else {
            state.phase = Phase::Suggesting;
            state.suggestion_count = suggestions.len();
            state.focused_suggestion = None;
            self.surface.render_suggestions(suggestions);
            self.surface.set_expanded(true);
        }
    }

    fn dismiss(&self, state: &mut ControllerState) {
        state.phase = Phase::Idle;
        state.suggestion_count = 0;
        state.focused_suggestion = None;
        self.surface.clear_suggestions();
        self.surface.set_expanded(false);
    }
}
