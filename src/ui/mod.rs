//! Suggestion UI layer.
//!
//! - **[`controller`]**: Headless state machine wiring host events to the
//!   search runtime and a rendering surface.

pub mod controller;

pub use controller::{
    ControllerOptions, DEFAULT_SUGGESTION_LIMIT, Key, Phase, SuggestionController,
    SuggestionSurface,
};
