//! Core library surface for the Recipe Finder TUI application.
//!
//! The public modules exposed here provide an intentionally small API so
//! the `bin` target as well as the test suites can reuse the same pieces:
//! the API client, the search and playback controllers, and the Ratatui
//! front-end.

pub mod api;
pub mod models;
pub mod prefs;
pub mod search;
pub mod speech;
pub mod ui;

/// The HTTP collaborator used by the production search controller.
pub use api::RecipeApi;

/// The primary domain type other layers pass around.
pub use models::Recipe;

/// Preference store initialization, typically called from `main.rs`.
pub use prefs::ensure_schema;

/// The two controllers that hold all mutable page state.
pub use search::SearchController;
pub use speech::PlaybackController;

/// The interactive application entry point and state container.
pub use ui::{run_app, App};
