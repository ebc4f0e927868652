//! Binary entry point that glues the controllers to the TUI. The
//! bootstrapping pipeline: initialize logging, open the preference store,
//! build the HTTP client, seed the initial example search, and drive the
//! Ratatui event loop until the user exits.

use recipe_finder::{
    ensure_schema, prefs, run_app, App, PlaybackController, RecipeApi, SearchController,
};

/// Initialize persistence and collaborators, then launch the event loop.
///
/// Returning a `Result` bubbles up fatal initialization problems (for
/// example an unwritable home directory) to the terminal instead of
/// crashing silently.
fn main() -> anyhow::Result<()> {
    env_logger::init();

    let conn = ensure_schema()?;
    let dark_mode = prefs::load_dark_mode(&conn)?;

    let api = RecipeApi::new()?;
    let mut search = SearchController::new(api);
    search.initial_search();

    let playback = PlaybackController::detect();

    let mut app = App::new(conn, search, playback, dark_mode);
    run_app(&mut app)
}
