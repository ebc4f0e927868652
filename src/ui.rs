//! Ratatui front-end for the recipe finder. The single page is a header,
//! a search bar, a card grid, and a footer; selecting a card opens a
//! detail modal with ingredient list, instructions, and the speech
//! playback control.

mod app;
mod helpers;
mod screens;
mod terminal;

pub use app::App;
pub use terminal::run_app;
