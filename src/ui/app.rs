use std::cmp::min;
use std::mem;

use anyhow::Result;
use crossterm::event::KeyCode;
use open::that as open_link;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::prelude::*;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;
use rusqlite::Connection;

use crate::prefs::save_dark_mode;
use crate::search::SearchController;
use crate::speech::{PlaybackController, PlaybackState};

use super::helpers::{build_recipe_card_lines, centered_rect, palette, surface_error, Palette};
use super::screens::DetailView;

/// Number of recipe cards shown in each row of the grid. Three columns
/// keep the instruction excerpts legible on common terminal sizes.
const GRID_COLUMNS: usize = 3;
/// Vertical space allocated to each card row, borders included.
const CARD_HEIGHT: u16 = 6;
/// Footer space reserved for status messages and key hints.
const FOOTER_HEIGHT: u16 = 3;
/// Height of the bordered search input.
const SEARCH_BAR_HEIGHT: u16 = 3;

/// Interaction modes for the single page. `Searching` routes printable
/// keys into the query; `Detail` owns the modal state.
enum Mode {
    Normal,
    Searching,
    Detail(DetailView),
}

/// Holds the footer message text plus its severity.
struct StatusMessage {
    text: String,
    kind: StatusKind,
}

/// Severity levels shown in the footer.
enum StatusKind {
    Info,
    Error,
}

impl StatusKind {
    fn style(&self) -> Style {
        match self {
            StatusKind::Info => Style::default().fg(Color::Green),
            StatusKind::Error => Style::default().fg(Color::Red),
        }
    }
}

/// Central application state shared across the TUI: the preference store
/// connection, the search controller with its result list, the playback
/// controller, and the active interaction mode.
pub struct App {
    conn: Connection,
    search: SearchController,
    playback: PlaybackController,
    selected: usize,
    dark_mode: bool,
    mode: Mode,
    status: Option<StatusMessage>,
}

impl App {
    pub fn new(
        conn: Connection,
        search: SearchController,
        playback: PlaybackController,
        dark_mode: bool,
    ) -> Self {
        Self {
            conn,
            search,
            playback,
            selected: 0,
            dark_mode,
            mode: Mode::Normal,
            status: None,
        }
    }

    /// Periodic work between key events: fire the debounce window, apply
    /// fetch outcomes, and absorb speech lifecycle events.
    pub(crate) fn tick(&mut self) {
        if self.search.tick() {
            self.clamp_selection();
        }
        self.playback.tick();
    }

    /// Top-level key dispatcher. Every key funnels through the active
    /// `Mode`, which returns the next mode to run. The boolean result
    /// tells the outer loop whether the user requested an exit.
    pub fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        let mut exit = false;
        let mut mode = mem::replace(&mut self.mode, Mode::Normal);

        mode = match mode {
            Mode::Normal => self.handle_normal_key(code, &mut exit)?,
            Mode::Searching => self.handle_search_key(code)?,
            Mode::Detail(view) => self.handle_detail_key(code, view)?,
        };

        self.mode = mode;
        Ok(exit)
    }

    /// Grid navigation plus the page-level shortcuts.
    fn handle_normal_key(&mut self, code: KeyCode, exit: &mut bool) -> Result<Mode> {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => {
                *exit = true;
            }
            KeyCode::Left => self.move_horizontal(-1),
            KeyCode::Right => self.move_horizontal(1),
            KeyCode::Up => self.move_vertical(-1),
            KeyCode::Down => self.move_vertical(1),
            KeyCode::Enter => {
                if let Some(recipe) = self.search.results().get(self.selected).cloned() {
                    self.clear_status();
                    return Ok(Mode::Detail(DetailView::new(recipe)));
                }
                self.set_status("No recipe selected.", StatusKind::Error);
            }
            KeyCode::Char('f') | KeyCode::Char('/') => {
                self.clear_status();
                return Ok(Mode::Searching);
            }
            KeyCode::Char('t') | KeyCode::Char('T') => {
                self.toggle_dark_mode();
            }
            KeyCode::Char('v') | KeyCode::Char('V') => {
                self.open_selected_video();
            }
            _ => {}
        }
        Ok(Mode::Normal)
    }

    /// Keys while the search input has focus. Every edit re-arms the
    /// debounce window; Enter fetches immediately.
    fn handle_search_key(&mut self, code: KeyCode) -> Result<Mode> {
        match code {
            KeyCode::Esc => {
                return Ok(Mode::Normal);
            }
            KeyCode::Enter => {
                self.search.submit();
                return Ok(Mode::Normal);
            }
            KeyCode::Backspace => {
                let mut query = self.search.query().to_string();
                query.pop();
                self.search.set_query(query);
            }
            KeyCode::Char(c) => {
                let mut query = self.search.query().to_string();
                query.push(c);
                self.search.set_query(query);
            }
            _ => {}
        }
        Ok(Mode::Searching)
    }

    /// Keys while the detail modal is open. Closing always routes through
    /// the playback controller so no utterance outlives the modal.
    fn handle_detail_key(&mut self, code: KeyCode, mut view: DetailView) -> Result<Mode> {
        match code {
            KeyCode::Esc | KeyCode::Char('q') => {
                self.playback.close();
                self.clear_status();
                return Ok(Mode::Normal);
            }
            KeyCode::Char('p') | KeyCode::Char(' ') => {
                if !self.playback.available() {
                    self.set_status("Speech synthesizer not available.", StatusKind::Info);
                } else if let Some(instructions) = view.recipe.instructions.clone() {
                    self.playback.toggle(&instructions);
                } else {
                    self.set_status("No instructions to read aloud.", StatusKind::Info);
                }
            }
            KeyCode::Char('v') | KeyCode::Char('V') => {
                if let Some(url) = view.recipe.video_url.clone() {
                    self.open_video(&url, &view.recipe.name);
                } else {
                    self.set_status("This recipe has no video.", StatusKind::Error);
                }
            }
            KeyCode::Up => view.scroll_up(),
            KeyCode::Down => view.scroll_down(),
            _ => {}
        }
        Ok(Mode::Detail(view))
    }

    /// Flip the theme, persist the flag, and confirm in the footer.
    fn toggle_dark_mode(&mut self) {
        self.dark_mode = !self.dark_mode;
        match save_dark_mode(&self.conn, self.dark_mode) {
            Ok(()) => {
                let label = if self.dark_mode {
                    "Dark mode on."
                } else {
                    "Dark mode off."
                };
                self.set_status(label, StatusKind::Info);
            }
            Err(err) => {
                self.set_status(
                    format!("Failed to save theme: {}", surface_error(&err)),
                    StatusKind::Error,
                );
            }
        }
    }

    fn open_selected_video(&mut self) {
        let Some(recipe) = self.search.results().get(self.selected) else {
            self.set_status("No recipe selected.", StatusKind::Error);
            return;
        };
        match recipe.video_url.clone() {
            Some(url) => {
                let name = recipe.name.clone();
                self.open_video(&url, &name);
            }
            None => self.set_status("This recipe has no video.", StatusKind::Error),
        }
    }

    fn open_video(&mut self, url: &str, name: &str) {
        if let Err(err) = open_link(url) {
            self.set_status(format!("Failed to open video: {err}"), StatusKind::Error);
        } else {
            self.set_status(format!("Opened video for {name}."), StatusKind::Info);
        }
    }

    fn move_horizontal(&mut self, delta: isize) {
        let len = self.search.results().len();
        if len == 0 {
            return;
        }
        let new = self.selected as isize + delta;
        if new >= 0 && (new as usize) < len {
            self.selected = new as usize;
        }
    }

    fn move_vertical(&mut self, delta: isize) {
        let len = self.search.results().len();
        if len == 0 {
            return;
        }
        let step = GRID_COLUMNS as isize * delta;
        let new = self.selected as isize + step;
        if new >= 0 && (new as usize) < len {
            self.selected = new as usize;
        }
    }

    /// Keep the selection valid after the result list is replaced.
    fn clamp_selection(&mut self) {
        let len = self.search.results().len();
        if len == 0 {
            self.selected = 0;
        } else {
            self.selected = min(self.selected, len - 1);
        }
    }

    pub(crate) fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        let theme = palette(self.dark_mode);

        frame.render_widget(
            Block::default().style(Style::default().bg(theme.background).fg(theme.text)),
            area,
        );

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(SEARCH_BAR_HEIGHT),
                Constraint::Min(0),
                Constraint::Length(FOOTER_HEIGHT),
            ])
            .split(area);

        self.draw_header(frame, chunks[0], &theme);
        self.draw_search_bar(frame, chunks[1], &theme);
        self.draw_recipe_grid(frame, chunks[2], &theme);
        self.draw_footer(frame, chunks[3], &theme);

        if let Mode::Detail(view) = &self.mode {
            self.draw_detail_modal(frame, area, view, &theme);
        }
    }

    fn draw_header(&self, frame: &mut Frame, area: Rect, theme: &Palette) {
        let theme_label = if self.dark_mode { "dark" } else { "light" };
        let header = Paragraph::new(Line::from(vec![
            Span::styled(
                "Recipe Finder",
                Style::default()
                    .fg(theme.accent)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("  [{theme_label}]"),
                Style::default().fg(theme.dim),
            ),
        ]));
        frame.render_widget(header, area);
    }

    fn draw_search_bar(&self, frame: &mut Frame, area: Rect, theme: &Palette) {
        let searching = matches!(self.mode, Mode::Searching);
        let border_style = if searching {
            Style::default().fg(theme.accent)
        } else {
            Style::default().fg(theme.dim)
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(border_style)
            .title("Search recipes");
        let paragraph = Paragraph::new(Span::styled(
            self.search.query().to_string(),
            Style::default().fg(theme.text),
        ))
        .block(block.clone());
        frame.render_widget(paragraph, area);

        if searching {
            let inner = block.inner(area);
            let cursor_x = inner.x + self.search.query().chars().count() as u16;
            frame.set_cursor_position((min(cursor_x, inner.right().saturating_sub(1)), inner.y));
        }
    }

    fn draw_recipe_grid(&self, frame: &mut Frame, area: Rect, theme: &Palette) {
        let recipes = self.search.results();
        if recipes.is_empty() {
            let message = Paragraph::new("No recipes found.")
                .alignment(Alignment::Center)
                .style(Style::default().fg(theme.dim));
            frame.render_widget(message, area);
            return;
        }

        let visible_rows = (area.height / CARD_HEIGHT).max(1) as usize;
        let selected_row = self.selected / GRID_COLUMNS;
        // Scroll whole rows so the selected card is always on screen.
        let first_row = selected_row.saturating_sub(visible_rows.saturating_sub(1));

        for (slot, row_idx) in (first_row..first_row + visible_rows).enumerate() {
            let row_area = Rect {
                x: area.x,
                y: area.y + slot as u16 * CARD_HEIGHT,
                width: area.width,
                height: CARD_HEIGHT.min(area.height.saturating_sub(slot as u16 * CARD_HEIGHT)),
            };
            if row_area.height == 0 {
                break;
            }
            let columns = self.split_columns(row_area);
            for (col_idx, column_chunk) in columns.into_iter().enumerate() {
                let recipe_index = row_idx * GRID_COLUMNS + col_idx;
                if let Some(recipe) = recipes.get(recipe_index) {
                    let selected = recipe_index == self.selected;
                    let border_style = if selected {
                        Style::default().fg(theme.accent)
                    } else {
                        Style::default().fg(theme.dim)
                    };
                    let block = Block::default().borders(Borders::ALL).border_style(border_style);
                    let lines = build_recipe_card_lines(recipe, selected, theme);
                    let card = Paragraph::new(lines)
                        .wrap(Wrap { trim: true })
                        .block(block);
                    frame.render_widget(card, column_chunk);
                }
            }
        }
    }

    /// Split a row into evenly sized columns. `GRID_COLUMNS` drives the
    /// count.
    fn split_columns(&self, area: Rect) -> Vec<Rect> {
        let columns = GRID_COLUMNS.max(1) as u16;
        let percent = (100 / columns).max(1);
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(vec![Constraint::Percentage(percent); columns as usize])
            .split(area);
        chunks.iter().cloned().collect()
    }

    fn draw_footer(&self, frame: &mut Frame, area: Rect, theme: &Palette) {
        let block = Block::default()
            .borders(Borders::TOP)
            .border_style(Style::default().fg(theme.dim));
        frame.render_widget(block.clone(), area);
        let inner = block.inner(area);

        let status_line = if let Some(status) = &self.status {
            Line::from(vec![Span::styled(status.text.clone(), status.kind.style())])
        } else {
            Line::from("")
        };

        let paragraph =
            Paragraph::new(vec![status_line, self.footer_instructions(theme)]).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn footer_instructions(&self, theme: &Palette) -> Line<'static> {
        let key_style = Style::default()
            .fg(theme.accent)
            .add_modifier(Modifier::BOLD);
        match &self.mode {
            Mode::Normal => Line::from(vec![
                Span::styled("[arrows]", key_style),
                Span::raw(" Navigate   "),
                Span::styled("[Enter]", key_style),
                Span::raw(" Details   "),
                Span::styled("[f]", key_style),
                Span::raw(" Search   "),
                Span::styled("[v]", key_style),
                Span::raw(" Video   "),
                Span::styled("[t]", key_style),
                Span::raw(" Theme   "),
                Span::styled("[q]", key_style),
                Span::raw(" Quit"),
            ]),
            Mode::Searching => Line::from(vec![
                Span::raw("Type to search   "),
                Span::styled("[Enter]", key_style),
                Span::raw(" Search now   "),
                Span::styled("[Esc]", key_style),
                Span::raw(" Done"),
            ]),
            Mode::Detail(_) => Line::from(vec![
                Span::styled("[p]", key_style),
                Span::raw(" Play/Stop   "),
                Span::styled("[v]", key_style),
                Span::raw(" Video   "),
                Span::styled("[up/down]", key_style),
                Span::raw(" Scroll   "),
                Span::styled("[Esc]", key_style),
                Span::raw(" Close"),
            ]),
        }
    }

    fn draw_detail_modal(&self, frame: &mut Frame, area: Rect, view: &DetailView, theme: &Palette) {
        let popup = centered_rect(70, 80, area);
        frame.render_widget(Clear, popup);

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.accent))
            .title(view.recipe.name.clone())
            .style(Style::default().bg(theme.background).fg(theme.text));

        let mut lines: Vec<Line> = vec![
            Line::from(Span::styled(
                view.recipe.category_label().to_string(),
                Style::default().fg(theme.dim),
            )),
            Line::from(Span::styled(
                view.recipe
                    .thumbnail
                    .clone()
                    .unwrap_or_else(|| String::from("(no image)")),
                Style::default().fg(theme.dim),
            )),
            Line::from(""),
            Line::from(Span::styled(
                "Ingredients:",
                Style::default().add_modifier(Modifier::BOLD),
            )),
        ];

        if view.ingredients.is_empty() {
            lines.push(Line::from(Span::styled(
                "No ingredients listed.",
                Style::default().fg(theme.dim),
            )));
        } else {
            for ingredient in &view.ingredients {
                lines.push(Line::from(format!("- {ingredient}")));
            }
        }

        lines.push(Line::from(""));
        lines.push(Line::from(vec![
            Span::styled("Instructions  ", Style::default().add_modifier(Modifier::BOLD)),
            self.playback_control_span(theme),
        ]));
        lines.push(Line::from(
            view.recipe
                .instructions
                .clone()
                .unwrap_or_else(|| String::from("No description available.")),
        ));

        if let Some(video) = &view.recipe.video_url {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                format!("Video: {video}"),
                Style::default().fg(theme.accent),
            )));
        }

        let paragraph = Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: false })
            .scroll((view.scroll, 0));
        frame.render_widget(paragraph, popup);
    }

    fn playback_control_span(&self, theme: &Palette) -> Span<'static> {
        if !self.playback.available() {
            return Span::styled("(speech unavailable)", Style::default().fg(theme.dim));
        }
        match self.playback.state() {
            PlaybackState::Idle => Span::styled("[p] Play", Style::default().fg(theme.accent)),
            PlaybackState::Speaking => {
                Span::styled("[p] Stop (speaking)", Style::default().fg(theme.accent))
            }
        }
    }

    /// Set a status message that will appear in the footer on the next
    /// draw call.
    fn set_status<S: Into<String>>(&mut self, text: S, kind: StatusKind) {
        self.status = Some(StatusMessage {
            text: text.into(),
            kind,
        });
    }

    /// Clear any existing status from the footer.
    fn clear_status(&mut self) {
        self.status = None;
    }
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::{Duration, Instant};

    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    use crate::api::ApiError;
    use crate::models::Recipe;
    use crate::prefs::{init_schema, load_dark_mode};
    use crate::search::RecipeSource;

    use super::*;

    /// Source fake answering every term with the same canned list.
    struct CannedSource {
        recipes: Vec<Recipe>,
    }

    impl RecipeSource for CannedSource {
        fn search(&self, _term: &str) -> Result<Vec<Recipe>, ApiError> {
            Ok(self.recipes.clone())
        }
    }

    fn recipe(name: &str, category: &str) -> Recipe {
        Recipe {
            id: name.to_string(),
            name: name.to_string(),
            category: Some(category.to_string()),
            instructions: Some(format!("How to cook {name}.")),
            ..Recipe::default()
        }
    }

    fn app_with(recipes: Vec<Recipe>) -> App {
        let conn = Connection::open_in_memory().expect("in-memory store");
        init_schema(&conn).expect("schema");
        let search =
            SearchController::with_window(CannedSource { recipes }, Duration::from_millis(5));
        App::new(conn, search, PlaybackController::new(None), false)
    }

    /// Submit a query and tick until its results are applied.
    fn load_results(app: &mut App, term: &str) {
        app.search.set_query(term);
        app.search.submit();
        let give_up = Instant::now() + Duration::from_secs(2);
        while app.search.results().is_empty() {
            assert!(Instant::now() < give_up, "results never arrived");
            app.tick();
            thread::sleep(Duration::from_millis(5));
        }
    }

    fn rendered_text(app: &App, width: u16, height: u16) -> String {
        let backend = TestBackend::new(width, height);
        let mut terminal = Terminal::new(backend).expect("test terminal");
        terminal.draw(|frame| app.draw(frame)).expect("draw");

        let buffer = terminal.backend().buffer().clone();
        let mut text = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                text.push_str(buffer[(x, y)].symbol());
            }
            text.push('\n');
        }
        text
    }

    #[test]
    fn empty_result_list_renders_the_empty_state_message() {
        let app = app_with(Vec::new());
        let text = rendered_text(&app, 80, 24);
        assert!(text.contains("No recipes found."));
    }

    #[test]
    fn five_results_render_five_cards() {
        let names = ["Carbonara", "Lasagne", "Arrabiata", "Pesto", "Fideua"];
        let recipes = names
            .iter()
            .map(|name| recipe(name, "Pasta"))
            .collect::<Vec<_>>();
        let mut app = app_with(recipes);
        load_results(&mut app, "Pasta");

        let text = rendered_text(&app, 120, 40);
        for name in names {
            assert!(text.contains(name), "missing card for {name}");
        }
        assert!(text.contains("Category: Pasta"));
    }

    #[test]
    fn enter_opens_the_detail_modal_and_escape_closes_it() {
        let mut app = app_with(vec![recipe("Goulash", "Beef")]);
        load_results(&mut app, "Goulash");

        assert!(!app.handle_key(KeyCode::Enter).expect("open"));
        assert!(matches!(app.mode, Mode::Detail(_)));

        let text = rendered_text(&app, 100, 40);
        assert!(text.contains("How to cook Goulash."));

        assert!(!app.handle_key(KeyCode::Esc).expect("close"));
        assert!(matches!(app.mode, Mode::Normal));
    }

    #[test]
    fn search_mode_routes_keystrokes_into_the_query() {
        let mut app = app_with(Vec::new());
        app.handle_key(KeyCode::Char('f')).expect("enter search");
        assert!(matches!(app.mode, Mode::Searching));

        for c in ['C', 'h', 'i'] {
            app.handle_key(KeyCode::Char(c)).expect("type");
        }
        assert_eq!(app.search.query(), "Chi");

        app.handle_key(KeyCode::Backspace).expect("erase");
        assert_eq!(app.search.query(), "Ch");

        app.handle_key(KeyCode::Esc).expect("leave search");
        assert!(matches!(app.mode, Mode::Normal));
    }

    #[test]
    fn quitting_from_the_grid_requests_exit() {
        let mut app = app_with(Vec::new());
        assert!(app.handle_key(KeyCode::Char('q')).expect("quit"));
    }

    #[test]
    fn theme_toggle_persists_the_preference() {
        let mut app = app_with(Vec::new());
        assert!(!app.dark_mode);

        app.handle_key(KeyCode::Char('t')).expect("toggle");
        assert!(app.dark_mode);
        assert!(load_dark_mode(&app.conn).expect("load"));

        app.handle_key(KeyCode::Char('t')).expect("toggle back");
        assert!(!load_dark_mode(&app.conn).expect("load"));
    }

    #[test]
    fn selection_clamps_when_results_shrink() {
        let mut app = app_with(vec![recipe("One", "A"), recipe("Two", "B")]);
        load_results(&mut app, "x");
        app.selected = 5;
        app.clamp_selection();
        assert_eq!(app.selected, 1);
    }
}
