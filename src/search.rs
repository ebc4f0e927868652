//! Search controller: owns the query string, the debounce window, and the
//! result list. Keystrokes arm (and re-arm) a single debounce deadline;
//! when it expires with a non-empty query a fetch is dispatched to a
//! worker thread and its outcome comes back over a channel that the UI
//! drains on its poll tick.
//!
//! Outcomes are applied in completion order, not dispatch order, and
//! in-flight fetches are never cancelled. A slow early request finishing
//! after a fast later one can therefore overwrite newer results with
//! stale ones. That window is accepted rather than guarded; see DESIGN.md.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, warn};

use crate::api::{ApiError, RecipeApi};
use crate::models::Recipe;

/// Quiet period after the last keystroke before a search fires.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(700);

/// Terms the initial load picks from so the grid never opens empty.
pub const EXAMPLE_TERMS: &[&str] = &["Chicken", "Pasta", "Cake"];

/// Anything that can answer a recipe search. The production implementation
/// is [`RecipeApi`]; tests substitute a recording fake with scripted
/// latencies and failures.
pub trait RecipeSource: Send + Sync + 'static {
    fn search(&self, term: &str) -> Result<Vec<Recipe>, ApiError>;
}

impl RecipeSource for RecipeApi {
    fn search(&self, term: &str) -> Result<Vec<Recipe>, ApiError> {
        RecipeApi::search(self, term)
    }
}

/// Result of one background fetch, tagged with the term that produced it
/// so failures can be logged with context.
struct FetchOutcome {
    term: String,
    result: Result<Vec<Recipe>, ApiError>,
}

/// Debounced search state. At most one debounce deadline is armed at any
/// time: arming a new one always replaces the previous one.
pub struct SearchController {
    source: Arc<dyn RecipeSource>,
    query: String,
    window: Duration,
    deadline: Option<Instant>,
    results: Vec<Recipe>,
    outcome_tx: Sender<FetchOutcome>,
    outcome_rx: Receiver<FetchOutcome>,
}

impl SearchController {
    /// Controller with the standard 700 ms debounce window.
    pub fn new(source: impl RecipeSource) -> Self {
        Self::with_window(source, DEBOUNCE_WINDOW)
    }

    /// Controller with a caller-chosen debounce window.
    pub fn with_window(source: impl RecipeSource, window: Duration) -> Self {
        let (outcome_tx, outcome_rx) = unbounded();
        Self {
            source: Arc::new(source),
            query: String::new(),
            window,
            deadline: None,
            results: Vec::new(),
            outcome_tx,
            outcome_rx,
        }
    }

    /// Current query text as the user typed it.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Most recently applied result list.
    pub fn results(&self) -> &[Recipe] {
        &self.results
    }

    /// Record a new query value and restart the debounce window. The
    /// previous deadline (if any) is discarded, so only the value present
    /// when the window finally elapses can trigger a fetch.
    pub fn set_query(&mut self, text: impl Into<String>) {
        self.query = text.into();
        self.deadline = Some(Instant::now() + self.window);
    }

    /// Explicit submission: fetch right away, skipping the debounce
    /// window. An empty query never fetches.
    pub fn submit(&mut self) {
        if self.query.is_empty() {
            return;
        }
        let term = self.query.clone();
        self.dispatch(term);
    }

    /// Initial load: pick one example term at random and fetch it
    /// immediately so the UI has something to show before any input.
    pub fn initial_search(&mut self) {
        let term = pick_example_term();
        debug!("initial search seeded with {term:?}");
        self.dispatch(term.to_string());
    }

    /// Drive time-based work: fire the debounce deadline if it has expired
    /// and apply any fetch outcomes that have arrived, in completion
    /// order. Returns `true` when the result list was replaced so the UI
    /// can clamp its selection.
    pub fn tick(&mut self) -> bool {
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                self.deadline = None;
                if !self.query.is_empty() {
                    let term = self.query.clone();
                    self.dispatch(term);
                }
                // Query emptied before expiry: keep the previous results.
            }
        }

        let mut replaced = false;
        while let Ok(outcome) = self.outcome_rx.try_recv() {
            match outcome.result {
                Ok(recipes) => {
                    debug!(
                        "search for {:?} returned {} recipes",
                        outcome.term,
                        recipes.len()
                    );
                    self.results = recipes;
                    replaced = true;
                }
                Err(err) => {
                    // Never a user-facing error state: the previous list
                    // stays on screen and the failure is diagnostic only.
                    warn!("search for {:?} failed: {err}", outcome.term);
                }
            }
        }
        replaced
    }

    /// Hand one fetch to a worker thread. The thread reports back over the
    /// outcome channel; the controller never blocks on it.
    fn dispatch(&self, term: String) {
        let source = Arc::clone(&self.source);
        let outcome_tx = self.outcome_tx.clone();
        thread::spawn(move || {
            let result = source.search(&term);
            // The receiver only disappears when the controller is being
            // torn down, at which point the outcome is moot.
            let _ = outcome_tx.send(FetchOutcome { term, result });
        });
    }
}

/// Uniform pick from [`EXAMPLE_TERMS`]. The subsecond clock is plenty of
/// entropy for choosing a demo search term.
fn pick_example_term() -> &'static str {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.subsec_nanos())
        .unwrap_or(0);
    EXAMPLE_TERMS[nanos as usize % EXAMPLE_TERMS.len()]
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    /// Recording fake: notes every term it was asked for and answers from
    /// a per-term script with an optional artificial latency.
    struct MockSource {
        calls: Arc<Mutex<Vec<String>>>,
        script: HashMap<String, (Duration, Result<Vec<Recipe>, ()>)>,
    }

    impl MockSource {
        fn new() -> (Self, Arc<Mutex<Vec<String>>>) {
            let calls = Arc::new(Mutex::new(Vec::new()));
            (
                Self {
                    calls: Arc::clone(&calls),
                    script: HashMap::new(),
                },
                calls,
            )
        }

        fn respond(mut self, term: &str, recipes: Vec<Recipe>) -> Self {
            self.script
                .insert(term.to_string(), (Duration::ZERO, Ok(recipes)));
            self
        }

        fn respond_after(mut self, term: &str, delay: Duration, recipes: Vec<Recipe>) -> Self {
            self.script.insert(term.to_string(), (delay, Ok(recipes)));
            self
        }

        fn fail(mut self, term: &str) -> Self {
            self.script.insert(term.to_string(), (Duration::ZERO, Err(())));
            self
        }
    }

    impl RecipeSource for MockSource {
        fn search(&self, term: &str) -> Result<Vec<Recipe>, ApiError> {
            self.calls.lock().unwrap().push(term.to_string());
            match self.script.get(term) {
                Some((delay, result)) => {
                    if !delay.is_zero() {
                        thread::sleep(*delay);
                    }
                    result.clone().map_err(|()| {
                        ApiError::Status(reqwest::StatusCode::INTERNAL_SERVER_ERROR)
                    })
                }
                None => Ok(Vec::new()),
            }
        }
    }

    fn recipe(name: &str) -> Recipe {
        Recipe {
            id: name.to_string(),
            name: name.to_string(),
            ..Recipe::default()
        }
    }

    /// Poll `condition` (which may tick the controller) until it holds or
    /// the harness times out.
    fn wait_for(mut condition: impl FnMut() -> bool) {
        let give_up = Instant::now() + Duration::from_secs(2);
        while !condition() {
            assert!(Instant::now() < give_up, "condition not met in time");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn debounce_coalesces_rapid_keystrokes() {
        let (source, calls) = MockSource::new();
        let source = source.respond("Chi", vec![recipe("Chicken Handi")]);
        let mut controller = SearchController::with_window(source, Duration::from_millis(30));

        controller.set_query("C");
        controller.set_query("Ch");
        controller.set_query("Chi");
        thread::sleep(Duration::from_millis(60));

        wait_for(|| {
            controller.tick();
            !controller.results().is_empty()
        });
        assert_eq!(*calls.lock().unwrap(), vec!["Chi".to_string()]);
    }

    #[test]
    fn empty_query_never_fetches() {
        let (source, calls) = MockSource::new();
        let mut controller = SearchController::with_window(source, Duration::from_millis(10));

        // Typed something, then cleared it before the window elapsed.
        controller.set_query("Past");
        controller.set_query("");
        thread::sleep(Duration::from_millis(30));
        controller.tick();

        // Explicit submission of an empty query is also a no-op.
        controller.submit();
        thread::sleep(Duration::from_millis(30));
        controller.tick();

        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn submit_bypasses_the_debounce_window() {
        let (source, calls) = MockSource::new();
        let source = source.respond("Pasta", vec![recipe("Lasagne")]);
        // A window long enough that only an immediate fetch can explain
        // the observed call.
        let mut controller = SearchController::with_window(source, Duration::from_secs(60));

        controller.set_query("Pasta");
        controller.submit();

        wait_for(|| {
            controller.tick();
            !controller.results().is_empty()
        });
        assert_eq!(*calls.lock().unwrap(), vec!["Pasta".to_string()]);
    }

    #[test]
    fn failed_fetch_keeps_previous_results() {
        let (source, calls) = MockSource::new();
        let source = source
            .respond("Cake", vec![recipe("Battenberg"), recipe("Madeira")])
            .fail("Broken");
        let mut controller = SearchController::with_window(source, Duration::from_millis(5));

        controller.set_query("Cake");
        controller.submit();
        wait_for(|| {
            controller.tick();
            controller.results().len() == 2
        });

        controller.set_query("Broken");
        controller.submit();
        wait_for(|| calls.lock().unwrap().len() == 2);
        thread::sleep(Duration::from_millis(20));
        controller.tick();

        assert_eq!(controller.results().len(), 2);
        assert_eq!(controller.results()[0].name, "Battenberg");
    }

    #[test]
    fn outcomes_apply_in_completion_order() {
        let (source, calls) = MockSource::new();
        let source = source
            .respond_after("Slow", Duration::from_millis(60), vec![recipe("Stale")])
            .respond("Fast", vec![recipe("Fresh")]);
        let mut controller = SearchController::with_window(source, Duration::from_millis(5));

        // Dispatch order: Slow first, Fast second. Completion order is the
        // reverse, so the slow response lands last and wins.
        controller.set_query("Slow");
        controller.submit();
        controller.set_query("Fast");
        controller.submit();

        wait_for(|| calls.lock().unwrap().len() == 2);
        thread::sleep(Duration::from_millis(100));
        controller.tick();

        assert_eq!(controller.results().len(), 1);
        assert_eq!(controller.results()[0].name, "Stale");
    }

    #[test]
    fn zero_results_replace_the_list() {
        let (source, _calls) = MockSource::new();
        let source = source
            .respond("Cake", vec![recipe("Battenberg")])
            .respond("Chicken", Vec::new());
        let mut controller = SearchController::with_window(source, Duration::from_millis(5));

        controller.set_query("Cake");
        controller.submit();
        wait_for(|| {
            controller.tick();
            !controller.results().is_empty()
        });

        controller.set_query("Chicken");
        controller.submit();
        wait_for(|| {
            controller.tick();
            controller.results().is_empty()
        });
    }

    #[test]
    fn initial_search_uses_an_example_term() {
        let (source, calls) = MockSource::new();
        let mut controller = SearchController::with_window(source, Duration::from_millis(5));

        controller.initial_search();
        wait_for(|| calls.lock().unwrap().len() == 1);

        let term = calls.lock().unwrap()[0].clone();
        assert!(EXAMPLE_TERMS.contains(&term.as_str()));
    }
}
