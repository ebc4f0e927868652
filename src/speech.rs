//! Speech playback for recipe instructions. The engine side wraps a local
//! synthesizer binary behind a small trait; the controller side is the
//! two-state machine the detail modal drives. Exactly one utterance can be
//! in flight at a time: starting a new one tears down the previous child
//! process, and closing the detail view always cancels, even when idle.

use std::io::Write;
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, warn};
use thiserror::Error;

/// Playback rate relative to the synthesizer's default speed.
pub const SPEECH_RATE: f32 = 0.9;
/// Pitch multiplier; 1.0 keeps the synthesizer default.
pub const SPEECH_PITCH: f32 = 1.0;
/// Language tag for the spoken voice.
pub const SPEECH_LANGUAGE: &str = "en-US";

/// Cadence at which the watcher thread checks the synthesizer child.
const WATCH_INTERVAL: Duration = Duration::from_millis(50);
/// espeak-ng's default speaking rate in words per minute. The utterance
/// rate scales this baseline.
const BASE_WORDS_PER_MINUTE: f32 = 175.0;
/// espeak-ng's neutral pitch on its 0-99 scale. The utterance pitch
/// multiplier scales this baseline.
const BASE_PITCH: f32 = 50.0;

/// Failures while handing an utterance to the synthesizer process.
#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("failed to launch speech synthesizer: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("failed to hand text to the synthesizer: {0}")]
    Write(#[source] std::io::Error),
}

/// One unit of speech: the text plus the fixed prosody settings used for
/// recipe instructions.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub rate: f32,
    pub pitch: f32,
    pub language: String,
}

impl Utterance {
    /// Utterance configured the way instruction playback always is:
    /// slightly slowed down, default pitch, US English.
    pub fn instructions(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            rate: SPEECH_RATE,
            pitch: SPEECH_PITCH,
            language: SPEECH_LANGUAGE.to_string(),
        }
    }
}

/// The playback state machine has exactly two states. `Speaking` is only
/// entered when the engine reports that playback actually started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Speaking,
}

/// Lifecycle notifications the engine reports back to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechEvent {
    /// Playback of the current utterance began.
    Started,
    /// The current utterance ran to natural completion. Cancellation does
    /// not produce this event.
    Finished,
}

/// Seam between the playback state machine and whatever actually produces
/// audio. `cancel` must be immediate and must be safe to call when nothing
/// is playing.
pub trait SpeechEngine: Send {
    fn speak(&mut self, utterance: &Utterance) -> Result<(), SpeechError>;
    fn cancel(&mut self);
    fn poll_event(&mut self) -> Option<SpeechEvent>;
}

/// Engine backed by a local synthesizer binary (`espeak-ng`/`espeak` on
/// Linux, `say` on macOS). The utterance text goes to the child's stdin; a
/// watcher thread reports natural completion; cancellation kills the
/// child and reaps it without emitting `Finished`.
pub struct ProcessSpeechEngine {
    program: &'static str,
    child: Arc<Mutex<Option<Child>>>,
    event_tx: Sender<SpeechEvent>,
    event_rx: Receiver<SpeechEvent>,
}

impl ProcessSpeechEngine {
    /// Probe for an available synthesizer. `None` means the host has no
    /// speech capability and playback controls degrade to no-ops.
    pub fn detect() -> Option<Self> {
        const CANDIDATES: &[&str] = if cfg!(target_os = "macos") {
            &["say"]
        } else {
            &["espeak-ng", "espeak"]
        };

        let program = CANDIDATES
            .iter()
            .copied()
            .find(|candidate| synthesizer_responds(candidate))?;
        debug!("using speech synthesizer {program:?}");

        let (event_tx, event_rx) = unbounded();
        Some(Self {
            program,
            child: Arc::new(Mutex::new(None)),
            event_tx,
            event_rx,
        })
    }
}

impl SpeechEngine for ProcessSpeechEngine {
    fn speak(&mut self, utterance: &Utterance) -> Result<(), SpeechError> {
        // One session system-wide: tear down any leftover child first.
        self.cancel();

        let words_per_minute = BASE_WORDS_PER_MINUTE * utterance.rate;
        let mut command = Command::new(self.program);
        if self.program == "say" {
            command.arg("-r").arg(format!("{words_per_minute:.0}"));
        } else {
            command
                .arg("-s")
                .arg(format!("{words_per_minute:.0}"))
                .arg("-p")
                .arg(format!("{:.0}", BASE_PITCH * utterance.pitch))
                .arg("-v")
                .arg(utterance.language.to_ascii_lowercase())
                .arg("--stdin");
        }

        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(SpeechError::Spawn)?;

        if let Err(err) = feed_stdin(&mut child, &utterance.text) {
            let _ = child.kill();
            let _ = child.wait();
            return Err(err);
        }

        let pid = child.id();
        *self.child.lock().unwrap() = Some(child);
        // Spawn succeeded and the text is queued: that is this engine's
        // notion of "playback started".
        let _ = self.event_tx.send(SpeechEvent::Started);

        let slot = Arc::clone(&self.child);
        let events = self.event_tx.clone();
        thread::spawn(move || watch_child(slot, pid, events));
        Ok(())
    }

    fn cancel(&mut self) {
        let mut guard = self.child.lock().unwrap();
        if let Some(mut child) = guard.take() {
            if let Err(err) = child.kill() {
                warn!("failed to stop speech synthesizer: {err}");
            }
            let _ = child.wait();
        }
    }

    fn poll_event(&mut self) -> Option<SpeechEvent> {
        self.event_rx.try_recv().ok()
    }
}

/// Write the utterance text to the child's stdin and close the pipe so the
/// synthesizer starts speaking.
fn feed_stdin(child: &mut Child, text: &str) -> Result<(), SpeechError> {
    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(text.as_bytes()).map_err(SpeechError::Write)?;
    }
    Ok(())
}

/// Poll the shared child slot until the utterance ends naturally or the
/// slot no longer holds our child (cancelled, or replaced by a newer
/// utterance). Only natural completion emits `Finished`.
fn watch_child(slot: Arc<Mutex<Option<Child>>>, pid: u32, events: Sender<SpeechEvent>) {
    loop {
        thread::sleep(WATCH_INTERVAL);
        let mut guard = slot.lock().unwrap();
        match guard.as_mut() {
            Some(child) if child.id() == pid => match child.try_wait() {
                Ok(Some(_status)) => {
                    *guard = None;
                    let _ = events.send(SpeechEvent::Finished);
                    return;
                }
                Ok(None) => {}
                Err(err) => {
                    warn!("lost track of speech synthesizer: {err}");
                    *guard = None;
                    return;
                }
            },
            _ => return,
        }
    }
}

/// Check whether a candidate synthesizer binary is runnable. `say` has no
/// version flag, but speaking an empty string exits immediately.
fn synthesizer_responds(program: &str) -> bool {
    let arg = if program == "say" { "" } else { "--version" };
    Command::new(program)
        .arg(arg)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// The detail modal's playback state machine. Holds the (optional) engine
/// and the current state; the UI calls [`tick`](Self::tick) on its poll
/// loop so engine-reported transitions land between key events.
pub struct PlaybackController {
    engine: Option<Box<dyn SpeechEngine>>,
    state: PlaybackState,
}

impl PlaybackController {
    /// Controller over an explicit engine, or over none (all controls
    /// become no-ops).
    pub fn new(engine: Option<Box<dyn SpeechEngine>>) -> Self {
        Self {
            engine,
            state: PlaybackState::Idle,
        }
    }

    /// Controller over whatever synthesizer the host provides, if any.
    pub fn detect() -> Self {
        Self::new(
            ProcessSpeechEngine::detect().map(|engine| Box::new(engine) as Box<dyn SpeechEngine>),
        )
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Whether the host has any speech capability at all.
    pub fn available(&self) -> bool {
        self.engine.is_some()
    }

    /// Play/stop control. Idle starts an utterance over the given
    /// instructions (the Speaking transition happens when the engine
    /// reports `Started`); Speaking cancels immediately and returns to
    /// Idle without waiting for an engine callback.
    pub fn toggle(&mut self, instructions: &str) {
        let Some(engine) = self.engine.as_mut() else {
            return;
        };
        match self.state {
            PlaybackState::Idle => {
                let utterance = Utterance::instructions(instructions);
                if let Err(err) = engine.speak(&utterance) {
                    warn!("could not start instruction playback: {err}");
                }
            }
            PlaybackState::Speaking => {
                engine.cancel();
                self.state = PlaybackState::Idle;
            }
        }
    }

    /// Teardown when the detail view closes: cancel unconditionally (a
    /// no-op at the engine level when nothing is playing) and return to
    /// Idle. Safe to call repeatedly.
    pub fn close(&mut self) {
        if let Some(engine) = self.engine.as_mut() {
            engine.cancel();
        }
        self.state = PlaybackState::Idle;
    }

    /// Apply engine-reported lifecycle events. Returns `true` when the
    /// state changed so the UI knows to redraw the play/stop control.
    pub fn tick(&mut self) -> bool {
        let Some(engine) = self.engine.as_mut() else {
            return false;
        };
        let mut changed = false;
        while let Some(event) = engine.poll_event() {
            let next = match event {
                SpeechEvent::Started => PlaybackState::Speaking,
                SpeechEvent::Finished => PlaybackState::Idle,
            };
            if next != self.state {
                self.state = next;
                changed = true;
            }
        }
        changed
    }
}
