//! Keyboard listener
//!
//! One listener per engine. Key events arrive over a channel (from `rdev` in the
//! binary, from the presentation layer, or from tests) and are dispatched on a
//! dedicated thread. The listener is installed when the engine starts and is
//! removed, thread joined, when it shuts down.

use std::fmt;
use std::sync::Weak;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, select, unbounded, Receiver, Sender};

use super::EngineCore;

/// A pressed key, as far as the board cares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Escape,
    Other,
}

impl Key {
    /// Parse a configured key name: `"Escape"` or a single character
    pub fn parse(name: &str) -> Option<Self> {
        if name.eq_ignore_ascii_case("escape") || name.eq_ignore_ascii_case("esc") {
            return Some(Key::Escape);
        }
        let mut chars = name.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if !c.is_whitespace() => Some(Key::Char(c)),
            _ => None,
        }
    }

    /// Case-insensitive comparison for character keys
    pub fn same_key(&self, other: &Key) -> bool {
        match (self, other) {
            (Key::Char(a), Key::Char(b)) => a.to_lowercase().eq(b.to_lowercase()),
            (a, b) => a == b,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Char(c) => write!(f, "{}", c),
            Key::Escape => write!(f, "Escape"),
            Key::Other => write!(f, "<other>"),
        }
    }
}

/// Key-down event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    /// A text input holds focus; hotkeys must not fire
    pub text_input_focused: bool,
}

impl KeyEvent {
    pub fn pressed(key: Key) -> Self {
        Self {
            key,
            text_input_focused: false,
        }
    }

    pub fn char(c: char) -> Self {
        Self::pressed(Key::Char(c))
    }

    pub fn in_text_input(mut self) -> Self {
        self.text_input_focused = true;
        self
    }
}

/// Listener thread feeding key events into the engine
pub(crate) struct KeyboardListener {
    sender: Sender<KeyEvent>,
    shutdown: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl KeyboardListener {
    pub(crate) fn install(core: Weak<EngineCore>) -> std::io::Result<Self> {
        let (sender, events) = unbounded::<KeyEvent>();
        let (shutdown, shutdown_rx) = bounded::<()>(1);

        let handle = thread::Builder::new()
            .name("soundpad-keys".to_string())
            .spawn(move || listen(core, events, shutdown_rx))?;

        tracing::debug!("Keyboard listener installed");
        Ok(Self {
            sender,
            shutdown,
            handle: Some(handle),
        })
    }

    pub(crate) fn sender(&self) -> Sender<KeyEvent> {
        self.sender.clone()
    }
}

fn listen(core: Weak<EngineCore>, events: Receiver<KeyEvent>, shutdown: Receiver<()>) {
    loop {
        select! {
            recv(events) -> event => {
                let Ok(event) = event else { break };
                let Some(core) = core.upgrade() else { break };
                core.handle_key(event);
            }
            recv(shutdown) -> _ => break,
        }
    }
    tracing::debug!("Keyboard listener stopped");
}

impl Drop for KeyboardListener {
    fn drop(&mut self) {
        let _ = self.shutdown.send(());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("Keyboard listener thread panicked");
            }
        }
    }
}
