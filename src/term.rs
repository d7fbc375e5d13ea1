use std::io::{self, Write};
use std::time::Duration;

use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers as Mod},
    execute, terminal,
};
use miette::{IntoDiagnostic, Result};

use crate::input::{Direction, HeldKeys};

/// Similar to [`crossterm::event::KeyCode`] but only contains relevant information.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Key {
    Arrow(Direction),
    Reset,
    Quit,
}

/// Keys seen during one frame.
#[derive(Clone, Copy, Default, Debug)]
pub struct FrameInput {
    pub held: HeldKeys,
    pub reset: bool,
    pub quit: bool,
}

/// Puts the terminal into raw mode on an alternate screen, restoring it on drop.
pub struct LiveTerminal {
    _private: (),
}

impl LiveTerminal {
    /// Must only be called if terminal is NOT in raw mode.
    pub fn enter() -> Result<LiveTerminal> {
        debug_assert!(
            !terminal::is_raw_mode_enabled().is_ok_and(|is| is),
            "terminal should not be in raw mode to enable raw mode",
        );
        terminal::enable_raw_mode().into_diagnostic()?;
        execute!(io::stdout(), terminal::EnterAlternateScreen, cursor::Hide).into_diagnostic()?;
        Ok(LiveTerminal { _private: () })
    }

    /// Replace the whole screen with `frame`.
    pub fn draw(&mut self, frame: &str) -> Result<()> {
        let mut stdout = io::stdout();
        execute!(
            stdout,
            cursor::MoveTo(0, 0),
            terminal::Clear(terminal::ClearType::All)
        )
        .into_diagnostic()?;
        // Raw mode does not translate newlines
        for line in frame.lines() {
            write!(stdout, "{line}\r\n").into_diagnostic()?;
        }
        stdout.flush().into_diagnostic()
    }
}

impl Drop for LiveTerminal {
    fn drop(&mut self) {
        let _ = execute!(io::stdout(), cursor::Show, terminal::LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}

/// Collect every key pressed within `timeout` without blocking for longer.
///
/// Terminals report presses but not releases, so the result only describes the current frame.
/// Caller must ensure terminal is in raw mode.
pub fn poll_keys(timeout: Duration) -> Result<FrameInput> {
    let mut input = FrameInput::default();
    let mut wait = timeout;
    while event::poll(wait).into_diagnostic()? {
        if let Ok(key) = Key::try_from(event::read().into_diagnostic()?) {
            input.record(key);
        }
        // Drain anything else already queued
        wait = Duration::ZERO;
    }
    Ok(input)
}

impl FrameInput {
    fn record(&mut self, key: Key) {
        match key {
            Key::Arrow(direction) => self.held.hold(direction),
            Key::Reset => self.reset = true,
            Key::Quit => self.quit = true,
        }
    }
}

impl TryFrom<Event> for Key {
    type Error = ();
    fn try_from(event: Event) -> Result<Self, Self::Error> {
        if let Event::Key(event) = event {
            if let Ok(key) = event.try_into() {
                return Ok(key);
            }
        }
        Err(())
    }
}

impl TryFrom<KeyEvent> for Key {
    type Error = ();
    fn try_from(event: KeyEvent) -> Result<Self, Self::Error> {
        if matches!(event.kind, KeyEventKind::Release) {
            return Err(());
        }

        let key = match (event.modifiers, event.code) {
            (Mod::CONTROL, KeyCode::Char('c')) => Key::Quit,
            (_, KeyCode::Esc) | (Mod::NONE, KeyCode::Char('q')) => Key::Quit,
            (Mod::NONE, KeyCode::Char('r')) => Key::Reset,

            (_, KeyCode::Up) => Key::Arrow(Direction::Up),
            (_, KeyCode::Left) => Key::Arrow(Direction::Left),
            (_, KeyCode::Down) => Key::Arrow(Direction::Down),
            (_, KeyCode::Right) => Key::Arrow(Direction::Right),

            _ => return Err(()),
        };

        Ok(key)
    }
}
