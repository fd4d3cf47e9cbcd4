//! The loop's select point: the refresh timer merged with terminal input.

use std::{
    io,
    time::{Duration, Instant},
};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Everything the dashboard reacts to besides the timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Quit,
    SwitchView,
    MoveUp,
    MoveDown,
    PageUp,
    PageDown,
    Home,
    End,
    Resize(u16, u16),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopEvent {
    Tick,
    Input(Command),
}

pub fn key_to_command(key: KeyEvent) -> Option<Command> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    let command = match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Command::Quit,
        KeyCode::Char('q') | KeyCode::Esc => Command::Quit,
        KeyCode::Tab | KeyCode::BackTab | KeyCode::Char('v') => Command::SwitchView,
        KeyCode::Up | KeyCode::Char('k') => Command::MoveUp,
        KeyCode::Down | KeyCode::Char('j') => Command::MoveDown,
        KeyCode::PageUp => Command::PageUp,
        KeyCode::PageDown => Command::PageDown,
        KeyCode::Home | KeyCode::Char('g') => Command::Home,
        KeyCode::End | KeyCode::Char('G') => Command::End,
        _ => return None,
    };
    Some(command)
}

pub fn to_command(event: Event) -> Option<Command> {
    match event {
        Event::Key(key) => key_to_command(key),
        Event::Resize(width, height) => Some(Command::Resize(width, height)),
        _ => None,
    }
}

/// Blocking source of input commands.
pub trait InputSource {
    /// Waits up to `timeout` for one command. `Ok(None)` means nothing
    /// usable arrived in time.
    fn poll(&mut self, timeout: Duration) -> io::Result<Option<Command>>;
}

/// Terminal input via crossterm.
pub struct TerminalInput;

impl InputSource for TerminalInput {
    fn poll(&mut self, timeout: Duration) -> io::Result<Option<Command>> {
        if !event::poll(timeout)? {
            return Ok(None);
        }
        Ok(to_command(event::read()?))
    }
}

/// Fixed-rate deadline. Late ticks are not skipped: each `advance` moves
/// the deadline by exactly one interval, so a slow refresh leaves a
/// backlog that the loop works through on following iterations.
#[derive(Debug, Clone)]
pub struct Ticker {
    interval: Duration,
    deadline: Instant,
}

impl Ticker {
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            deadline: now + interval,
        }
    }

    pub fn remaining(&self, now: Instant) -> Duration {
        self.deadline.saturating_duration_since(now)
    }

    pub fn advance(&mut self) {
        self.deadline += self.interval;
    }
}

/// Hands out one event at a time. While ticks are overdue, pending input
/// and due ticks alternate, so a backlog can neither starve a keypress
/// nor be skipped.
pub struct Scheduler<I> {
    input: I,
    ticker: Ticker,
    tick_owed: bool,
}

impl<I: InputSource> Scheduler<I> {
    pub fn new(input: I, interval: Duration) -> Self {
        Self {
            input,
            ticker: Ticker::new(interval, Instant::now()),
            tick_owed: false,
        }
    }

    pub fn next_event(&mut self) -> io::Result<LoopEvent> {
        loop {
            let timeout = self.ticker.remaining(Instant::now());
            if timeout.is_zero() {
                if !self.tick_owed {
                    if let Some(command) = self.input.poll(Duration::ZERO)? {
                        self.tick_owed = true;
                        return Ok(LoopEvent::Input(command));
                    }
                }
                self.tick_owed = false;
                self.ticker.advance();
                return Ok(LoopEvent::Tick);
            }
            if let Some(command) = self.input.poll(timeout)? {
                return Ok(LoopEvent::Input(command));
            }
        }
    }
}

/// Replays queued commands, then idles until the timer fires.
#[cfg(test)]
pub struct ScriptedInput {
    commands: std::collections::VecDeque<Command>,
}

#[cfg(test)]
impl ScriptedInput {
    pub fn new(commands: impl IntoIterator<Item = Command>) -> Self {
        Self {
            commands: commands.into_iter().collect(),
        }
    }
}

#[cfg(test)]
impl InputSource for ScriptedInput {
    fn poll(&mut self, timeout: Duration) -> io::Result<Option<Command>> {
        match self.commands.pop_front() {
            Some(command) => Ok(Some(command)),
            None => {
                std::thread::sleep(timeout);
                Ok(None)
            }
        }
    }
}
