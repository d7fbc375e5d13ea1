use std::fmt;
use std::time::{Duration, Instant};

use miette::{bail, Result};

use crate::state::Machine;

/// Upper bound on steps executed by a single tick.
///
/// Steps due beyond this are dropped, so a tick always returns in bounded time.
pub const MAX_STEPS_PER_TICK: u64 = 1_000_000;

/// Converts wall-clock time into a whole number of machine steps.
///
/// The clock keeps a count of steps that have been scheduled since it started, and on every
/// tick runs exactly the steps that have fallen due since. Time is never rounded to the
/// moment of polling, so fractional cycles carry over into the next tick.
#[derive(Debug)]
pub struct Clock {
    hz: f64,
    start: Instant,
    /// Steps that have fallen due so far, executed or skipped by halting
    scheduled: u64,
    /// Time of the tick at which halting was first observed
    halted_at: Option<Duration>,
    elapsed: Duration,
    cycles: u64,
}

/// Summary of a finished or ongoing run.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct RunStats {
    pub cycles: u64,
    pub elapsed: Duration,
    pub halted_at: Option<Duration>,
}

impl Clock {
    pub fn new(hz: f64) -> Result<Clock> {
        if !hz.is_finite() || hz <= 0.0 {
            bail!("Clock frequency must be a positive number of hertz, found {hz}.");
        }
        Ok(Clock {
            hz,
            start: Instant::now(),
            scheduled: 0,
            halted_at: None,
            elapsed: Duration::ZERO,
            cycles: 0,
        })
    }

    /// Run every step due at `elapsed` time since the clock started.
    ///
    /// Returns the amount of steps actually executed, which is lower than the amount due
    /// if the machine halts or more than [`MAX_STEPS_PER_TICK`] are due.
    pub fn tick_at(&mut self, machine: &mut Machine, elapsed: Duration) -> u64 {
        let due = (elapsed.as_secs_f64() * self.hz).floor() as u64;
        let backlog = due.saturating_sub(self.scheduled);
        self.scheduled = self.scheduled.max(due);
        let pending = backlog.min(MAX_STEPS_PER_TICK);
        if pending < backlog {
            log::debug!("Dropping {} steps the machine cannot keep up with", backlog - pending);
        }

        let executed = machine.run(pending);
        self.cycles += executed;
        if self.halted_at.is_none() {
            self.elapsed = self.elapsed.max(elapsed);
            if machine.is_halted() {
                self.halted_at = Some(self.elapsed);
            }
        }
        if pending > 0 {
            log::debug!("{executed}/{pending} steps at {:.3}s", elapsed.as_secs_f64());
        }
        executed
    }

    /// Run every step due right now.
    pub fn tick(&mut self, machine: &mut Machine) -> u64 {
        let elapsed = self.start.elapsed();
        self.tick_at(machine, elapsed)
    }

    pub fn stats(&self) -> RunStats {
        RunStats {
            cycles: self.cycles,
            elapsed: self.elapsed,
            halted_at: self.halted_at,
        }
    }
}

impl RunStats {
    /// Measured frequency over the run.
    pub fn average_hz(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.cycles as f64 / secs
        } else {
            0.0
        }
    }
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} cycles in {:.3} s, average {:.2} Hz",
            self.cycles,
            self.elapsed.as_secs_f64(),
            self.average_hz()
        )
    }
}
