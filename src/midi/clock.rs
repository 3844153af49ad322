//! Step timing and MIDI clock output

use crate::midi::{MidiEngine, MidiMessage, Result};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread;
use std::time::{Duration, Instant};

/// MIDI clock resolution (pulses per quarter note)
pub const PULSES_PER_QUARTER: u32 = 24;
/// Sixteenth-note steps per quarter note
pub const STEPS_PER_QUARTER: u32 = 4;
/// Clock pulses sent during one step
pub const PULSES_PER_STEP: u32 = PULSES_PER_QUARTER / STEPS_PER_QUARTER;

/// Something that can block the calling thread for a while.
pub trait Pacer {
    fn wait(&mut self, duration: Duration);
}

/// Sleeps against absolute deadlines, so the time spent sending messages
/// between waits does not accumulate as drift.
#[derive(Debug, Default)]
pub struct SleepPacer {
    deadline: Option<Instant>,
}

impl SleepPacer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Pacer for SleepPacer {
    fn wait(&mut self, duration: Duration) {
        let now = Instant::now();
        let target = match self.deadline.and_then(|d| d.checked_add(duration)) {
            // Fell more than one interval behind: resync instead of bursting.
            Some(next) if next > now => Some(next),
            _ => now.checked_add(duration),
        };
        self.deadline = target;

        match target {
            Some(target) => {
                let now = Instant::now();
                if target > now {
                    thread::sleep(target - now);
                }
            }
            None => thread::sleep(duration),
        }
    }
}

/// Cooperative stop flag shared between the player and whoever may stop it.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Whether a wait ran to the end or was cut short by cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Completed,
    Cancelled,
}

/// Length of one step at `bpm`, or `None` when `bpm` is not a positive
/// tempo whose step fits in a [`Duration`].
pub fn step_duration_for(bpm: f64) -> Option<Duration> {
    if !bpm.is_finite() || bpm <= 0.0 {
        return None;
    }
    Duration::try_from_secs_f64(60.0 / bpm / f64::from(STEPS_PER_QUARTER)).ok()
}

/// Advances time by whole steps, optionally emitting MIDI clock pulses.
#[derive(Debug, Clone, Copy)]
pub struct StepClock {
    step: Duration,
    send_clock: bool,
}

impl StepClock {
    /// One step is a sixteenth note: `60 / bpm / 4` seconds. A `bpm` that
    /// [`step_duration_for`] rejects saturates to the longest duration.
    pub fn new(bpm: f64, send_clock: bool) -> Self {
        Self {
            step: step_duration_for(bpm).unwrap_or(Duration::MAX),
            send_clock,
        }
    }

    pub fn step_duration(&self) -> Duration {
        self.step
    }

    pub fn pulse_duration(&self) -> Duration {
        self.step / PULSES_PER_STEP
    }

    pub fn sends_clock(&self) -> bool {
        self.send_clock
    }

    /// Waits one step. With clock output enabled the step is split into
    /// pulses, each preceded by a Clock message. Cancellation is checked
    /// between pulses.
    pub fn advance<E, P>(&self, engine: &mut E, pacer: &mut P, cancel: &CancelToken) -> Result<Advance>
    where
        E: MidiEngine + ?Sized,
        P: Pacer + ?Sized,
    {
        if !self.send_clock {
            pacer.wait(self.step);
            return Ok(Advance::Completed);
        }

        let pulse = self.pulse_duration();
        for _ in 0..PULSES_PER_STEP {
            if cancel.is_cancelled() {
                return Ok(Advance::Cancelled);
            }
            engine.send(MidiMessage::Clock)?;
            pacer.wait(pulse);
        }
        Ok(Advance::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::MockMidiEngine;

    #[derive(Default)]
    struct RecordingPacer(Vec<Duration>);

    impl Pacer for RecordingPacer {
        fn wait(&mut self, duration: Duration) {
            self.0.push(duration);
        }
    }

    #[test]
    fn test_step_duration_is_a_sixteenth() {
        let clock = StepClock::new(120.0, false);
        assert_eq!(clock.step_duration(), Duration::from_millis(125));
    }

    #[test]
    fn test_step_duration_rejects_unrepresentable_tempos() {
        assert_eq!(step_duration_for(240.0), Some(Duration::from_micros(62_500)));
        assert_eq!(step_duration_for(1e-300), None);
        assert_eq!(step_duration_for(0.0), None);
        assert_eq!(step_duration_for(-120.0), None);
        assert_eq!(step_duration_for(f64::INFINITY), None);
        assert_eq!(StepClock::new(1e-300, false).step_duration(), Duration::MAX);
    }

    #[test]
    fn test_advance_without_clock_waits_once() {
        let clock = StepClock::new(120.0, false);
        let mut engine = MockMidiEngine::new();
        let mut pacer = RecordingPacer::default();
        let result = clock
            .advance(&mut engine, &mut pacer, &CancelToken::new())
            .unwrap();
        assert_eq!(result, Advance::Completed);
        assert_eq!(pacer.0, vec![Duration::from_millis(125)]);
        assert!(engine.sent().is_empty());
    }

    #[test]
    fn test_advance_with_clock_sends_six_pulses() {
        let clock = StepClock::new(120.0, true);
        let mut engine = MockMidiEngine::new();
        let mut pacer = RecordingPacer::default();
        clock
            .advance(&mut engine, &mut pacer, &CancelToken::new())
            .unwrap();
        assert_eq!(engine.sent(), vec![MidiMessage::Clock; 6]);
        assert_eq!(pacer.0.len(), 6);
        let total: Duration = pacer.0.iter().sum();
        assert!(total <= Duration::from_millis(125));
        assert!(Duration::from_millis(125) - total < Duration::from_micros(1));
    }

    #[test]
    fn test_advance_stops_pulsing_when_cancelled() {
        let clock = StepClock::new(120.0, true);
        let mut engine = MockMidiEngine::new();
        let mut pacer = RecordingPacer::default();
        let cancel = CancelToken::new();
        cancel.cancel();
        let result = clock.advance(&mut engine, &mut pacer, &cancel).unwrap();
        assert_eq!(result, Advance::Cancelled);
        assert!(engine.sent().is_empty());
    }

    #[test]
    fn test_sleep_pacer_waits_at_least_the_duration() {
        let mut pacer = SleepPacer::new();
        let start = Instant::now();
        pacer.wait(Duration::from_millis(5));
        pacer.wait(Duration::from_millis(5));
        assert!(start.elapsed() >= Duration::from_millis(10));
    }
}
