use crate::playback::{PlaybackObserver, PlaybackReport};
use crate::sequence::{Sequence, Step};
use indicatif::{ProgressBar, ProgressStyle};

/// Bar counting played steps; a spinner when playback loops forever.
pub fn create_step_progress(steps_per_pass: usize, repetitions: u32) -> ProgressBar {
    if repetitions == 0 {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{prefix:.bold.dim} {spinner} {wide_msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        return pb;
    }

    let total = steps_per_pass as u64 * u64::from(repetitions);
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{prefix:.bold} [{bar:32.cyan}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("⣀⣤⣦⣶⣷⣿ "),
    );
    pb
}

/// Drives a progress bar from playback callbacks.
pub struct ProgressObserver {
    bar: ProgressBar,
    repetitions: u32,
}

impl ProgressObserver {
    pub fn new(sequence: &Sequence, repetitions: u32) -> Self {
        let bar = create_step_progress(sequence.len(), repetitions);
        bar.set_prefix(sequence.name().to_string());
        Self { bar, repetitions }
    }

    pub fn bar(&self) -> &ProgressBar {
        &self.bar
    }
}

impl PlaybackObserver for ProgressObserver {
    fn iteration_started(&mut self, iteration: u32) {
        if self.repetitions == 0 {
            self.bar.set_prefix(format!("Pass {}", iteration + 1));
        } else {
            self.bar
                .set_prefix(format!("Pass {}/{}", iteration + 1, self.repetitions));
        }
    }

    fn step_started(&mut self, index: usize, step: &Step) {
        self.bar.set_message(format!(
            "{:>2} {} note {:>3}{}",
            index + 1,
            step.kind.glyph(),
            step.midi_note(),
            if step.accent { " !" } else { "" }
        ));
        if self.repetitions == 0 {
            self.bar.tick();
        } else {
            self.bar.inc(1);
        }
    }

    fn finished(&mut self, report: &PlaybackReport) {
        let message = if report.cancelled {
            format!("stopped after {} steps", report.steps_played)
        } else {
            format!("done, {} passes", report.iterations)
        };
        self.bar.abandon_with_message(message);
    }
}
