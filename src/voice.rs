//! Voiced intervals
//!
//! A voiced interval is a maximal run that starts at an Active step (or at a
//! Tie with nothing to extend) and continues through the Tie steps directly
//! after it. Each backend resolves ties its own way; this module provides the
//! shared, backend-neutral view used by reports and tests.

use crate::sequence::{Sequence, StepKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoicedInterval {
    /// Index of the step that opens the interval.
    pub start: usize,
    /// Number of steps covered, including the opening step.
    pub steps: usize,
}

impl VoicedInterval {
    pub fn end(&self) -> usize {
        self.start + self.steps
    }

    pub fn contains(&self, index: usize) -> bool {
        (self.start..self.end()).contains(&index)
    }
}

/// Splits one pass over `sequence` into voiced intervals, in order.
pub fn voiced_intervals(sequence: &Sequence) -> Vec<VoicedInterval> {
    let mut intervals = Vec::new();
    let mut open: Option<VoicedInterval> = None;

    for (index, step) in sequence.steps().iter().enumerate() {
        match step.kind {
            StepKind::Active => {
                intervals.extend(open.take());
                open = Some(VoicedInterval {
                    start: index,
                    steps: 1,
                });
            }
            StepKind::Tie => match open.as_mut() {
                Some(interval) => interval.steps += 1,
                None => {
                    open = Some(VoicedInterval {
                        start: index,
                        steps: 1,
                    })
                }
            },
            StepKind::Rest => intervals.extend(open.take()),
        }
    }
    intervals.extend(open);
    intervals
}
