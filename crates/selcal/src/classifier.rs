//! Pair activity classification

use arrayvec::ArrayVec;

#[cfg(not(test))]
use log::debug;

#[cfg(test)]
use std::println as debug;

/// Debounced change in tone pair activity
///
/// Tones are identified by their index into the candidate table
/// the scores were measured against. `at` is the frame ordinal of
/// the first frame on which the new condition was observed, not
/// the (later) frame on which the debounce committed it, so
/// durations computed between transition events are exact.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PairTransition {
    /// Exactly two tones became active
    Started {
        /// Active tone indices, ascending
        tones: (usize, usize),
        /// Frame ordinal of the onset
        at: u64,
    },

    /// The active pair fell silent or changed
    Ended {
        /// Tone indices of the pair that ended, ascending
        tones: (usize, usize),
        /// Frame ordinal of the onset
        at: u64,
    },

    /// Three or more tones became active
    ///
    /// Emitted once per contiguous episode.
    Interference {
        /// Frame ordinal of the onset
        at: u64,
    },
}

/// Turns per-frame tone scores into pair transition events
///
/// A tone *opens* when its score reaches the open threshold and
/// stays open until the score falls below the close threshold.
/// Exactly two open tones are a candidate pair; zero or one open
/// tones are quiet; three or more are interference.
///
/// A change of condition must persist for `debounce_frames`
/// consecutive frames before it commits and emits events. A
/// condition that reverts while pending, such as a single dropped
/// frame in the middle of a held pair, emits nothing.
#[derive(Clone, Debug)]
pub struct BurstClassifier {
    open_threshold: f32,
    close_threshold: f32,
    debounce_frames: u32,
    open: Vec<bool>,
    current: Condition,
    pending: Option<Pending>,
}

impl BurstClassifier {
    /// Create a classifier over `num_tones` score slots
    ///
    /// `close_threshold` is clamped to at most `open_threshold`.
    /// `debounce_frames` must be at least 1; a value of 1 commits
    /// every change on the frame it is first observed.
    pub fn new(
        num_tones: usize,
        open_threshold: f32,
        close_threshold: f32,
        debounce_frames: u32,
    ) -> Self {
        assert!(num_tones >= 2);
        assert!(debounce_frames >= 1);
        Self {
            open_threshold,
            close_threshold: f32::min(close_threshold, open_threshold),
            debounce_frames,
            open: vec![false; num_tones],
            current: Condition::Quiet,
            pending: None,
        }
    }

    /// Classify one frame of scores
    ///
    /// `scores` must have one entry per tone slot, ordered like
    /// the candidate table. `frame_count` is the ordinal of this
    /// frame and must increase by one per call.
    ///
    /// Returns the transitions committed by this frame: usually
    /// none, sometimes one, and two when one pair gives way
    /// directly to another (`Ended` then `Started`).
    pub fn classify(&mut self, scores: &[f32], frame_count: u64) -> ArrayVec<PairTransition, 2> {
        assert_eq!(scores.len(), self.open.len());

        for (open, score) in self.open.iter_mut().zip(scores.iter()) {
            if *open {
                if *score < self.close_threshold {
                    *open = false;
                }
            } else if *score >= self.open_threshold {
                *open = true;
            }
        }

        let instant = self.instant_condition();

        let mut out = ArrayVec::new();
        if instant == self.current {
            self.pending = None;
            return out;
        }

        let commit = match &mut self.pending {
            Some(pending) if pending.condition == instant => {
                pending.frames += 1;
                pending.frames >= self.debounce_frames
            }
            _ => {
                self.pending = Some(Pending {
                    condition: instant,
                    onset: frame_count,
                    frames: 1,
                });
                self.debounce_frames <= 1
            }
        };
        if !commit {
            return out;
        }

        let pending = self.pending.take().unwrap_or(Pending {
            condition: instant,
            onset: frame_count,
            frames: 1,
        });
        let onset = pending.onset;

        match (self.current, instant) {
            (Condition::Pair(a, b), Condition::Quiet) => {
                debug!("classifier: pair ({}, {}) ended: frame {}", a, b, onset);
                out.push(PairTransition::Ended {
                    tones: (a, b),
                    at: onset,
                });
            }
            (Condition::Quiet, Condition::Pair(a, b)) => {
                debug!("classifier: pair ({}, {}) started: frame {}", a, b, onset);
                out.push(PairTransition::Started {
                    tones: (a, b),
                    at: onset,
                });
            }
            (Condition::Pair(a, b), Condition::Pair(c, d)) => {
                debug!(
                    "classifier: pair ({}, {}) replaced by ({}, {}): frame {}",
                    a, b, c, d, onset
                );
                out.push(PairTransition::Ended {
                    tones: (a, b),
                    at: onset,
                });
                out.push(PairTransition::Started {
                    tones: (c, d),
                    at: onset,
                });
            }
            (_, Condition::Interference) => {
                debug!("classifier: interference: frame {}", onset);
                out.push(PairTransition::Interference { at: onset });
            }
            (Condition::Interference, Condition::Pair(a, b)) => {
                debug!(
                    "classifier: pair ({}, {}) started after interference: frame {}",
                    a, b, onset
                );
                out.push(PairTransition::Started {
                    tones: (a, b),
                    at: onset,
                });
            }
            (Condition::Interference, Condition::Quiet) | (Condition::Quiet, Condition::Quiet) => {}
        }

        self.current = instant;
        out
    }

    /// Return to the quiet cold-start condition
    pub fn reset(&mut self) {
        for open in &mut self.open {
            *open = false;
        }
        self.current = Condition::Quiet;
        self.pending = None;
    }

    // Condition shown by the open set right now, before debouncing
    fn instant_condition(&self) -> Condition {
        let mut count = 0usize;
        let mut first = 0usize;
        let mut second = 0usize;
        for (idx, open) in self.open.iter().enumerate() {
            if *open {
                match count {
                    0 => first = idx,
                    1 => second = idx,
                    _ => {}
                }
                count += 1;
            }
        }
        match count {
            0 | 1 => Condition::Quiet,
            2 => Condition::Pair(first, second),
            _ => Condition::Interference,
        }
    }
}

/// Instantaneous (undebounced) activity condition
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Condition {
    /// Zero or one tones open
    Quiet,

    /// Exactly two tones open, indices ascending
    Pair(usize, usize),

    /// Three or more tones open
    Interference,
}

/// A condition change awaiting debounce confirmation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Pending {
    condition: Condition,
    onset: u64,
    frames: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUIET: &[f32] = &[0.0, 0.0, 0.0, 0.0];
    const PAIR_01: &[f32] = &[0.5, 0.5, 0.0, 0.0];
    const PAIR_02: &[f32] = &[0.5, 0.0, 0.5, 0.0];
    const LONE_3: &[f32] = &[0.0, 0.0, 0.0, 1.0];
    const TRIPLE: &[f32] = &[0.34, 0.34, 0.34, 0.0];

    fn classifier() -> BurstClassifier {
        BurstClassifier::new(4, 0.25, 0.15, 2)
    }

    // Run a frame script, collecting every emitted transition
    fn run(
        uut: &mut BurstClassifier,
        frames: &[&[f32]],
        start: u64,
    ) -> Vec<PairTransition> {
        let mut out = Vec::new();
        for (offset, scores) in frames.iter().enumerate() {
            out.extend(uut.classify(scores, start + offset as u64));
        }
        out
    }

    #[test]
    fn test_quiet_and_single_emit_nothing() {
        let mut uut = classifier();
        let events = run(&mut uut, &[QUIET, LONE_3, LONE_3, LONE_3, QUIET, QUIET], 0);
        assert!(events.is_empty());
    }

    #[test]
    fn test_pair_start_and_end_with_onsets() {
        let mut uut = classifier();

        // two pair frames to satisfy the debounce; onset is the first
        assert!(run(&mut uut, &[QUIET, PAIR_01], 0).is_empty());
        let events = run(&mut uut, &[PAIR_01], 2);
        assert_eq!(
            vec![PairTransition::Started {
                tones: (0, 1),
                at: 1
            }],
            events
        );

        // held pair emits nothing further
        assert!(run(&mut uut, &[PAIR_01, PAIR_01, PAIR_01], 3).is_empty());

        // silence debounces the same way
        assert!(run(&mut uut, &[QUIET], 6).is_empty());
        let events = run(&mut uut, &[QUIET], 7);
        assert_eq!(
            vec![PairTransition::Ended {
                tones: (0, 1),
                at: 6
            }],
            events
        );
    }

    #[test]
    fn test_single_frame_dropout_is_absorbed() {
        let mut uut = classifier();
        run(&mut uut, &[PAIR_01, PAIR_01], 0);

        // one quiet frame mid-pair cancels its own pending change
        let events = run(&mut uut, &[PAIR_01, QUIET, PAIR_01, PAIR_01], 2);
        assert!(events.is_empty());

        // same for a one-frame interference blip
        let events = run(&mut uut, &[TRIPLE, PAIR_01, PAIR_01], 6);
        assert!(events.is_empty());
    }

    #[test]
    fn test_pair_replacement_emits_both() {
        let mut uut = classifier();
        run(&mut uut, &[PAIR_01, PAIR_01], 0);

        let events = run(&mut uut, &[PAIR_02, PAIR_02], 2);
        assert_eq!(
            vec![
                PairTransition::Ended {
                    tones: (0, 1),
                    at: 2
                },
                PairTransition::Started {
                    tones: (0, 2),
                    at: 2
                },
            ],
            events
        );
    }

    #[test]
    fn test_interference_latches_once() {
        let mut uut = classifier();
        run(&mut uut, &[PAIR_01, PAIR_01], 0);

        // commits once, then stays silent while it persists
        let events = run(&mut uut, &[TRIPLE, TRIPLE, TRIPLE, TRIPLE], 2);
        assert_eq!(vec![PairTransition::Interference { at: 2 }], events);

        // recovery into a fresh pair announces the pair only
        let events = run(&mut uut, &[PAIR_02, PAIR_02], 6);
        assert_eq!(
            vec![PairTransition::Started {
                tones: (0, 2),
                at: 6
            }],
            events
        );
    }

    #[test]
    fn test_interference_from_silence() {
        let mut uut = classifier();
        let events = run(&mut uut, &[QUIET, TRIPLE, TRIPLE], 0);
        assert_eq!(vec![PairTransition::Interference { at: 1 }], events);

        // interference fading to silence emits nothing more
        let events = run(&mut uut, &[QUIET, QUIET, QUIET], 3);
        assert!(events.is_empty());
    }

    #[test]
    fn test_hysteresis_holds_weak_tones() {
        let mut uut = classifier();

        // open at 0.25, then sag to 0.2: still open (close is 0.15)
        run(&mut uut, &[&[0.3, 0.3, 0.0, 0.0], &[0.3, 0.3, 0.0, 0.0]], 0);
        let events = run(
            &mut uut,
            &[&[0.2, 0.2, 0.0, 0.0], &[0.2, 0.2, 0.0, 0.0]],
            2,
        );
        assert!(events.is_empty());

        // a tone must reach the full open threshold to join
        let events = run(
            &mut uut,
            &[&[0.2, 0.2, 0.2, 0.0], &[0.2, 0.2, 0.2, 0.0]],
            4,
        );
        assert!(events.is_empty());

        // sagging below close finally ends the pair
        let events = run(
            &mut uut,
            &[&[0.1, 0.1, 0.0, 0.0], &[0.1, 0.1, 0.0, 0.0]],
            6,
        );
        assert_eq!(
            vec![PairTransition::Ended {
                tones: (0, 1),
                at: 6
            }],
            events
        );
    }

    #[test]
    fn test_debounce_one_commits_immediately() {
        let mut uut = BurstClassifier::new(4, 0.25, 0.15, 1);
        let events = run(&mut uut, &[PAIR_01], 0);
        assert_eq!(
            vec![PairTransition::Started {
                tones: (0, 1),
                at: 0
            }],
            events
        );
    }

    #[test]
    fn test_reset_forgets_everything() {
        let mut uut = classifier();
        run(&mut uut, &[PAIR_01, PAIR_01], 0);
        uut.reset();

        // the old pair is gone; a new one must debounce from scratch
        assert!(run(&mut uut, &[PAIR_01], 10).is_empty());
        let events = run(&mut uut, &[PAIR_01], 11);
        assert_eq!(
            vec![PairTransition::Started {
                tones: (0, 1),
                at: 10
            }],
            events
        );
    }
}
