//! Two-pulse burst sequencing

use arrayvec::ArrayVec;
use strum_macros::{Display, EnumMessage};

#[cfg(not(test))]
use log::{debug, info, warn};

#[cfg(test)]
use std::println as debug;
#[cfg(test)]
use std::println as info;
#[cfg(test)]
use std::println as warn;

use crate::classifier::PairTransition;

/// Why a candidate selective-call attempt was discarded
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumMessage)]
pub enum RejectReason {
    /// A pulse ended before the minimum hold time
    #[strum(
        serialize = "pulse too short",
        detailed_message = "a tone pair ended before the minimum hold time"
    )]
    HoldTooShort,

    /// The second pulse began before the minimum gap elapsed
    #[strum(
        serialize = "gap too short",
        detailed_message = "the pause between pulses was shorter than the minimum gap"
    )]
    GapTooShort,

    /// No second pulse began within the maximum gap
    #[strum(
        serialize = "gap too long",
        detailed_message = "no second pulse began within the maximum gap"
    )]
    GapTooLong,

    /// Three or more tones were active at once
    #[strum(
        serialize = "interference",
        detailed_message = "three or more tones were active at once"
    )]
    Interference,

    /// Activity stalled without completing a sequence
    #[strum(
        serialize = "inactivity",
        detailed_message = "tone activity stalled without completing a two-pulse sequence"
    )]
    Inactivity,
}

impl RejectReason {
    /// Human-readable sentence fragment describing the reason
    pub fn describe(&self) -> &'static str {
        use strum::EnumMessage;
        self.get_detailed_message().expect("missing definition")
    }
}

/// Framer output
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BurstOut {
    /// A complete two-pulse sequence was assembled
    ///
    /// Tone indices are ascending within each pair. `at` is the
    /// frame ordinal on which the second pulse ended.
    Sequence {
        /// First pulse tone indices
        first: (usize, usize),
        /// Second pulse tone indices
        second: (usize, usize),
        /// Frame ordinal of completion
        at: u64,
    },

    /// An attempt was discarded
    Reject {
        /// Why the attempt failed
        reason: RejectReason,
        /// Frame ordinal at which the failure was observed
        at: u64,
    },
}

/// Frame-count limits for burst sequencing
///
/// All durations are whole frame counts at the frame rate the
/// classifier runs at. The builder quantizes its second-valued
/// options into one of these.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BurstTiming {
    /// Minimum frames a pulse must be held
    pub min_hold: u64,

    /// Frames beyond which a held pulse is merely noted as overlong
    pub max_hold: u64,

    /// Minimum frames between first pulse end and second pulse start
    pub min_gap: u64,

    /// Maximum frames between first pulse end and second pulse start
    pub max_gap: u64,

    /// Grace frames past `max_gap` before the gap times out
    ///
    /// Transition events commit one debounce interval after their
    /// onset, so the timeout must not fire while a legal second
    /// pulse could still be announced.
    pub slack: u64,

    /// Frames a pulse may be held before the attempt is abandoned
    pub watchdog: u64,
}

/// Selective-call burst sequencer
///
/// The `BurstFramer` does nothing until the
/// [`BurstClassifier`](crate::classifier::BurstClassifier) reports
/// its first transition. It then follows the two-pulse shape of a
/// selective call: a held tone pair, a short silent gap, and a
/// second held pair. Each phase is validated against
/// [`BurstTiming`] as it completes.
///
/// Attempts that break the shape are discarded with a
/// [`RejectReason`], and the framer immediately re-arms: a pulse
/// that arrives too early after a rejected gap seeds a fresh
/// attempt of its own, so consecutive calls never require a
/// quiet period in between.
///
/// Pulses held past `max_hold` are tolerated up to the watchdog
/// limit. Transmitters routinely run long, and an overlong first
/// pulse still carries a valid code.
#[derive(Clone, Debug)]
pub struct BurstFramer {
    state: State,
    timing: BurstTiming,
}

impl BurstFramer {
    /// New framer with the given frame-count limits
    pub fn new(timing: BurstTiming) -> Self {
        assert!(timing.min_hold >= 1);
        assert!(timing.min_gap >= 1);
        assert!(timing.min_gap <= timing.max_gap);
        Self {
            state: State::Idle,
            timing,
        }
    }

    /// Process one frame's worth of classifier transitions
    ///
    /// `events` holds the transitions the classifier committed on
    /// this frame, in order. `frame_count` is the ordinal of the
    /// current frame and must increase by one per call even when
    /// `events` is empty, since gap timeouts and the inactivity
    /// watchdog advance on quiet frames.
    ///
    /// See [`BurstOut`] for a description of the output.
    pub fn frame(
        &mut self,
        events: &[PairTransition],
        frame_count: u64,
    ) -> ArrayVec<BurstOut, 2> {
        let mut out = ArrayVec::new();
        for event in events {
            if let Some(result) = self.input(event) {
                out.push(result);
            }
        }
        if let Some(result) = self.tick(frame_count) {
            out.push(result);
        }
        out
    }

    /// Drop any attempt in progress and return to idle
    pub fn reset(&mut self) {
        self.state = State::Idle;
    }

    // Apply a single classifier transition
    fn input(&mut self, event: &PairTransition) -> Option<BurstOut> {
        // interference is a hard reject from every state, idle
        // included, so downstream always hears about it
        if let PairTransition::Interference { at } = event {
            self.state = State::Idle;
            return Some(self.reject(RejectReason::Interference, *at));
        }

        match self.state {
            State::Idle => match event {
                PairTransition::Started { tones, at } => {
                    debug!(
                        "burst: first pulse ({}, {}): frame {}",
                        tones.0, tones.1, at
                    );
                    self.state = State::FirstPairHeld {
                        pair: *tones,
                        since: *at,
                    };
                    None
                }
                // stale end from an attempt the watchdog already abandoned
                PairTransition::Ended { .. } => None,
                PairTransition::Interference { .. } => None,
            },

            State::FirstPairHeld { pair, since } => match event {
                PairTransition::Ended { at, .. } => {
                    let hold = at.saturating_sub(since);
                    if hold < self.timing.min_hold {
                        self.state = State::Idle;
                        Some(self.reject(RejectReason::HoldTooShort, *at))
                    } else {
                        if hold > self.timing.max_hold {
                            debug!(
                                "burst: first pulse overlong: {} frames, nominal maximum {}",
                                hold, self.timing.max_hold
                            );
                        }
                        debug!("burst: first pulse held {} frames", hold);
                        self.state = State::GapWait {
                            first: pair,
                            ended_at: *at,
                        };
                        None
                    }
                }
                PairTransition::Started { tones, at } => {
                    // should not happen: the classifier always ends a
                    // pair before starting another
                    warn!("burst: unexpected pulse start while holding; restarting");
                    self.state = State::FirstPairHeld {
                        pair: *tones,
                        since: *at,
                    };
                    None
                }
                PairTransition::Interference { .. } => None,
            },

            State::GapWait { first, ended_at } => match event {
                PairTransition::Started { tones, at } => {
                    let gap = at.saturating_sub(ended_at);
                    if gap < self.timing.min_gap {
                        // the early pulse still seeds a fresh attempt
                        self.state = State::FirstPairHeld {
                            pair: *tones,
                            since: *at,
                        };
                        Some(self.reject(RejectReason::GapTooShort, *at))
                    } else if gap > self.timing.max_gap {
                        self.state = State::FirstPairHeld {
                            pair: *tones,
                            since: *at,
                        };
                        Some(self.reject(RejectReason::GapTooLong, *at))
                    } else {
                        debug!(
                            "burst: second pulse ({}, {}): gap {} frames",
                            tones.0, tones.1, gap
                        );
                        self.state = State::SecondPairHeld {
                            first,
                            second: *tones,
                            since: *at,
                        };
                        None
                    }
                }
                PairTransition::Ended { .. } => None,
                PairTransition::Interference { .. } => None,
            },

            State::SecondPairHeld {
                first,
                second,
                since,
            } => match event {
                PairTransition::Ended { at, .. } => {
                    let hold = at.saturating_sub(since);
                    self.state = State::Idle;
                    if hold < self.timing.min_hold {
                        Some(self.reject(RejectReason::HoldTooShort, *at))
                    } else {
                        if hold > self.timing.max_hold {
                            debug!(
                                "burst: second pulse overlong: {} frames, nominal maximum {}",
                                hold, self.timing.max_hold
                            );
                        }
                        info!(
                            "burst: sequence complete: ({}, {}) then ({}, {}): frame {}",
                            first.0, first.1, second.0, second.1, at
                        );
                        Some(BurstOut::Sequence {
                            first,
                            second,
                            at: *at,
                        })
                    }
                }
                PairTransition::Started { tones, at } => {
                    warn!("burst: unexpected pulse start while holding; restarting");
                    self.state = State::FirstPairHeld {
                        pair: *tones,
                        since: *at,
                    };
                    None
                }
                PairTransition::Interference { .. } => None,
            },
        }
    }

    // Advance timeouts to the current frame
    fn tick(&mut self, frame_count: u64) -> Option<BurstOut> {
        match self.state {
            State::Idle => None,
            State::GapWait { ended_at, .. } => {
                if frame_count.saturating_sub(ended_at) > self.timing.max_gap + self.timing.slack {
                    self.state = State::Idle;
                    Some(self.reject(RejectReason::GapTooLong, frame_count))
                } else {
                    None
                }
            }
            State::FirstPairHeld { since, .. } | State::SecondPairHeld { since, .. } => {
                if frame_count.saturating_sub(since) > self.timing.watchdog {
                    self.state = State::Idle;
                    Some(self.reject(RejectReason::Inactivity, frame_count))
                } else {
                    None
                }
            }
        }
    }

    fn reject(&self, reason: RejectReason, at: u64) -> BurstOut {
        info!("burst: rejected ({}): frame {}", reason, at);
        BurstOut::Reject { reason, at }
    }
}

// Framer state
//
// All frame ordinals are onsets reported by the classifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    // No activity. Eat stale events.
    Idle,

    // First tone pair is sounding
    FirstPairHeld { pair: (usize, usize), since: u64 },

    // First pulse accepted; waiting out the inter-pulse gap
    GapWait { first: (usize, usize), ended_at: u64 },

    // Second tone pair is sounding
    SecondPairHeld {
        first: (usize, usize),
        second: (usize, usize),
        since: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    // 20 frames/s: hold 0.75 s, gap 0.1 s to 0.3 s, watchdog 4 s
    const TIMING: BurstTiming = BurstTiming {
        min_hold: 15,
        max_hold: 25,
        min_gap: 2,
        max_gap: 6,
        slack: 1,
        watchdog: 80,
    };

    fn started(tones: (usize, usize), at: u64) -> PairTransition {
        PairTransition::Started { tones, at }
    }

    fn ended(tones: (usize, usize), at: u64) -> PairTransition {
        PairTransition::Ended { tones, at }
    }

    // Feed each event on its own frame, asserting silence in between
    fn feed_quiet(uut: &mut BurstFramer, events: &[PairTransition]) {
        for event in events {
            let at = match event {
                PairTransition::Started { at, .. } => *at,
                PairTransition::Ended { at, .. } => *at,
                PairTransition::Interference { at } => *at,
            };
            let out = uut.frame(std::slice::from_ref(event), at);
            assert!(out.is_empty(), "unexpected output {:?}", out);
        }
    }

    #[test]
    fn test_clean_sequence() {
        let mut uut = BurstFramer::new(TIMING);

        feed_quiet(
            &mut uut,
            &[
                started((0, 1), 100),
                ended((0, 1), 120),
                started((2, 3), 124),
            ],
        );
        let out = uut.frame(&[ended((2, 3), 140)], 140);
        assert_eq!(
            &[BurstOut::Sequence {
                first: (0, 1),
                second: (2, 3),
                at: 140
            }],
            out.as_slice()
        );
    }

    #[test]
    fn test_gap_bounds_are_inclusive() {
        for gap in [2u64, 6u64] {
            let mut uut = BurstFramer::new(TIMING);
            feed_quiet(
                &mut uut,
                &[
                    started((0, 1), 0),
                    ended((0, 1), 20),
                    started((2, 3), 20 + gap),
                ],
            );
            let out = uut.frame(&[ended((2, 3), 40 + gap)], 40 + gap);
            assert_eq!(
                &[BurstOut::Sequence {
                    first: (0, 1),
                    second: (2, 3),
                    at: 40 + gap
                }],
                out.as_slice()
            );
        }
    }

    #[test]
    fn test_hold_too_short() {
        let mut uut = BurstFramer::new(TIMING);

        feed_quiet(&mut uut, &[started((0, 1), 0)]);
        let out = uut.frame(&[ended((0, 1), 10)], 10);
        assert_eq!(
            &[BurstOut::Reject {
                reason: RejectReason::HoldTooShort,
                at: 10
            }],
            out.as_slice()
        );

        // framer is re-armed for the next attempt
        feed_quiet(
            &mut uut,
            &[
                started((0, 1), 20),
                ended((0, 1), 40),
                started((2, 3), 44),
            ],
        );
        let out = uut.frame(&[ended((2, 3), 60)], 60);
        assert!(matches!(out.as_slice(), [BurstOut::Sequence { .. }]));
    }

    #[test]
    fn test_hold_boundary_is_exact() {
        // exactly min_hold qualifies, for both pulses
        let mut uut = BurstFramer::new(TIMING);
        feed_quiet(
            &mut uut,
            &[
                started((0, 1), 0),
                ended((0, 1), 15),
                started((2, 3), 19),
            ],
        );
        let out = uut.frame(&[ended((2, 3), 34)], 34);
        assert!(matches!(out.as_slice(), [BurstOut::Sequence { .. }]));

        // one frame shorter rejects
        let mut uut = BurstFramer::new(TIMING);
        feed_quiet(&mut uut, &[started((0, 1), 0)]);
        let out = uut.frame(&[ended((0, 1), 14)], 14);
        assert_eq!(
            &[BurstOut::Reject {
                reason: RejectReason::HoldTooShort,
                at: 14
            }],
            out.as_slice()
        );
    }

    #[test]
    fn test_short_second_pulse_rejects_whole_attempt() {
        let mut uut = BurstFramer::new(TIMING);
        feed_quiet(
            &mut uut,
            &[
                started((0, 1), 0),
                ended((0, 1), 20),
                started((2, 3), 24),
            ],
        );
        let out = uut.frame(&[ended((2, 3), 30)], 30);
        assert_eq!(
            &[BurstOut::Reject {
                reason: RejectReason::HoldTooShort,
                at: 30
            }],
            out.as_slice()
        );
    }

    #[test]
    fn test_gap_too_short_reseeds_with_offending_pulse() {
        let mut uut = BurstFramer::new(TIMING);

        feed_quiet(&mut uut, &[started((0, 1), 0), ended((0, 1), 20)]);
        let out = uut.frame(&[started((2, 3), 21)], 21);
        assert_eq!(
            &[BurstOut::Reject {
                reason: RejectReason::GapTooShort,
                at: 21
            }],
            out.as_slice()
        );

        // the early pulse is now the first pulse of a fresh attempt
        feed_quiet(&mut uut, &[ended((2, 3), 41), started((4, 5), 45)]);
        let out = uut.frame(&[ended((4, 5), 61)], 61);
        assert_eq!(
            &[BurstOut::Sequence {
                first: (2, 3),
                second: (4, 5),
                at: 61
            }],
            out.as_slice()
        );
    }

    #[test]
    fn test_pair_replacement_has_zero_gap() {
        let mut uut = BurstFramer::new(TIMING);
        feed_quiet(&mut uut, &[started((0, 1), 0)]);

        // a direct pair change arrives as end and start on one frame
        let out = uut.frame(&[ended((0, 1), 20), started((2, 3), 20)], 20);
        assert_eq!(
            &[BurstOut::Reject {
                reason: RejectReason::GapTooShort,
                at: 20
            }],
            out.as_slice()
        );
    }

    #[test]
    fn test_gap_timeout_on_quiet_frames() {
        let mut uut = BurstFramer::new(TIMING);
        feed_quiet(&mut uut, &[started((0, 1), 0), ended((0, 1), 20)]);

        // max_gap 6 plus slack 1: frame 27 is still within grace
        assert!(uut.frame(&[], 27).is_empty());
        let out = uut.frame(&[], 28);
        assert_eq!(
            &[BurstOut::Reject {
                reason: RejectReason::GapTooLong,
                at: 28
            }],
            out.as_slice()
        );
    }

    #[test]
    fn test_late_second_pulse_rejects_and_reseeds() {
        let mut uut = BurstFramer::new(TIMING);
        feed_quiet(&mut uut, &[started((0, 1), 0), ended((0, 1), 20)]);

        // a pulse starting past max_gap, before the timeout ticked
        let out = uut.frame(&[started((2, 3), 27)], 27);
        assert_eq!(
            &[BurstOut::Reject {
                reason: RejectReason::GapTooLong,
                at: 27
            }],
            out.as_slice()
        );

        // it still seeds a fresh attempt
        feed_quiet(&mut uut, &[ended((2, 3), 47), started((4, 5), 51)]);
        let out = uut.frame(&[ended((4, 5), 67)], 67);
        assert!(matches!(out.as_slice(), [BurstOut::Sequence { .. }]));
    }

    #[test]
    fn test_interference_rejects_from_every_state() {
        // from idle
        let mut uut = BurstFramer::new(TIMING);
        let out = uut.frame(&[PairTransition::Interference { at: 5 }], 5);
        assert_eq!(
            &[BurstOut::Reject {
                reason: RejectReason::Interference,
                at: 5
            }],
            out.as_slice()
        );

        // from a held first pulse
        feed_quiet(&mut uut, &[started((0, 1), 10)]);
        let out = uut.frame(&[PairTransition::Interference { at: 15 }], 15);
        assert!(matches!(
            out.as_slice(),
            [BurstOut::Reject {
                reason: RejectReason::Interference,
                ..
            }]
        ));

        // from the gap
        feed_quiet(&mut uut, &[started((0, 1), 30), ended((0, 1), 50)]);
        let out = uut.frame(&[PairTransition::Interference { at: 51 }], 51);
        assert!(matches!(
            out.as_slice(),
            [BurstOut::Reject {
                reason: RejectReason::Interference,
                ..
            }]
        ));

        // from a held second pulse
        feed_quiet(
            &mut uut,
            &[
                started((0, 1), 60),
                ended((0, 1), 80),
                started((2, 3), 84),
            ],
        );
        let out = uut.frame(&[PairTransition::Interference { at: 90 }], 90);
        assert!(matches!(
            out.as_slice(),
            [BurstOut::Reject {
                reason: RejectReason::Interference,
                ..
            }]
        ));

        // and the framer recovers afterwards
        feed_quiet(
            &mut uut,
            &[
                started((0, 1), 100),
                ended((0, 1), 120),
                started((2, 3), 124),
            ],
        );
        let out = uut.frame(&[ended((2, 3), 140)], 140);
        assert!(matches!(out.as_slice(), [BurstOut::Sequence { .. }]));
    }

    #[test]
    fn test_watchdog_abandons_stuck_pulse() {
        let mut uut = BurstFramer::new(TIMING);
        feed_quiet(&mut uut, &[started((0, 1), 0)]);

        assert!(uut.frame(&[], 80).is_empty());
        let out = uut.frame(&[], 81);
        assert_eq!(
            &[BurstOut::Reject {
                reason: RejectReason::Inactivity,
                at: 81
            }],
            out.as_slice()
        );

        // the eventual end of the stuck tone is quietly ignored
        assert!(uut.frame(&[ended((0, 1), 90)], 90).is_empty());
    }

    #[test]
    fn test_overlong_hold_is_tolerated() {
        let mut uut = BurstFramer::new(TIMING);

        // 40 frames is well past max_hold 25 but under the watchdog
        feed_quiet(
            &mut uut,
            &[
                started((0, 1), 0),
                ended((0, 1), 40),
                started((2, 3), 44),
            ],
        );
        let out = uut.frame(&[ended((2, 3), 60)], 60);
        assert_eq!(
            &[BurstOut::Sequence {
                first: (0, 1),
                second: (2, 3),
                at: 60
            }],
            out.as_slice()
        );
    }

    #[test]
    fn test_back_to_back_sequences() {
        let mut uut = BurstFramer::new(TIMING);

        for base in [0u64, 200u64] {
            feed_quiet(
                &mut uut,
                &[
                    started((0, 1), base),
                    ended((0, 1), base + 20),
                    started((2, 3), base + 24),
                ],
            );
            let out = uut.frame(&[ended((2, 3), base + 40)], base + 40);
            assert!(matches!(out.as_slice(), [BurstOut::Sequence { .. }]));
        }
    }

    #[test]
    fn test_unexpected_start_restarts_hold() {
        let mut uut = BurstFramer::new(TIMING);
        feed_quiet(&mut uut, &[started((0, 1), 0), started((2, 3), 10)]);

        // hold is measured from the restart, so this end is too early
        let out = uut.frame(&[ended((2, 3), 20)], 20);
        assert_eq!(
            &[BurstOut::Reject {
                reason: RejectReason::HoldTooShort,
                at: 20
            }],
            out.as_slice()
        );
    }

    #[test]
    fn test_reset_returns_to_idle() {
        let mut uut = BurstFramer::new(TIMING);
        feed_quiet(&mut uut, &[started((0, 1), 0), ended((0, 1), 20)]);
        uut.reset();

        // no gap timeout fires after reset
        assert!(uut.frame(&[], 100).is_empty());
    }

    #[test]
    fn test_reject_reason_text() {
        assert_eq!("gap too short", format!("{}", RejectReason::GapTooShort));
        assert!(RejectReason::Inactivity.describe().contains("stalled"));
    }
}
