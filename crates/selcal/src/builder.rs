use strum::IntoEnumIterator;

use crate::receiver::SelcalReceiver;
use crate::selcalcodes::{Letter, UnmappableToneErr};

/// Builds a SELCAL receiver
///
/// The builder comes with a sensible set of default options.
/// All you really need to provide is the input sampling rate.
/// The defaults follow the ARINC 596 signal: two tone pairs of
/// about one second each, separated by a gap of about two
/// tenths of a second.
///
/// The API specified by the builder is part of this crate's
/// API. The actual default values are *not*, however, and
/// are subject to revision in any minor release. If you
/// care very strongly about a setting, be sure to configure
/// it here.
#[derive(Clone, Debug, PartialEq)]
pub struct SelcalReceiverBuilder {
    input_rate: u32,
    candidate_frequencies: Vec<f32>,
    detection_threshold: f32,
    hysteresis_margin: f32,
    smoothing_bandwidth: f32,
    debounce_frames: u32,
    min_hold_secs: f32,
    max_hold_secs: f32,
    min_gap_secs: f32,
    max_gap_secs: f32,
    inactivity_secs: f32,
}

impl SelcalReceiverBuilder {
    /// New receiver chain with "sensible" defaults
    ///
    /// The only mandatory parameter is the input sampling
    /// rate, in Hz. To avoid computationally-intensive
    /// resampling in your sound server, you should use one
    /// of the native output rates of your sound card or an
    /// easy division thereof. 11025 Hz is a popular choice.
    /// Not every rate divides into whole decimated samples
    /// and whole frames; [`build()`](Self::build) reports
    /// rates that do not.
    pub fn new(input_rate: u32) -> Self {
        Self {
            input_rate,
            candidate_frequencies: Letter::iter().map(|letter| letter.tone_hz()).collect(),
            detection_threshold: 0.25f32,
            hysteresis_margin: 0.10f32,
            smoothing_bandwidth: 0.75f32,
            debounce_frames: 2,
            min_hold_secs: 0.75f32,
            max_hold_secs: 1.25f32,
            min_gap_secs: 0.10f32,
            max_gap_secs: 0.30f32,
            inactivity_secs: 4.0f32,
        }
    }

    /// Build a receiver chain
    ///
    /// Once built, the receiver chain is immediately ready to
    /// process samples. Building fails for input rates with no
    /// whole-frame split and for unusable candidate tables or
    /// timing limits; see [`ConfigErr`].
    pub fn build(&self) -> Result<SelcalReceiver, ConfigErr> {
        SelcalReceiver::try_from(self)
    }

    /// Candidate tone table (Hz)
    ///
    /// The receiver scores every frame against these tones and
    /// no others. The default table is the full sixteen-tone
    /// alphabet. You may restrict it to the tones of interest,
    /// which lowers both the compute cost and the false-trigger
    /// rate, but every entry must still map to a letter of the
    /// alphabet, and at least two are required to form a pair.
    pub fn with_candidate_frequencies(&mut self, tones_hz: &[f32]) -> &mut Self {
        self.candidate_frequencies = tones_hz.to_vec();
        self
    }

    /// Tone detection thresholds (score units)
    ///
    /// A tone becomes active when its smoothed score reaches
    /// `threshold` and stays active until the score falls below
    /// `threshold - margin`. Scores are normalized to the total
    /// in-band power: a lone tone scores about 1.0 and each
    /// member of an equal pair about 0.5, regardless of the
    /// absolute signal level.
    ///
    /// The margin keeps a sounding pair from flickering as the
    /// two tones beat against each other. We recommend keeping
    /// `margin` well below `threshold`.
    pub fn with_detection_threshold(&mut self, threshold: f32, margin: f32) -> &mut Self {
        self.detection_threshold = f32::clamp(threshold, 0.0, 1.0);
        self.hysteresis_margin = f32::clamp(margin, 0.0, 1.0);
        self
    }

    /// Score smoothing bandwidth (per frame)
    ///
    /// Per-frame tone scores are smoothed with a single-pole IIR
    /// filter: `score += (instant - score) * bw`. A value of
    /// `1.0` disables smoothing. Values low enough that a silent
    /// frame cannot pull an active tone below the close threshold
    /// will stretch measured pulses and gaps by a frame or more.
    pub fn with_smoothing_bandwidth(&mut self, bw: f32) -> &mut Self {
        self.smoothing_bandwidth = f32::clamp(bw, 0.0, 1.0);
        self
    }

    /// Transition debounce (frames)
    ///
    /// A change in tone pair activity must persist this many
    /// consecutive frames before it is believed. One frame
    /// disables debouncing. Single-frame dropouts and noise
    /// blips are absorbed at `2`, the default.
    pub fn with_debounce_frames(&mut self, frames: u32) -> &mut Self {
        self.debounce_frames = u32::max(frames, 1);
        self
    }

    /// Pulse hold limits (seconds)
    ///
    /// Each of the two pulses must sound for at least `min`
    /// seconds to be believed. Pulses longer than `max` are
    /// *not* rejected: transmitters routinely run long, and an
    /// overlong pulse still carries a valid code. The maximum is
    /// the point at which the receiver notes the pulse as
    /// overlong in its logs, and the inactivity timeout is the
    /// hard ceiling.
    pub fn with_hold_duration(&mut self, min_secs: f32, max_secs: f32) -> &mut Self {
        self.min_hold_secs = f32::max(min_secs, 0.0);
        self.max_hold_secs = f32::max(max_secs, self.min_hold_secs);
        self
    }

    /// Inter-pulse gap limits (seconds)
    ///
    /// The silent gap between the two pulses must last at least
    /// `min` and at most `max` seconds, inclusive on both ends.
    /// A pulse arriving early or late rejects the attempt, and
    /// the late pulse then seeds a fresh attempt of its own.
    pub fn with_gap_duration(&mut self, min_secs: f32, max_secs: f32) -> &mut Self {
        self.min_gap_secs = f32::max(min_secs, 0.0);
        self.max_gap_secs = f32::max(max_secs, self.min_gap_secs);
        self
    }

    /// Inactivity timeout (seconds)
    ///
    /// A pulse still sounding after this many seconds is
    /// abandoned as stuck carrier or interference. Must exceed
    /// the maximum hold duration.
    pub fn with_inactivity_timeout(&mut self, secs: f32) -> &mut Self {
        self.inactivity_secs = f32::max(secs, 0.0);
        self
    }

    /// Input sampling rate (Hz)
    pub fn input_rate(&self) -> u32 {
        self.input_rate
    }

    /// Candidate tone table (Hz)
    pub fn candidate_frequencies(&self) -> &[f32] {
        &self.candidate_frequencies
    }

    /// Tone detection thresholds
    ///
    /// Returns tuple of (`threshold`, `margin`). A tone opens at
    /// `threshold` and closes below `threshold - margin`.
    pub fn detection_threshold(&self) -> (f32, f32) {
        (self.detection_threshold, self.hysteresis_margin)
    }

    /// Score smoothing bandwidth (per frame)
    pub fn smoothing_bandwidth(&self) -> f32 {
        self.smoothing_bandwidth
    }

    /// Transition debounce (frames)
    pub fn debounce_frames(&self) -> u32 {
        self.debounce_frames
    }

    /// Pulse hold limits (seconds)
    ///
    /// Returns tuple of (`min`, `max`) hold durations.
    pub fn hold_duration(&self) -> (f32, f32) {
        (self.min_hold_secs, self.max_hold_secs)
    }

    /// Inter-pulse gap limits (seconds)
    ///
    /// Returns tuple of (`min`, `max`) gap durations.
    pub fn gap_duration(&self) -> (f32, f32) {
        (self.min_gap_secs, self.max_gap_secs)
    }

    /// Inactivity timeout (seconds)
    pub fn inactivity_timeout(&self) -> f32 {
        self.inactivity_secs
    }
}

impl std::default::Default for SelcalReceiverBuilder {
    fn default() -> Self {
        Self::new(11025)
    }
}

/// Errors rejecting an unusable receiver configuration
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ConfigErr {
    /// No whole-sample decimation and whole-frame split exists
    #[error("input rate {0} Hz has no usable decimation and frame split")]
    UnsupportedRate(u32),

    /// Candidate table too small or too large
    #[error("candidate tone table must have 2 to 16 entries, got {0}")]
    ToneTableSize(usize),

    /// A candidate frequency is not in the alphabet
    #[error("unusable candidate tone: {0}")]
    UnmappableTone(#[from] UnmappableToneErr),

    /// Two candidate entries map to the same letter
    #[error("candidate tone table repeats {0}")]
    DuplicateTone(Letter),

    /// Open/close thresholds leave no usable levels
    #[error(
        "detection threshold {open} and hysteresis margin {margin} \
         leave no usable open and close levels"
    )]
    Threshold { open: f32, margin: f32 },

    /// Smoothing bandwidth outside `(0, 1]`
    #[error("smoothing bandwidth must be in (0, 1], got {0}")]
    Smoothing(f32),

    /// A minimum duration is zero or negative
    #[error("minimum {what} duration must be positive, got {seconds} s")]
    Duration {
        /// Which option: "hold" or "gap"
        what: &'static str,
        /// The offending value
        seconds: f32,
    },

    /// Inactivity timeout does not exceed the maximum hold
    #[error("inactivity timeout {timeout} s must exceed the maximum hold {max_hold} s")]
    Watchdog {
        /// Configured timeout, seconds
        timeout: f32,
        /// Configured maximum hold, seconds
        max_hold: f32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = SelcalReceiverBuilder::default();
        assert_eq!(11025, cfg.input_rate());
        assert_eq!(16, cfg.candidate_frequencies().len());
        assert_eq!((0.25, 0.10), cfg.detection_threshold());
        assert_eq!((0.75, 1.25), cfg.hold_duration());
        assert_eq!((0.10, 0.30), cfg.gap_duration());
        assert_eq!(2, cfg.debounce_frames());
    }

    #[test]
    fn test_setters_clamp() {
        let mut cfg = SelcalReceiverBuilder::new(48000);
        cfg.with_detection_threshold(1.5, -0.2)
            .with_debounce_frames(0)
            .with_hold_duration(1.0, 0.5)
            .with_gap_duration(-0.1, 0.2)
            .with_smoothing_bandwidth(2.0);

        assert_eq!((1.0, 0.0), cfg.detection_threshold());
        assert_eq!(1, cfg.debounce_frames());
        // max hold is raised to meet the minimum
        assert_eq!((1.0, 1.0), cfg.hold_duration());
        assert_eq!((0.0, 0.2), cfg.gap_duration());
        assert_eq!(1.0, cfg.smoothing_bandwidth());
    }
}
