//! Per-frame tone energy measurement

use num_complex::Complex;
use thiserror::Error;

use crate::filter::FilterCoeff;
use crate::waveform;

/// Tone bank measuring candidate tone strength per frame
///
/// One matched filter per candidate tone, each a single-bin
/// discrete Fourier transform spanning a whole frame. Per-tone
/// power is normalized by total in-band frame power, making the
/// scores amplitude-independent: a lone pure tone scores near 1.0,
/// each tone of an equal pair near 0.5, and each of three equal
/// tones near 0.33. Silence scores near zero everywhere.
///
/// Scores are smoothed across frames with a one-pole lowpass so
/// that a single noisy frame cannot swing them far.
#[derive(Clone, Debug)]
pub struct ToneDetector {
    filters: Vec<FilterCoeff<Complex<f32>>>,
    scores: Vec<f32>,
    frame_len: usize,
    smoothing_bandwidth: f32,
}

impl ToneDetector {
    /// Create a detector for the given candidate tones
    ///
    /// `candidate_tones_hz` orders the score output. Frames must
    /// contain exactly `frame_len` samples at `signal_rate`.
    /// `smoothing_bandwidth` is the one-pole coefficient, in
    /// `(0.0, 1.0]`; `1.0` disables smoothing.
    pub fn new(
        candidate_tones_hz: &[f32],
        frame_len: usize,
        signal_rate: u32,
        smoothing_bandwidth: f32,
    ) -> Self {
        assert!(!candidate_tones_hz.is_empty());
        assert!(smoothing_bandwidth > 0.0 && smoothing_bandwidth <= 1.0);
        let filters = candidate_tones_hz
            .iter()
            .map(|tone_hz| {
                FilterCoeff::from_slice(
                    waveform::tone_matched_filter(frame_len, *tone_hz, signal_rate).as_slice(),
                )
            })
            .collect();
        Self {
            filters,
            scores: vec![0.0f32; candidate_tones_hz.len()],
            frame_len,
            smoothing_bandwidth,
        }
    }

    /// Measure one frame
    ///
    /// Returns the smoothed per-tone scores, ordered like the
    /// candidate table the detector was built with. The frame must
    /// be exactly [`frame_len`](Self::frame_len) samples; frames of
    /// any other length are rejected without being read.
    pub fn measure(&mut self, frame: &[f32]) -> Result<&[f32], InvalidFrameErr> {
        if frame.len() != self.frame_len {
            return Err(InvalidFrameErr {
                want: self.frame_len,
                got: frame.len(),
            });
        }

        let frame_power =
            frame.iter().map(|sa| sa * sa).sum::<f32>() / self.frame_len as f32 + f32::EPSILON;

        for (filter, score) in self.filters.iter().zip(self.scores.iter_mut()) {
            let corr: Complex<f32> = filter.filter(frame.iter().copied());
            let tone_power = 0.5f32 * corr.norm_sqr();
            let instant = tone_power / frame_power;
            *score += (instant - *score) * self.smoothing_bandwidth;
        }

        Ok(&self.scores)
    }

    /// Forget all smoothed scores
    pub fn reset(&mut self) {
        for score in &mut self.scores {
            *score = 0.0f32;
        }
    }

    /// Number of candidate tones
    pub fn num_tones(&self) -> usize {
        self.filters.len()
    }

    /// Required frame length, in samples
    pub fn frame_len(&self) -> usize {
        self.frame_len
    }
}

/// A frame of the wrong length was fed to the detector
///
/// The detector never pads or truncates; the caller must fix its
/// framing.
#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
#[error("expected a frame of {want} samples, got {got}")]
pub struct InvalidFrameErr {
    /// Required frame length
    pub want: usize,

    /// Length actually provided
    pub got: usize,
}
