//! Signal constants, rate planning, and filter synthesis

use nalgebra::DVector;
use num_complex::Complex;

const TWOPI: f32 = 2.0 * std::f32::consts::PI;

/// Low edge of the tone band (Hz)
///
/// The lowest assigned tone is 312.6 Hz. Everything below this
/// edge is rumble and carrier leakage.
pub const BAND_LOW_HZ: f32 = 270.0;

/// High edge of the tone band (Hz)
///
/// The highest assigned tone is 1479.1 Hz.
pub const BAND_HIGH_HZ: f32 = 1700.0;

/// Preferred internal signal rate (Hz)
///
/// Input rates are decimated toward this rate when they divide
/// evenly. The tone band tops out at 1479.1 Hz, so anything near
/// 11025 Hz carries it with lots of headroom.
pub const BASE_SIGNAL_RATE: u32 = 11025;

/// Frames-per-second divisors, tried in order
///
/// A frame is the unit of every downstream decision, so it must be
/// short enough to resolve the inter-pulse gap (nominally 0.2 s)
/// to a frame or three. These divisors put frames near 50 ms:
/// 11025 Hz → 21 fps → 525 samples, 12000 Hz → 20 fps → 600,
/// 8000 Hz → 20 fps → 400.
const FRAME_RATE_CANDIDATES: [u32; 3] = [20, 21, 16];

/// Sample rate plan derived from an input rate
///
/// See [`frame_timing()`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameTiming {
    /// Integer decimation applied to the input
    pub decimation: u32,

    /// Rate after decimation, `input_rate / decimation` (Hz)
    pub signal_rate: u32,

    /// Frame length at the signal rate, in samples
    pub frame_len: usize,
}

impl FrameTiming {
    /// Frames per second at the signal rate
    pub fn frame_rate(&self) -> u32 {
        self.signal_rate / self.frame_len as u32
    }
}

/// Derive decimation and frame split for an input rate
///
/// Picks the largest integer decimation that reaches
/// [`BASE_SIGNAL_RATE`] or stays above it, then splits the
/// decimated rate into whole frames using the first matching
/// [`FRAME_RATE_CANDIDATES`] divisor. Rates which divide into
/// neither whole samples nor whole frames are unusable, and
/// `None` is returned.
pub fn frame_timing(input_rate: u32) -> Option<FrameTiming> {
    let max_decimation = (input_rate / BASE_SIGNAL_RATE).max(1);
    for decimation in (1..=max_decimation).rev() {
        if input_rate % decimation != 0 {
            continue;
        }
        let signal_rate = input_rate / decimation;
        for frame_rate in FRAME_RATE_CANDIDATES {
            if signal_rate % frame_rate == 0 {
                return Some(FrameTiming {
                    decimation,
                    signal_rate,
                    frame_len: (signal_rate / frame_rate) as usize,
                });
            }
        }
    }
    None
}

/// Generate matched filter taps for one tone
///
/// The taps form a single-bin discrete Fourier transform over a
/// whole frame: running them against a frame of samples yields a
/// complex correlation whose magnitude estimates the amplitude of
/// a tone at `tone_hz`. The filter is generated for the given
/// `signal_rate`.
pub fn tone_matched_filter(
    frame_len: usize,
    tone_hz: f32,
    signal_rate: u32,
) -> DVector<Complex<f32>> {
    cisoid_matched_filter(frame_len, tone_hz / signal_rate as f32)
}

// Generate matched filter taps
//
// These FIR filter taps are a matched filter for a complex
// exponential cisoid at a fixed frequency, `freq_fs`. Specify
// frequency as a fraction of the sampling rate.
//
// The output taps are a time-reversed, complex-conjugated cisoid,
// scaled so that a unit-amplitude real tone correlates to unit
// magnitude.
fn cisoid_matched_filter(points: usize, freq_fs: f32) -> DVector<Complex<f32>> {
    let mut out = DVector::from_element(points, Complex::new(0.0, 0.0));
    for (iter, o) in out.iter_mut().enumerate() {
        *o = Complex::new(0.0, TWOPI * freq_fs * ((points - 1 - iter) as f32));
        *o = 2.0f32 * o.exp().conj() / points as f32;
    }
    out
}

/// Anti-alias taps for integer decimation
///
/// Windowed-sinc lowpass, run at the input rate ahead of a
/// keep-one-in-`decimation` downsampler. The cutoff sits at 90% of
/// the post-decimation Nyquist rate, and the tap count grows with
/// the decimation so the transition band stays proportionate.
/// Unity gain at DC.
pub fn anti_alias_taps(decimation: u32) -> DVector<f32> {
    let num_taps = (8 * decimation + 1) as usize;
    let mut taps = windowed_sinc(num_taps, 0.45 / decimation as f32);
    let sum: f32 = taps.iter().sum();
    taps /= sum;
    taps
}

/// Band-pass taps bracketing the tone band
///
/// Windowed-sinc band-pass from [`BAND_LOW_HZ`] to
/// [`BAND_HIGH_HZ`], run at the signal rate. The tap count scales
/// with the rate so the transition width stays near 180 Hz. Unity
/// gain at the geometric center of the band.
pub fn band_filter_taps(signal_rate: u32) -> DVector<f32> {
    let num_taps = ((signal_rate / 55) | 1).max(31) as usize;
    let hi = windowed_sinc(num_taps, BAND_HIGH_HZ / signal_rate as f32);
    let lo = windowed_sinc(num_taps, BAND_LOW_HZ / signal_rate as f32);
    let mut taps = hi - lo;
    let center_fs = (BAND_LOW_HZ * BAND_HIGH_HZ).sqrt() / signal_rate as f32;
    let gain = response_magnitude(taps.as_slice(), center_fs);
    taps /= gain;
    taps
}

// Windowed-sinc lowpass prototype
//
// `cutoff_fs` is the -6 dB edge as a fraction of the sampling
// rate. Hamming-windowed, not normalized.
fn windowed_sinc(num_taps: usize, cutoff_fs: f32) -> DVector<f32> {
    if num_taps < 2 {
        return DVector::from_element(1, 1.0);
    }
    let mid = (num_taps - 1) as f32 / 2.0;
    DVector::from_iterator(
        num_taps,
        (0..num_taps).map(|i| {
            let x = i as f32 - mid;
            let sinc = if x.abs() < 1.0e-6 {
                2.0 * cutoff_fs
            } else {
                (TWOPI * cutoff_fs * x).sin() / (std::f32::consts::PI * x)
            };
            let window = 0.54 - 0.46 * (TWOPI * i as f32 / (num_taps - 1) as f32).cos();
            sinc * window
        }),
    )
}

// Magnitude of the frequency response of `taps` at `freq_fs`,
// expressed as a fraction of the sampling rate
fn response_magnitude(taps: &[f32], freq_fs: f32) -> f32 {
    let mut acc = Complex::new(0.0f32, 0.0f32);
    for (n, tap) in taps.iter().enumerate() {
        acc += *tap * Complex::new(0.0, -TWOPI * freq_fs * n as f32).exp();
    }
    acc.norm()
}

/// Sum-of-sines tone synthesis
///
/// This method is designed for use in tests. Generates
/// `num_samples` samples of the given tones sounding
/// simultaneously, each at `amplitude`, at sampling rate `fs`.
#[cfg(test)]
pub fn tone_burst(tones_hz: &[f32], fs: u32, num_samples: usize, amplitude: f32) -> Vec<f32> {
    let mut out = vec![0.0f32; num_samples];
    for tone_hz in tones_hz {
        let rad_per_sa = TWOPI * tone_hz / (fs as f32);
        let mut phase = 0.0f32;
        for sa in out.iter_mut() {
            *sa += amplitude * phase.sin();
            phase += rad_per_sa;
            if phase > TWOPI {
                // wrapped
                phase -= TWOPI;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    use assert_approx_eq::assert_approx_eq;

    use crate::filter::FilterCoeff;

    #[test]
    fn test_cisoid_matched_filter() {
        // quarter-rate cisoid: taps cycle through the four axes
        const FREQ_FS: f32 = 0.25f32;
        const EXPECT_REAL: &[f32] = &[0.0f32, -1.0, 0.0, 1.0];
        const EXPECT_IMAG: &[f32] = &[1.0f32, 0.0, -1.0, 0.0];

        let gain = 2.0f32 / EXPECT_REAL.len() as f32;
        let out = cisoid_matched_filter(EXPECT_REAL.len(), FREQ_FS);
        for (i, item) in out.iter().enumerate() {
            let d = (item - gain * Complex::new(EXPECT_REAL[i], EXPECT_IMAG[i])).norm();
            assert!(d < 1e-4);
        }
    }

    #[test]
    fn test_tone_filter_selectivity() {
        let timing = frame_timing(11025).unwrap();
        let own = FilterCoeff::from_slice(
            tone_matched_filter(timing.frame_len, 977.2, timing.signal_rate).as_slice(),
        );
        let other = FilterCoeff::from_slice(
            tone_matched_filter(timing.frame_len, 312.6, timing.signal_rate).as_slice(),
        );

        let frame = tone_burst(&[977.2], timing.signal_rate, timing.frame_len, 1.0);

        // matched tone correlates near unit magnitude
        let hit: Complex<f32> = own.filter(frame.iter().copied());
        assert_approx_eq!(hit.norm(), 1.0f32, 2.0e-2);

        // a distant tone barely registers
        let miss: Complex<f32> = other.filter(frame.iter().copied());
        assert!(miss.norm() < 0.05);
    }

    #[test]
    fn test_frame_timing() {
        const EXPECT: &[(u32, u32, u32, usize)] = &[
            (11025, 1, 11025, 525),
            (22050, 2, 11025, 525),
            (44100, 4, 11025, 525),
            (48000, 4, 12000, 600),
            (8000, 1, 8000, 400),
            (16000, 1, 16000, 800),
            (96000, 8, 12000, 600),
        ];

        for (input_rate, decimation, signal_rate, frame_len) in EXPECT.iter().copied() {
            let timing = frame_timing(input_rate).unwrap();
            assert_eq!(decimation, timing.decimation, "rate {}", input_rate);
            assert_eq!(signal_rate, timing.signal_rate, "rate {}", input_rate);
            assert_eq!(frame_len, timing.frame_len, "rate {}", input_rate);
            assert_eq!(
                input_rate,
                timing.signal_rate * timing.decimation,
                "rate {}",
                input_rate
            );
        }

        assert_eq!(21, frame_timing(11025).unwrap().frame_rate());
        assert_eq!(20, frame_timing(48000).unwrap().frame_rate());

        // a prime rate splits into nothing
        assert_eq!(None, frame_timing(7919));
    }

    #[test]
    fn test_band_filter_response() {
        let taps = band_filter_taps(11025);
        let response = |hz: f32| response_magnitude(taps.as_slice(), hz / 11025.0);

        // unity in the middle of the band
        assert_approx_eq!(response(677.0), 1.0f32, 5.0e-2);

        // every assigned tone passes with most of its amplitude
        assert!(response(312.6) > 0.7);
        assert!(response(1479.1) > 0.9);

        // rumble and hiss are rejected
        assert!(response(0.0) < 0.01);
        assert!(response(50.0) < 0.05);
        assert!(response(2500.0) < 0.05);
    }

    #[test]
    fn test_anti_alias_response() {
        let taps = anti_alias_taps(4);
        assert_eq!(33, taps.len());

        // unity at DC
        let sum: f32 = taps.iter().sum();
        assert_approx_eq!(sum, 1.0f32, 1.0e-6);

        // in-band tone passes: 1479.1 Hz at a 44100 Hz input
        assert!(response_magnitude(taps.as_slice(), 1479.1 / 44100.0) > 0.95);

        // alias sources above the fold are attenuated
        assert!(response_magnitude(taps.as_slice(), 0.22) < 0.1);
    }

    #[test]
    fn test_tone_burst_power() {
        // one unit tone has mean-square power near one half
        let samples = tone_burst(&[525.0], 11025, 525, 1.0);
        let power: f32 = samples.iter().map(|sa| sa * sa).sum::<f32>() / samples.len() as f32;
        assert_approx_eq!(power, 0.5f32, 1.0e-2);

        // two tones sum
        let samples = tone_burst(&[312.6, 977.2], 11025, 525, 1.0);
        let power: f32 = samples.iter().map(|sa| sa * sa).sum::<f32>() / samples.len() as f32;
        assert_approx_eq!(power, 1.0f32, 5.0e-2);
    }
}
