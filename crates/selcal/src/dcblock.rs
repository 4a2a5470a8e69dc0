//! DC offset removal

use crate::filter::Window;

/// DC-blocking filter
///
/// Strips the DC component from the input while passing the tone
/// band through. Receiver audio chains often ride on a small
/// constant offset, which would otherwise leak into the frame
/// power estimate that tone scores are normalized against.
///
/// This is the dual moving-average design from
/// * R. Yates, "DC Blocker Algorithms," IEEE Sig. Proc. Mag.,
///   March 2008: pp 132-134
///
/// Linear phase, with a group delay of `len - 1` samples. A
/// length of `1` passes the input unchanged.
#[derive(Clone, Debug)]
pub struct DcBlocker {
    ff: MovingAverage,
    fb: MovingAverage,
}

impl DcBlocker {
    /// Create a DC blocker with the given averaging length
    ///
    /// `len` must be positive. The delay is `len - 1`.
    pub fn new(len: usize) -> Self {
        DcBlocker {
            ff: MovingAverage::new(len),
            fb: MovingAverage::new(len),
        }
    }

    /// Reset to zero initial conditions
    pub fn reset(&mut self) {
        self.ff.reset();
        self.fb.reset();
    }

    /// Remove DC from the input
    ///
    /// Returns a delayed copy of `input` with the DC estimate
    /// subtracted.
    pub fn filter(&mut self, input: f32) -> f32 {
        let (ma0, sig) = self.ff.filter(input);
        let (ma1, _) = self.fb.filter(ma0);
        if self.ff.len() > 1 {
            sig - ma1
        } else {
            sig
        }
    }
}

/// Moving average comb filter
///
/// Equivalent to an FIR filter of `len` taps, each `1 / len`, but
/// maintained as a running sum with one add and one subtract per
/// sample. Delay is `len - 1`.
#[derive(Clone, Debug)]
struct MovingAverage {
    window: Window<f32>,
    inv_len: f32,
    moving_sum: f32,
}

impl MovingAverage {
    /// New moving average of `len > 0` samples
    pub fn new(len: usize) -> Self {
        assert!(len > 0);
        Self {
            window: Window::new(len),
            inv_len: 1.0f32 / (len as f32),
            moving_sum: 0.0f32,
        }
    }

    /// Reset to zero initial conditions
    pub fn reset(&mut self) {
        self.window.reset();
        self.moving_sum = 0.0f32;
    }

    /// Averaging length
    #[inline]
    pub fn len(&self) -> usize {
        self.window.len()
    }

    /// Push `input` and take the current average
    ///
    /// Returns the moving average and, second, the input sample
    /// delayed by the window length.
    #[inline]
    pub fn filter(&mut self, input: f32) -> (f32, f32) {
        let aged = self.window.push_scalar(input);
        self.moving_sum += input - aged;
        (self.moving_sum * self.inv_len, self.window.front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_moving_average() {
        // length 1 is a passthrough
        let mut mavg = MovingAverage::new(1);
        let (avg, delayed) = mavg.filter(5.0f32);
        assert_eq!(5.0f32, delayed);
        assert_approx_eq!(5.0f32, avg);

        // length 3 matches the FIR filter [1 1 1]/3
        const INPUT: &[f32] = &[3.0, 0.0, 6.0, -3.0];
        const EXPECT: &[f32] = &[1.0, 1.0, 3.0, 1.0];

        let mut mavg = MovingAverage::new(3);
        let mut last_delayed = 0.0f32;
        for (expect, inp) in EXPECT.iter().zip(INPUT.iter()) {
            let (avg, delayed) = mavg.filter(*inp);
            last_delayed = delayed;
            assert_approx_eq!(avg, *expect);
        }
        // delay is len - 1 samples
        assert_eq!(last_delayed, 0.0f32);
    }

    #[test]
    fn test_dc_block_passthrough() {
        let mut uut = DcBlocker::new(1);
        assert_eq!(uut.filter(42.0f32), 42.0f32);
        assert_eq!(uut.filter(-17.0f32), -17.0f32);
    }

    #[test]
    fn test_dc_block_removes_offset() {
        // alternating ±1 on a large offset: the offset goes, the
        // alternation survives
        let mut out = Window::<f32>::new(2);
        let mut uut = DcBlocker::new(31);
        let mut clk = 1.0f32;
        for _i in 0..256 {
            out.push_scalar(uut.filter(64.0f32 + clk));
            clk = -clk;
        }
        let tail = out.to_vec();
        assert_approx_eq!(tail[0], 1.0f32, 1.0e-2);
        assert_approx_eq!(tail[1], -1.0f32, 1.0e-2);
    }
}
