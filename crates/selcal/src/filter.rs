//! # FIR filter building blocks
//!
//! [`FilterCoeff`] holds an impulse response and implements the
//! multiply-accumulate operation of a Finite Impulse Response
//! filter: the previous `h.len()` input samples are multiplied
//! element-wise with `h`, and the sum of the products is the
//! output sample.
//!
//! [`Window`] is the companion fixed-length sample history. New
//! samples are pushed onto the right side; the oldest samples age
//! off the left. Pair a `Window` with a `FilterCoeff` of the same
//! length for ordinary streaming FIR filtering:
//!
//! ```ignore
//! let coeff = FilterCoeff::from_slice(&taps);
//! let mut wind: Window<f32> = Window::new(coeff.len());
//! wind.push_scalar(input);
//! let out: f32 = coeff.filter(&wind);
//! ```
//!
//! The history may also be any `DoubleEndedIterator` source, such
//! as a frame slice. This is how the per-tone complex filters are
//! run: one `filter()` call over an entire frame per tone, with no
//! sliding window at all.
//!
//! If the history is shorter than the coefficients, the missing
//! samples are taken as zero. If it is longer, the excess oldest
//! samples are ignored.

use std::collections::VecDeque;
use std::convert::AsRef;

use nalgebra::base::Scalar;
use nalgebra::DVector;
use num_traits::{One, Zero};

/// FIR filter coefficients
#[derive(Debug, Clone, PartialEq, PartialOrd, Eq)]
pub struct FilterCoeff<T>(DVector<T>)
where
    T: Copy + Scalar + One + Zero;

#[allow(dead_code)]
impl<T> FilterCoeff<T>
where
    T: Copy + Scalar + One + Zero,
{
    /// Create from an impulse response
    ///
    /// The coefficients `h` use the same representation as GNU
    /// Octave's `filter()` function: `h[0]` is the feedforward
    /// lag-0 coefficient and multiplies the newest sample.
    pub fn from_slice<S>(h: S) -> Self
    where
        S: AsRef<[T]>,
    {
        let inp = h.as_ref();
        FilterCoeff(DVector::from_iterator(inp.len(), inp.iter().copied()))
    }

    /// Number of filter coefficients
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Perform FIR filtering with the given sample history
    ///
    /// Computes the current output sample of the filter assuming
    /// the given `history`. `history` must be a
    /// `DoubleEndedIterator` which outputs the oldest sample
    /// first and the newest sample last. The newest sample is
    /// used for feedforward lag 0.
    pub fn filter<W, In, Out>(&self, history: W) -> Out
    where
        W: IntoIterator<Item = In>,
        W::IntoIter: DoubleEndedIterator,
        In: Copy + Scalar + std::ops::Mul<T, Output = Out>,
        Out: Copy + Scalar + Zero + std::ops::AddAssign,
    {
        multiply_accumulate(history, self.as_ref())
    }

    /// Filter coefficients as a slice
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        self.0.as_slice()
    }
}

impl<T> AsRef<[T]> for FilterCoeff<T>
where
    T: Copy + Scalar + One + Zero,
{
    #[inline]
    fn as_ref(&self) -> &[T] {
        self.as_slice()
    }
}

/// Fixed-length sliding sample history
#[derive(Clone, Debug)]
pub struct Window<T>(VecDeque<T>)
where
    T: Copy + Scalar + Zero;

#[allow(dead_code)]
impl<T> Window<T>
where
    T: Copy + Scalar + Zero,
{
    /// Create a window of `len` samples, all zero
    pub fn new(len: usize) -> Self {
        let mut q = VecDeque::with_capacity(len);
        q.resize(len, T::zero());
        Self(q)
    }

    /// Reset to zero initial conditions
    pub fn reset(&mut self) {
        for s in &mut self.0 {
            *s = T::zero()
        }
    }

    /// Window length
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Append a slice of samples
    ///
    /// The last sample of `input` becomes the most recent sample
    /// of the window. If `input` is longer than the window, only
    /// its rightmost chunk is taken.
    pub fn push<S>(&mut self, input: S)
    where
        S: AsRef<[T]>,
    {
        let input = input.as_ref();
        let input = if input.len() > self.0.len() {
            let start = input.len() - self.0.len();
            &input[start..]
        } else {
            input
        };

        // age off the size of input
        std::mem::drop(self.0.drain(0..input.len()));

        // add new
        self.0.extend(input.as_ref());
    }

    /// Append a single sample
    ///
    /// `input` becomes the most recent sample of the window.
    /// Returns the sample that aged off.
    #[inline]
    pub fn push_scalar(&mut self, input: T) -> T {
        let out = self.0.pop_front().unwrap_or(T::zero());
        self.0.push_back(input);
        out
    }

    /// Iterator over window contents, oldest sample first
    pub fn iter(&self) -> <&Window<T> as IntoIterator>::IntoIter {
        self.into_iter()
    }

    /// Copy the window contents to a vector, oldest sample first
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().collect()
    }

    /// Most recent sample pushed into the window
    #[inline]
    pub fn back(&self) -> T {
        *self.0.back().unwrap()
    }

    /// Oldest sample still in the window
    #[inline]
    pub fn front(&self) -> T {
        *self.0.front().unwrap()
    }
}

impl<'a, T> IntoIterator for &'a Window<T>
where
    T: Copy + Scalar + Zero,
{
    type Item = T;

    type IntoIter = std::iter::Copied<std::collections::vec_deque::Iter<'a, T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter().copied()
    }
}

// Sum of the element-wise product of `history` and `coeff`.
//
// `history[N-1]` is the most recent sample and pairs with
// `coeff[0]`. The inputs need not be the same length; the shorter
// one ends the sum. Any compatible arithmetic types may be used,
// including complex coefficients over real samples.
fn multiply_accumulate<W, In, Coeff, Out>(history: W, coeff: &[Coeff]) -> Out
where
    W: IntoIterator<Item = In>,
    W::IntoIter: DoubleEndedIterator,
    In: Copy + Scalar + std::ops::Mul<Coeff, Output = Out>,
    Coeff: Copy + Scalar,
    Out: Copy + Scalar + Zero + std::ops::AddAssign,
{
    let history = history.into_iter();
    let mut out = Out::zero();
    for (hi, co) in history.rev().zip(coeff.iter()) {
        out += hi * *co;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    use assert_approx_eq::assert_approx_eq;

    use num_complex::Complex;

    #[test]
    fn test_multiply_accumulate() {
        // trivial MAC is zero
        let out = multiply_accumulate(&[0.0f32; 0], &[0.0f32; 0]);
        assert_eq!(0.0f32, out);

        // newest sample pairs with coeff[0]; excess clips
        let out = multiply_accumulate(&[-7.0f32, 3.0f32], &[2.0f32]);
        assert_eq!(6.0f32, out);
        let out = multiply_accumulate(&[3.0f32], &[2.0f32, -7.0f32]);
        assert_eq!(6.0f32, out);

        // first difference of a constant input
        let out = multiply_accumulate(&[4.0f32, 4.0f32], &[1.0f32, -1.0f32]);
        assert_approx_eq!(0.0f32, out);
    }

    #[test]
    fn test_filter_complex_coeff() {
        // real samples against complex taps, as the tone bank runs
        let filter = FilterCoeff::from_slice(&[
            Complex::new(0.0f32, 1.0f32),
            Complex::new(1.0f32, 0.0f32),
        ]);

        let out: Complex<f32> = filter.filter([2.0f32, 4.0f32].iter().copied());
        assert_approx_eq!(out.re, 2.0f32);
        assert_approx_eq!(out.im, 4.0f32);

        // short history is zero-extended
        let out: Complex<f32> = filter.filter([4.0f32].iter().copied());
        assert_approx_eq!(out.re, 0.0f32);
        assert_approx_eq!(out.im, 4.0f32);
    }

    #[test]
    fn test_window() {
        let mut wind: Window<f32> = Window::new(3);
        assert_eq!(3, wind.len());
        assert_eq!(vec![0.0f32, 0.0f32, 0.0f32], wind.to_vec());

        wind.push(&[1.0f32]);
        assert_eq!(vec![0.0f32, 0.0f32, 1.0f32], wind.to_vec());
        wind.push(&[]);
        assert_eq!(vec![0.0f32, 0.0f32, 1.0f32], wind.to_vec());

        // overlong push keeps only the newest chunk
        wind.push(&[9.0f32, 5.0f32, 6.0f32, 7.0f32]);
        assert_eq!(vec![5.0f32, 6.0f32, 7.0f32], wind.to_vec());
        assert_eq!(7.0f32, wind.back());

        // scalar push returns the aged-off sample
        assert_eq!(5.0f32, wind.push_scalar(8.0f32));
        assert_eq!(vec![6.0f32, 7.0f32, 8.0f32], wind.to_vec());
        assert_eq!(3, wind.len());

        // window works directly as filter() history
        let ident = FilterCoeff::from_slice(&[1.0f32]);
        let newest: f32 = ident.filter(&wind);
        assert_eq!(8.0f32, newest);

        wind.reset();
        assert_eq!(3, wind.len());
        assert_eq!(vec![0.0f32, 0.0f32, 0.0f32], wind.to_vec());
    }
}
