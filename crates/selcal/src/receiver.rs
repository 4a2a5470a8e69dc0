//! Full receiver chain

#[cfg(not(test))]
use log::{error, info};

#[cfg(test)]
use std::println as error;
#[cfg(test)]
use std::println as info;

use std::collections::VecDeque;
use std::convert::TryFrom;
use std::iter::{IntoIterator, Iterator};

use arrayvec::ArrayVec;
use strum::IntoEnumIterator;

use crate::builder::{ConfigErr, SelcalReceiverBuilder};
use crate::classifier::{BurstClassifier, PairTransition};
use crate::dcblock::DcBlocker;
use crate::detector::{InvalidFrameErr, ToneDetector};
use crate::filter::{FilterCoeff, Window};
use crate::framing::{BurstFramer, BurstOut, BurstTiming, RejectReason};
use crate::output::{PulseState, SelcalReceiverEvent};
use crate::selcalcodes::{InvalidCodeErr, Letter, SelcalCode, TonePair, UnmappableToneErr};
use crate::waveform;

/// Decode-layer outcome for one frame
///
/// Returned by [`SelcalReceiver::feed`]. Most frames decide
/// nothing and report [`NoOp`](DecodeEvent::NoOp).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecodeEvent {
    /// A complete, valid selective call
    CodeDecoded(SelcalCode),

    /// A candidate transmission was discarded
    BurstRejected {
        /// Why the attempt failed
        reason: RejectReason,
        /// Input-sample time of the condition that caused it
        at: u64,
    },

    /// Nothing to report
    NoOp,
}

/// Decoding faults
///
/// On a configuration that passed [`build()`](SelcalReceiverBuilder::build)
/// validation, none of these occur: they indicate frames of the
/// wrong length handed to [`feed()`](SelcalReceiver::feed) or a
/// candidate table modified out from under the receiver.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum DecodeErr {
    /// Frame length does not match the receiver's design
    #[error("tone detector rejected frame: {0}")]
    InvalidFrame(#[from] InvalidFrameErr),

    /// A scored candidate tone has no letter
    #[error("candidate tone has no letter: {0}")]
    UnmappableTone(#[from] UnmappableToneErr),

    /// Decoded tones do not form a letter pair
    #[error("decoded tones do not form a code: {0}")]
    InvalidCode(#[from] InvalidCodeErr),
}

/// A complete SELCAL receiver chain
///
/// The receive chain takes `f32` audio samples and performs the
/// following operations:
///
/// 1. DC removal
/// 2. Anti-alias filtering and integer decimation down to the
///    signal rate, when the input rate allows it
/// 3. Band-pass filtering to the selective-call tone band
/// 4. Framing into fixed-length analysis frames, each scored
///    against the candidate tone table
/// 5. Pair classification, two-pulse sequencing, and code
///    mapping
///
/// To create the receiver, first create its Builder:
///
/// ```
/// use selcal::SelcalReceiverBuilder;
///
/// let receiver = SelcalReceiverBuilder::new(11025)
///     .build()
///     .expect("config rejected");
/// assert_eq!(receiver.input_rate(), 11025);
/// ```
///
/// See [module documentation](crate) for details.
#[derive(Clone, Debug)]
pub struct SelcalReceiver {
    dcblock: DcBlocker,
    resampler: Option<Resampler>,
    bandpass: Fir,
    framebuf: Vec<f32>,
    detector: ToneDetector,
    classifier: BurstClassifier,
    framer: BurstFramer,
    tones: Vec<f32>,
    pending: VecDeque<SelcalReceiverEvent>,
    input_rate: u32,
    decimation: u32,
    frame_len: usize,
    input_sample_counter: u64,
    frame_counter: u64,
}

impl SelcalReceiver {
    /// Receive selective calls from a source of audio
    ///
    /// Bind an iterator which will consume the `input` and
    /// produce [`SelcalReceiverEvent`]s, which include:
    ///
    /// * notifications about tone pulses starting and ending,
    /// * rejected candidate transmissions; and
    /// * successfully decoded calls
    ///
    /// The `input` must be f32 PCM mono audio at the
    /// [`input_rate()`](#method.input_rate) for this receiver.
    /// Sound cards commonly output audio samples in `i16`
    /// format. You must perform the conversion to
    /// floating-point yourself, if needed. It is unnecessary
    /// to scale the converted values; tone scores are
    /// normalized to the received power.
    ///
    /// The iterator will consume as many samples of `input`
    /// as are required to produce the next event. It will
    /// return `None` if the input is exhausted and there
    /// are no new events.
    #[must_use = "iterators are lazy and do nothing unless consumed"]
    pub fn iter<'rx, I, T>(&'rx mut self, input: I) -> SourceIter<'rx, T>
    where
        I: IntoIterator<Item = f32> + IntoIterator<IntoIter = T>,
        T: Iterator<Item = f32>,
    {
        SourceIter {
            source: input.into_iter(),
            receiver: self,
        }
    }

    /// Process one analysis frame of conditioned audio
    ///
    /// This is the frame-level entry point below
    /// [`iter()`](#method.iter). The `frame` must contain
    /// exactly [`frame_len()`](#method.frame_len) samples at the
    /// [`signal_rate()`](#method.signal_rate), already band-limited
    /// to the tone band; the front end is bypassed entirely.
    ///
    /// Returns the decode-layer outcome for this frame. Pulse
    /// layer events are not reported here. Do not mix `feed()`
    /// and `iter()` on one receiver: they share the frame
    /// clock.
    pub fn feed(&mut self, frame: &[f32]) -> Result<DecodeEvent, DecodeErr> {
        self.framebuf.clear();
        self.framebuf.extend_from_slice(frame);
        self.input_sample_counter = self
            .input_sample_counter
            .wrapping_add(frame.len() as u64 * self.decimation as u64);
        let update = self.classify_frame()?;
        Ok(update.decode)
    }

    /// Input sampling rate
    ///
    /// Returns the sampling rate expected by
    /// [`iter()`](#method.iter).
    pub fn input_rate(&self) -> u32 {
        self.input_rate
    }

    /// Internal signal rate, after decimation
    pub fn signal_rate(&self) -> u32 {
        self.input_rate / self.decimation
    }

    /// Analysis frame length, in signal-rate samples
    ///
    /// This is the frame size expected by
    /// [`feed()`](#method.feed).
    pub fn frame_len(&self) -> usize {
        self.frame_len
    }

    /// Lifetime total input sample counter
    ///
    /// Reports the lifetime total of input samples which
    /// have been processed.
    pub fn input_sample_counter(&self) -> u64 {
        self.input_sample_counter
    }

    /// Clear all DSP states and reset to zero initial conditions
    ///
    /// All buffers and states are cleared.
    pub fn reset(&mut self) {
        self.dcblock.reset();
        if let Some(resampler) = &mut self.resampler {
            resampler.reset();
        }
        self.bandpass.reset();
        self.framebuf.clear();
        self.detector.reset();
        self.classifier.reset();
        self.framer.reset();
        self.pending.clear();
        self.input_sample_counter = 0;
        self.frame_counter = 0;
    }

    /// Flush the DSP buffers and emit any leftover call
    ///
    /// The DSP algorithms impose delay on the input. When
    /// processing recorded audio that has been "close cut"
    /// to the extents of a transmission, the `SelcalReceiver`
    /// might not emit the call: the second pulse has not ended
    /// yet as far as the receiver is aware.
    ///
    /// This method flushes the input with an adequate number
    /// of zeros to ensure all buffered samples have been
    /// processed and the sequencing has settled. Returns the
    /// last decoded call, if any.
    ///
    /// You probably want to [`reset()`](#method.reset) after
    /// calling this method.
    pub fn flush(&mut self) -> Option<SelcalCode> {
        let two_seconds_of_zeros = std::iter::repeat(0.0f32)
            .zip(0..self.input_rate * 2)
            .map(|(sa, _)| sa);
        let mut out = None;
        for evt in self.iter(two_seconds_of_zeros) {
            if let Some(code) = evt.into_code() {
                out = Some(code);
            }
        }
        out
    }

    // Process a single input-rate sample
    //
    // Runs the front end and, on every completed frame, the
    // detection chain. Resulting events are queued for the
    // SourceIter.
    #[inline]
    fn process_input_sample(&mut self, input: f32) {
        let sa = self.dcblock.filter(input);
        self.input_sample_counter = self.input_sample_counter.wrapping_add(1);

        let sig = match &mut self.resampler {
            Some(resampler) => match resampler.input(sa) {
                Some(sig) => sig,
                None => return,
            },
            None => sa,
        };

        let band = self.bandpass.input(sig);
        self.framebuf.push(band);
        if self.framebuf.len() < self.frame_len {
            return;
        }

        match self.classify_frame() {
            Ok(update) => {
                for (state, at) in update.pulses {
                    self.pending.push_back(SelcalReceiverEvent::new(state, at));
                }
                match update.decode {
                    DecodeEvent::CodeDecoded(code) => {
                        let at = self.input_sample_counter;
                        self.pending.push_back(SelcalReceiverEvent::new(code, at));
                    }
                    DecodeEvent::BurstRejected { reason, at } => {
                        self.pending.push_back(SelcalReceiverEvent::new(reason, at));
                    }
                    DecodeEvent::NoOp => {}
                }
            }
            Err(err) => {
                // only reachable if the receiver's own invariants
                // are broken; make it loud
                error!("decode fault: {}", err);
            }
        }
    }

    // Score, classify, and sequence one buffered frame
    //
    // The frame buffer must be full. It is consumed either way.
    fn classify_frame(&mut self) -> Result<FrameUpdate, DecodeErr> {
        let scores = match self.detector.measure(&self.framebuf) {
            Ok(scores) => scores,
            Err(err) => {
                self.framebuf.clear();
                return Err(err.into());
            }
        };
        let transitions = self.classifier.classify(scores, self.frame_counter);
        self.framebuf.clear();
        let outs = self.framer.frame(&transitions, self.frame_counter);
        self.frame_counter += 1;

        let mut pulses = ArrayVec::new();
        for transition in &transitions {
            let (state, at) = match transition {
                PairTransition::Started { tones, at } => {
                    (PulseState::Started(self.pair_of(*tones)?), *at)
                }
                PairTransition::Ended { tones, at } => {
                    (PulseState::Ended(self.pair_of(*tones)?), *at)
                }
                PairTransition::Interference { at } => (PulseState::Interference, *at),
            };
            pulses.push((state, self.input_samples_at(at)));
        }

        let mut decode = DecodeEvent::NoOp;
        for out in &outs {
            decode = match out {
                BurstOut::Sequence { first, second, at } => {
                    let code = SelcalCode::new(self.pair_of(*first)?, self.pair_of(*second)?);
                    info!("decoded: \"{}\": frame {}", code, at);
                    DecodeEvent::CodeDecoded(code)
                }
                BurstOut::Reject { reason, at } => DecodeEvent::BurstRejected {
                    reason: *reason,
                    at: self.input_samples_at(*at),
                },
            };
        }

        Ok(FrameUpdate { pulses, decode })
    }

    // Map classifier tone indices into a letter pair
    fn pair_of(&self, tones: (usize, usize)) -> Result<TonePair, DecodeErr> {
        let lower = Letter::for_frequency(self.tones[tones.0])?;
        let higher = Letter::for_frequency(self.tones[tones.1])?;
        Ok(TonePair::new(lower, higher)?)
    }

    // Input-sample time of a frame ordinal
    fn input_samples_at(&self, frame_ordinal: u64) -> u64 {
        frame_ordinal * self.frame_len as u64 * self.decimation as u64
    }
}

impl TryFrom<&SelcalReceiverBuilder> for SelcalReceiver {
    type Error = ConfigErr;

    /// Create the SELCAL Receiver from its Builder
    ///
    /// Validates the configuration: the input rate must admit a
    /// whole-sample decimation and whole-frame split, every
    /// candidate tone must map to a distinct letter, and the
    /// thresholds and timing limits must be usable.
    fn try_from(cfg: &SelcalReceiverBuilder) -> Result<Self, ConfigErr> {
        let timing = waveform::frame_timing(cfg.input_rate())
            .ok_or(ConfigErr::UnsupportedRate(cfg.input_rate()))?;

        let tones = cfg.candidate_frequencies().to_vec();
        if tones.len() < 2 || tones.len() > Letter::iter().count() {
            return Err(ConfigErr::ToneTableSize(tones.len()));
        }
        let mut letters: Vec<Letter> = Vec::with_capacity(tones.len());
        for tone_hz in &tones {
            let letter = Letter::for_frequency(*tone_hz)?;
            if letters.contains(&letter) {
                return Err(ConfigErr::DuplicateTone(letter));
            }
            letters.push(letter);
        }

        let (open, margin) = cfg.detection_threshold();
        if open <= 0.0 || margin >= open {
            return Err(ConfigErr::Threshold { open, margin });
        }
        if cfg.smoothing_bandwidth() <= 0.0 {
            return Err(ConfigErr::Smoothing(cfg.smoothing_bandwidth()));
        }

        let (min_hold, max_hold) = cfg.hold_duration();
        let (min_gap, max_gap) = cfg.gap_duration();
        if min_hold <= 0.0 {
            return Err(ConfigErr::Duration {
                what: "hold",
                seconds: min_hold,
            });
        }
        if min_gap <= 0.0 {
            return Err(ConfigErr::Duration {
                what: "gap",
                seconds: min_gap,
            });
        }
        if cfg.inactivity_timeout() <= max_hold {
            return Err(ConfigErr::Watchdog {
                timeout: cfg.inactivity_timeout(),
                max_hold,
            });
        }

        // all durations become whole frame counts
        let fps = timing.frame_rate();
        let burst_timing = BurstTiming {
            min_hold: secs_to_frames(min_hold, fps),
            max_hold: secs_to_frames(max_hold, fps),
            min_gap: secs_to_frames(min_gap, fps),
            max_gap: secs_to_frames(max_gap, fps),
            slack: u64::from(cfg.debounce_frames().saturating_sub(1)),
            watchdog: secs_to_frames(cfg.inactivity_timeout(), fps),
        };

        let detector = ToneDetector::new(
            &tones,
            timing.frame_len,
            timing.signal_rate,
            cfg.smoothing_bandwidth(),
        );
        let classifier =
            BurstClassifier::new(tones.len(), open, open - margin, cfg.debounce_frames());
        let framer = BurstFramer::new(burst_timing);

        let bandpass = Fir::new(FilterCoeff::from_slice(
            waveform::band_filter_taps(timing.signal_rate).as_slice(),
        ));
        let resampler = if timing.decimation > 1 {
            Some(Resampler::new(
                FilterCoeff::from_slice(waveform::anti_alias_taps(timing.decimation).as_slice()),
                timing.decimation,
            ))
        } else {
            None
        };

        // corner well below the lowest tone
        let dcblock = DcBlocker::new((cfg.input_rate() / 100).max(3) as usize);

        Ok(Self {
            dcblock,
            resampler,
            bandpass,
            framebuf: Vec::with_capacity(timing.frame_len),
            detector,
            classifier,
            framer,
            tones,
            pending: VecDeque::new(),
            input_rate: cfg.input_rate(),
            decimation: timing.decimation,
            frame_len: timing.frame_len,
            input_sample_counter: 0,
            frame_counter: 0,
        })
    }
}

/// Sample source iterator
///
/// This iterator is bound to a source of mono f32 PCM
/// audio samples. Calling the `next()` method will
/// return the next [`SelcalReceiverEvent`] from the
/// receiver, or `None` if the available samples have been
/// consumed without any new events.
#[derive(Debug)]
pub struct SourceIter<'rx, I>
where
    I: Iterator<Item = f32>,
{
    source: I,
    receiver: &'rx mut SelcalReceiver,
}

impl<'rx, I> Iterator for SourceIter<'rx, I>
where
    I: Iterator<Item = f32>,
{
    type Item = SelcalReceiverEvent;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(event) = self.receiver.pending.pop_front() {
                info!("receiver {}", event);
                return Some(event);
            }
            let sa = self.source.next()?;
            self.receiver.process_input_sample(sa);
        }
    }
}

// Everything decided by one frame
struct FrameUpdate {
    // pulse-layer transitions, stamped with input-sample onsets
    pulses: ArrayVec<(PulseState, u64), 2>,

    // decode-layer outcome
    decode: DecodeEvent,
}

// Streaming FIR filter
#[derive(Clone, Debug)]
struct Fir {
    window: Window<f32>,
    taps: FilterCoeff<f32>,
}

impl Fir {
    fn new(taps: FilterCoeff<f32>) -> Self {
        Self {
            window: Window::new(taps.len()),
            taps,
        }
    }

    // Push without computing an output
    fn push(&mut self, sa: f32) {
        self.window.push_scalar(sa);
    }

    // Filter output for the current window
    fn output(&self) -> f32 {
        self.taps.filter(&self.window)
    }

    fn input(&mut self, sa: f32) -> f32 {
        self.push(sa);
        self.output()
    }

    fn reset(&mut self) {
        self.window.reset();
    }
}

// Anti-alias filter and integer decimator
//
// Emits one filtered output per `decimation` inputs. The filter
// is only evaluated on retained samples.
#[derive(Clone, Debug)]
struct Resampler {
    fir: Fir,
    decimation: u32,
    phase: u32,
}

impl Resampler {
    fn new(taps: FilterCoeff<f32>, decimation: u32) -> Self {
        Self {
            fir: Fir::new(taps),
            decimation,
            phase: 0,
        }
    }

    fn input(&mut self, sa: f32) -> Option<f32> {
        self.fir.push(sa);
        self.phase += 1;
        if self.phase == self.decimation {
            self.phase = 0;
            Some(self.fir.output())
        } else {
            None
        }
    }

    fn reset(&mut self) {
        self.fir.reset();
        self.phase = 0;
    }
}

// Whole frames at the frame rate, rounded to nearest
fn secs_to_frames(secs: f32, frame_rate: u32) -> u64 {
    ((secs * frame_rate as f32).round() as u64).max(1)
}
