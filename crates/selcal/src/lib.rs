//! # selcal: SELCAL (ARINC 596) Decoding
//!
//! This crate provides a digital decoder for
//! [Selective Calling](https://en.wikipedia.org/wiki/SELCAL)
//! (SELCAL), the two-pulse, dual-tone signaling system used to
//! alert aircraft flight crews over HF and VHF voice channels.
//! It can detect selective calls in an audio signal and report
//! the decoded codes to the caller.
//!
//! ## Disclaimer
//!
//! This crate is dual-licensed MIT and Apache 2.0. Read these licenses
//! carefully as they may affect your rights.
//!
//! This crate has not been certified as an avionics component or
//! for any other purpose. The author **strongly discourages** its
//! use in safety-critical applications, including as a flight-deck
//! alerting device. Licensed airborne SELCAL equipment is governed
//! by standards this crate makes no attempt to satisfy.
//!
//! ## Example
//!
//! You will first need baseband audio from a receiver tuned to a
//! channel that carries selective calls. Obtain the audio signal
//! that you would normally listen to. You can use either
//!
//! * an audio "line out" jack from a radio, scanner, or other
//!   receiver; OR
//! * a software-defined radio
//!
//! In either case, obtaining the audio is beyond the scope of this
//! crate. To sample your soundcard, try
//! [cpal](https://crates.io/crates/cpal). If you have a stereo
//! signal, mix to mono first.
//!
//! ```
//! use selcal::{SelcalEventType, SelcalReceiverBuilder};
//!
//! # let some_audio_source_iterator = || std::iter::once(0.0f32);
//! #
//! // create a SelcalReceiver with your audio sampling rate
//! let mut rx = SelcalReceiverBuilder::new(11025)
//!     .with_detection_threshold(0.25, 0.10) // tone score to open, hysteresis margin
//!     .with_hold_duration(0.75, 1.25)       // accepted pulse lengths, in seconds
//!     .build()
//!     .expect("unsupported configuration");
//!
//! // let audiosrc be an iterator which outputs audio samples,
//! // such as a BufReader bound to stdin or a file, in f32
//! // format at the sampling rate (here 11025 Hz)
//! let audiosrc = some_audio_source_iterator();
//! for evt in rx.iter(audiosrc) {
//!     match evt.what() {
//!         SelcalEventType::Decoded(code) => {
//!             println!("selective call: {}", code);
//!         }
//!         SelcalEventType::Rejected(reason) => {
//!             println!("rejected transmission: {}", reason);
//!         }
//!         _ => {}
//!     }
//! }
//! ```
//!
//! The digital receiver is created via a
//! [builder](struct.SelcalReceiverBuilder.html).
//!
//! The [`SelcalReceiver`](struct.SelcalReceiver.html) binds by iterator
//! to any source of `f32` PCM mono (1-channel) audio samples. If you're
//! using `i16` samples (as most sound cards do), you'll need to cast
//! them to `f32`. There is no need to scale them; tone scores are
//! normalized to the received power.
//!
//! The iterator consumes as many samples as possible until the next
//! [`SelcalReceiverEvent`](struct.SelcalReceiverEvent.html). Events
//! include individual tone pulses starting and ending, rejected
//! candidate transmissions, and successfully decoded calls.
//!
//! A selective call addresses one airframe with a four-letter code
//! like "`AB-CD`." Codes are value types which may be constructed,
//! parsed, and compared directly:
//!
//! ```
//! use selcal::{Letter, SelcalCode};
//!
//! let code: SelcalCode = "AB-CD".parse().expect("malformed code");
//! assert_eq!("AB-CD", code.to_string());
//! assert_eq!(Letter::Alpha, code.first().lower());
//!
//! // single letters display as phonetic alphabet words
//! assert_eq!("Alpha", Letter::Alpha.to_string());
//!
//! // letters are assigned audio tones
//! assert_eq!(Ok(Letter::Kilo), Letter::for_frequency(794.3));
//! ```
//!
//! ## Background
//!
//! SELCAL predates digital air-ground links and remains in use on
//! oceanic and remote HF routes, where it lets flight crews shed
//! the constant static of an HF voice channel. A ground operator
//! who wishes to reach an aircraft transmits that airframe's code
//! as two bursts of audio, each a sum of two sine tones. Receivers
//! aboard the aircraft mute the channel until their own code is
//! heard, then sound a chime and light an annunciator.
//!
//! The signaling format is standardized as ARINC 596. Each of the
//! two pulses lasts about one second, the pause between them is
//! about two tenths of a second, and the tones are drawn from a
//! table of sixteen frequencies between 312.6 Hz and 1479.1 Hz,
//! lettered `A` through `S` with `I`, `N`, and `O` skipped. The
//! letters of each pulse are always transmitted, listed, and
//! decoded in ascending tone order. A 32-tone extension exists for
//! newer installations; this crate decodes the sixteen-tone system.
//!
//! This crate performs the audio-domain part of that job: it
//! detects the tone pairs, checks the pulse and gap timing, and
//! reports decoded codes. Deciding whether a decoded code is *your*
//! code is left to the caller.

#![allow(dead_code)]

mod builder;
mod classifier;
mod dcblock;
mod detector;
mod filter;
mod framing;
mod output;
mod receiver;
mod selcalcodes;
mod waveform;

pub use builder::{ConfigErr, SelcalReceiverBuilder};
pub use detector::InvalidFrameErr;
pub use framing::RejectReason;
pub use output::{PulseState, SelcalEventType, SelcalReceiverEvent};
pub use receiver::{DecodeErr, DecodeEvent, SelcalReceiver, SourceIter};
pub use selcalcodes::{InvalidCodeErr, Letter, SelcalCode, TonePair, UnmappableToneErr};
