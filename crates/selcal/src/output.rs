use crate::framing::RejectReason;
use crate::selcalcodes::{SelcalCode, TonePair};

/// Full SELCAL receiver status
///
/// Selective-call decoding occurs at two separate layers:
///
/// 1. **Pulse layer**: the tone detector and classifier turn
///    audio into *pulses*, intervals during which exactly one
///    tone pair is sounding.
///
/// 2. **Decode layer**: two pulses separated by a short gap are
///    validated and mapped into a [`SelcalCode`], or discarded
///    with a [`RejectReason`].
///
/// The [`what()`](SelcalReceiverEvent::what) method returns the
/// event, which may originate from either layer.
///
/// You can also query for a decoded [`code()`](SelcalReceiverEvent::code)
/// or a [`reject()`](SelcalReceiverEvent::reject) reason, if this
/// event carries one. Not all events have either of these things
/// to report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SelcalReceiverEvent {
    what: SelcalEventType,
    input_sample_counter: u64,
}

impl SelcalReceiverEvent {
    /// Decoded selective call, if any
    ///
    /// If the current update reports a complete, valid
    /// transmission, returns its code. Most events do not, and
    /// return `None`.
    pub fn code(&self) -> Option<&SelcalCode> {
        match self.what() {
            SelcalEventType::Decoded(code) => Some(code),
            _ => None,
        }
    }

    /// Rejection reason, if any
    ///
    /// If the current update reports a candidate transmission
    /// that was discarded, returns why.
    pub fn reject(&self) -> Option<RejectReason> {
        match self.what() {
            SelcalEventType::Rejected(reason) => Some(*reason),
            _ => None,
        }
    }

    /// Consume event, returning the decoded call, if any
    pub fn into_code(self) -> Option<SelcalCode> {
        match self.what {
            SelcalEventType::Decoded(code) => Some(code),
            _ => None,
        }
    }

    /// The event which triggered the output
    ///
    /// Either the pulse layer or the decode layer may trigger
    /// an event.
    pub fn what(&self) -> &SelcalEventType {
        &self.what
    }

    /// Event time, measured in input samples
    ///
    /// Reports the "time" of the event using a monotonic count
    /// of input samples. Pulse and rejection events are stamped
    /// with the onset of the condition that caused them, so
    /// durations between events reflect what was heard on the
    /// air, not when the receiver made up its mind.
    pub fn input_sample_counter(&self) -> u64 {
        self.input_sample_counter
    }
}

impl SelcalReceiverEvent {
    /// Create from event and time
    pub(crate) fn new<E>(what: E, input_sample_counter: u64) -> Self
    where
        E: Into<SelcalEventType>,
    {
        Self {
            what: what.into(),
            input_sample_counter,
        }
    }
}

impl From<SelcalReceiverEvent> for Option<SelcalCode> {
    fn from(rx: SelcalReceiverEvent) -> Self {
        rx.into_code()
    }
}

impl std::fmt::Display for SelcalReceiverEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{:<14}]: event {}",
            self.input_sample_counter,
            self.what()
        )
    }
}

/// Type of event
///
/// See [`SelcalReceiverEvent`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum SelcalEventType {
    /// Pulse layer event
    ///
    /// Pulse layer events report tone pairs starting and
    /// ending, and interference episodes.
    Pulse(PulseState),

    /// A complete, valid selective call
    Decoded(SelcalCode),

    /// A candidate transmission was discarded
    Rejected(RejectReason),
}

impl From<PulseState> for SelcalEventType {
    fn from(inp: PulseState) -> Self {
        Self::Pulse(inp)
    }
}

impl From<SelcalCode> for SelcalEventType {
    fn from(inp: SelcalCode) -> Self {
        Self::Decoded(inp)
    }
}

impl From<RejectReason> for SelcalEventType {
    fn from(inp: RejectReason) -> Self {
        Self::Rejected(inp)
    }
}

impl AsRef<str> for SelcalEventType {
    fn as_ref(&self) -> &str {
        match self {
            SelcalEventType::Pulse(_) => "pulse",
            SelcalEventType::Decoded(_) => "decoded",
            SelcalEventType::Rejected(_) => "rejected",
        }
    }
}

impl std::fmt::Display for SelcalEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SelcalEventType::Pulse(evt) => write!(f, "[{}]: {}", self.as_ref(), evt),
            SelcalEventType::Decoded(code) => write!(f, "[{}]: \"{}\"", self.as_ref(), code),
            SelcalEventType::Rejected(reason) => write!(f, "[{}]: {}", self.as_ref(), reason),
        }
    }
}

/// Pulse layer status
///
/// A *pulse* is an interval during which exactly one candidate
/// tone pair is sounding. The decode layer assembles two pulses
/// into a selective call; these events expose the raw pulses as
/// they are heard.
///
/// Clients **MUST NOT** treat a single pulse as a received call.
/// Calls should instead be obtained from the decode layer's
/// [`Decoded`](SelcalEventType::Decoded) event, which has
/// validated the two-pulse timing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum PulseState {
    /// A candidate tone pair began sounding
    Started(TonePair),

    /// The tone pair fell silent
    Ended(TonePair),

    /// Three or more candidate tones at once
    ///
    /// Reported once per contiguous episode. Any attempt in
    /// progress has been discarded.
    Interference,
}

impl AsRef<str> for PulseState {
    fn as_ref(&self) -> &str {
        match self {
            PulseState::Started(_) => "pulse started",
            PulseState::Ended(_) => "pulse ended",
            PulseState::Interference => "interference",
        }
    }
}

impl std::fmt::Display for PulseState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PulseState::Started(pair) | PulseState::Ended(pair) => {
                write!(f, "{}: \"{}\"", self.as_ref(), pair)
            }
            PulseState::Interference => write!(f, "{}", self.as_ref()),
        }
    }
}
