//! SELCAL letters, tone pairs, and four-letter codes

use std::convert::TryFrom;
use std::fmt;
use std::str::FromStr;

use strum::{EnumMessage, IntoEnumIterator};
use thiserror::Error;

/// SELCAL code letter
///
/// Each letter is assigned one of the sixteen ARINC 596 audio
/// tones. Letters run `A` through `S`, skipping `I`, `N`, and `O`.
/// Letters order by ascending tone frequency, which is also
/// alphabetical order.
///
/// ```
/// use selcal::Letter;
///
/// assert_eq!("A", Letter::Alpha.as_str());
/// assert_eq!("Alpha", Letter::Alpha.as_display_str());
/// assert_eq!("Alpha", &format!("{}", Letter::Alpha));
/// assert!(Letter::Alpha < Letter::Bravo);
/// ```
///
/// Letters know their transmitted tone and can be looked up by it.
///
/// ```
/// # use selcal::Letter;
/// let found = Letter::for_frequency(312.6).unwrap();
/// assert_eq!(Letter::Alpha, found);
/// assert_eq!(312.6, found.tone_hz());
/// ```
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    strum_macros::EnumMessage,
    strum_macros::EnumString,
    strum_macros::EnumIter,
)]
#[repr(u8)]
pub enum Letter {
    /// Tone 1, 312.6 Hz
    #[strum(serialize = "A", detailed_message = "Alpha")]
    Alpha,

    /// Tone 2, 346.7 Hz
    #[strum(serialize = "B", detailed_message = "Bravo")]
    Bravo,

    /// Tone 3, 384.6 Hz
    #[strum(serialize = "C", detailed_message = "Charlie")]
    Charlie,

    /// Tone 4, 426.6 Hz
    #[strum(serialize = "D", detailed_message = "Delta")]
    Delta,

    /// Tone 5, 473.2 Hz
    #[strum(serialize = "E", detailed_message = "Echo")]
    Echo,

    /// Tone 6, 524.8 Hz
    #[strum(serialize = "F", detailed_message = "Foxtrot")]
    Foxtrot,

    /// Tone 7, 582.1 Hz
    #[strum(serialize = "G", detailed_message = "Golf")]
    Golf,

    /// Tone 8, 645.7 Hz
    #[strum(serialize = "H", detailed_message = "Hotel")]
    Hotel,

    /// Tone 9, 716.1 Hz
    ///
    /// `I` is skipped; `J` follows `H`.
    #[strum(serialize = "J", detailed_message = "Juliette")]
    Juliette,

    /// Tone 10, 794.3 Hz
    #[strum(serialize = "K", detailed_message = "Kilo")]
    Kilo,

    /// Tone 11, 881.0 Hz
    #[strum(serialize = "L", detailed_message = "Lima")]
    Lima,

    /// Tone 12, 977.2 Hz
    #[strum(serialize = "M", detailed_message = "Mike")]
    Mike,

    /// Tone 13, 1083.9 Hz
    ///
    /// `N` and `O` are skipped; `P` follows `M`.
    #[strum(serialize = "P", detailed_message = "Papa")]
    Papa,

    /// Tone 14, 1202.3 Hz
    #[strum(serialize = "Q", detailed_message = "Quebec")]
    Quebec,

    /// Tone 15, 1333.5 Hz
    #[strum(serialize = "R", detailed_message = "Romeo")]
    Romeo,

    /// Tone 16, 1479.1 Hz
    #[strum(serialize = "S", detailed_message = "Sierra")]
    Sierra,
}

impl Letter {
    /// Widest allowed mismatch between a configured candidate
    /// frequency and a table entry, in Hz
    ///
    /// The closest-spaced table entries are 34.1 Hz apart, so this
    /// tolerance is unambiguous.
    pub const FREQUENCY_TOLERANCE_HZ: f32 = 1.0;

    /// Assigned audio tone, in Hz
    pub fn tone_hz(&self) -> f32 {
        match self {
            Letter::Alpha => 312.6,
            Letter::Bravo => 346.7,
            Letter::Charlie => 384.6,
            Letter::Delta => 426.6,
            Letter::Echo => 473.2,
            Letter::Foxtrot => 524.8,
            Letter::Golf => 582.1,
            Letter::Hotel => 645.7,
            Letter::Juliette => 716.1,
            Letter::Kilo => 794.3,
            Letter::Lima => 881.0,
            Letter::Mike => 977.2,
            Letter::Papa => 1083.9,
            Letter::Quebec => 1202.3,
            Letter::Romeo => 1333.5,
            Letter::Sierra => 1479.1,
        }
    }

    /// Look up the letter assigned to a tone frequency
    ///
    /// Matches `hz` against the tone table, allowing a mismatch of
    /// up to [`FREQUENCY_TOLERANCE_HZ`](Self::FREQUENCY_TOLERANCE_HZ).
    /// Frequencies which match no table entry are
    /// [unmappable](UnmappableToneErr).
    pub fn for_frequency(hz: f32) -> Result<Letter, UnmappableToneErr> {
        Letter::iter()
            .find(|letter| (letter.tone_hz() - hz).abs() <= Letter::FREQUENCY_TOLERANCE_HZ)
            .ok_or(UnmappableToneErr { frequency: hz })
    }

    /// Phonetic string representation
    ///
    /// Converts to the phonetic alphabet word, like "`Quebec`."
    pub fn as_display_str(&self) -> &'static str {
        self.get_detailed_message().expect("missing definition")
    }

    /// Single-letter string representation
    pub fn as_str(&self) -> &'static str {
        self.get_serializations()[0]
    }
}

impl AsRef<str> for Letter {
    fn as_ref(&self) -> &'static str {
        self.as_str()
    }
}

impl fmt::Display for Letter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_display_str().fmt(f)
    }
}

impl TryFrom<char> for Letter {
    type Error = InvalidCodeErr;

    /// Convert from a single character
    ///
    /// Lowercase input is accepted. Characters outside the sixteen
    /// assigned letters, including `I`, `N`, and `O`, are errors.
    fn try_from(inp: char) -> Result<Self, Self::Error> {
        match inp.to_ascii_uppercase() {
            'A' => Ok(Letter::Alpha),
            'B' => Ok(Letter::Bravo),
            'C' => Ok(Letter::Charlie),
            'D' => Ok(Letter::Delta),
            'E' => Ok(Letter::Echo),
            'F' => Ok(Letter::Foxtrot),
            'G' => Ok(Letter::Golf),
            'H' => Ok(Letter::Hotel),
            'J' => Ok(Letter::Juliette),
            'K' => Ok(Letter::Kilo),
            'L' => Ok(Letter::Lima),
            'M' => Ok(Letter::Mike),
            'P' => Ok(Letter::Papa),
            'Q' => Ok(Letter::Quebec),
            'R' => Ok(Letter::Romeo),
            'S' => Ok(Letter::Sierra),
            other => Err(InvalidCodeErr::UnknownLetter(other)),
        }
    }
}

/// Two tones transmitted simultaneously
///
/// One SELCAL pulse sounds two distinct tones at once. The pair is
/// stored and displayed with its letters in ascending order, no
/// matter the order given at construction.
///
/// ```
/// use selcal::{Letter, TonePair};
///
/// let pair = TonePair::new(Letter::Bravo, Letter::Alpha).unwrap();
/// assert_eq!("AB", &format!("{}", pair));
/// assert_eq!(Letter::Alpha, pair.lower());
/// assert_eq!(Letter::Bravo, pair.higher());
/// ```
///
/// A pulse never repeats a tone; construction enforces this.
///
/// ```
/// # use selcal::{InvalidCodeErr, Letter, TonePair};
/// assert_eq!(
///     InvalidCodeErr::RepeatedLetter,
///     TonePair::new(Letter::Kilo, Letter::Kilo).unwrap_err()
/// );
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TonePair {
    lower: Letter,
    higher: Letter,
}

impl TonePair {
    /// Pair two letters, in either order
    ///
    /// The two letters must be distinct.
    pub fn new(a: Letter, b: Letter) -> Result<TonePair, InvalidCodeErr> {
        if a == b {
            return Err(InvalidCodeErr::RepeatedLetter);
        }
        let (lower, higher) = if a < b { (a, b) } else { (b, a) };
        Ok(TonePair { lower, higher })
    }

    /// Letter with the lower-frequency tone
    pub fn lower(&self) -> Letter {
        self.lower
    }

    /// Letter with the higher-frequency tone
    pub fn higher(&self) -> Letter {
        self.higher
    }

    /// Both letters, ascending
    pub fn letters(&self) -> [Letter; 2] {
        [self.lower, self.higher]
    }
}

impl fmt::Display for TonePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.lower.as_str(), self.higher.as_str())
    }
}

impl FromStr for TonePair {
    type Err = InvalidCodeErr;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let a = chars.next().ok_or(InvalidCodeErr::Malformed)?;
        let b = chars.next().ok_or(InvalidCodeErr::Malformed)?;
        if chars.next().is_some() {
            return Err(InvalidCodeErr::Malformed);
        }
        TonePair::new(Letter::try_from(a)?, Letter::try_from(b)?)
    }
}

/// Complete four-letter SELCAL code
///
/// A code is the [`TonePair`] of the first pulse followed by the
/// pair of the second pulse, written like "`AB-CD`." The two pairs
/// may be equal; only the letters *within* a pair must differ.
///
/// ```
/// use selcal::SelcalCode;
///
/// let code: SelcalCode = "AB-CD".parse().unwrap();
/// assert_eq!("AB-CD", &format!("{}", code));
/// assert_eq!("A", code.first().lower().as_str());
/// assert_eq!("D", code.second().higher().as_str());
///
/// // pairs normalize to ascending letter order
/// let same: SelcalCode = "ba-dc".parse().unwrap();
/// assert_eq!(code, same);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SelcalCode {
    first: TonePair,
    second: TonePair,
}

impl SelcalCode {
    /// Assemble a code from its two pulses, in transmission order
    pub fn new(first: TonePair, second: TonePair) -> SelcalCode {
        SelcalCode { first, second }
    }

    /// Pair sounded by the first pulse
    pub fn first(&self) -> TonePair {
        self.first
    }

    /// Pair sounded by the second pulse
    pub fn second(&self) -> TonePair {
        self.second
    }

    /// All four letters, in display order
    pub fn letters(&self) -> [Letter; 4] {
        [
            self.first.lower,
            self.first.higher,
            self.second.lower,
            self.second.higher,
        ]
    }
}

impl fmt::Display for SelcalCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.first, self.second)
    }
}

impl FromStr for SelcalCode {
    type Err = InvalidCodeErr;

    /// Parse a code of the form "`AB-CD`"
    ///
    /// Leading and trailing whitespace is ignored. Each half must be
    /// exactly two assigned letters.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (first, second) = s.trim().split_once('-').ok_or(InvalidCodeErr::Malformed)?;
        Ok(SelcalCode::new(first.parse()?, second.parse()?))
    }
}

/// A letter sequence which is not a valid SELCAL code
#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
pub enum InvalidCodeErr {
    /// Character has no tone assignment
    #[error("\"{0}\" is not a SELCAL letter")]
    UnknownLetter(char),

    /// A pulse may not sound the same tone twice
    #[error("the two tones of a pulse must be distinct")]
    RepeatedLetter,

    /// Input does not have the form `AB-CD`
    #[error("SELCAL codes have the form \"AB-CD\"")]
    Malformed,
}

/// A frequency with no letter assignment
///
/// Emitted by [`Letter::for_frequency()`] when the given frequency
/// matches no tone table entry. Candidate tables are checked at
/// receiver construction, so this error from a running decode
/// indicates an internal defect.
#[derive(Error, Clone, Copy, Debug, PartialEq)]
#[error("no SELCAL tone is assigned at {frequency:.1} Hz")]
pub struct UnmappableToneErr {
    /// The frequency which failed to map, in Hz
    pub frequency: f32,
}
