use std::fmt::Display;
use std::path::PathBuf;

use clap::{error::ErrorKind, value_parser, CommandFactory, Parser, ValueEnum};

/// Standard input filename
const STDIN_FILE: &str = "-";

const USAGE_SHORT: &str = r#"
This program accepts raw PCM samples in signed 16-bit (i16) format, at the given sampling --rate, and decodes any SELCAL selective calls that are present. Decoded codes are printed one per line.

See --help for more details.

ALWAYS TEST YOUR DECODING SETUP!
"#;

const USAGE_LONG: &str = r#"
This program accepts raw PCM samples in signed 16-bit (i16) format, at the given sampling --rate, and decodes any SELCAL selective calls that are present. Decoded codes are printed to standard output, one per line, and optionally appended to a --log file.

You can pipe in an audio file with sox

    sox input.wav -t raw -r 11.025k -e signed -b 16 -c 1 - \
        | selcald -r 11025

To monitor a live channel, pipe from your radio's line out

    parec --channels 1 --format s16ne --rate 11025 \
        | selcald -r 11025 --freq-hz 8864000

Decode lines carry a UTC timestamp, the monitored channel (if --freq-hz is given), and the four-letter code:

    2024/03/07-18:22:41 8864.000 kHz AB-CD

Whether a decoded code is YOUR code is for you to decide.

ALWAYS TEST YOUR DECODING SETUP!
"#;

const ADVANCED: &str = "Advanced Decoder Options";

/// Top-level program arguments
#[derive(Parser, Clone, Debug)]
#[command(version)]
#[command(about, long_about = None)]
#[command(after_help = USAGE_SHORT, after_long_help = USAGE_LONG)]
#[command(max_term_width = 100)]
pub struct Args {
    /// Verbosity level (-vvv for more)
    #[arg(short, long, default_value_t = 0, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Print NOTHING to stdout, not even decoded codes
    ///
    /// A --log file, if configured, is still written.
    #[arg(short, long)]
    pub quiet: bool,

    /// Sampling rate (Hz)
    ///
    /// Set to the sampling rate of your audio source. If sampling from
    /// a sound card, use the card's native rate, usually 44100 or
    /// 48000. Avoid resampling the audio.
    #[arg(short, long, default_value_t = 11025)]
    pub rate: u32,

    /// Input file (or "-" for stdin)
    ///
    /// The input must be one-channel (mono), signed 16-bit
    /// native-endian at --rate.
    #[arg(long, default_value_t = STDIN_FILE.to_string())]
    pub file: String,

    /// Monitored channel frequency (Hz)
    ///
    /// Purely cosmetic: printed in decode lines so that logs from
    /// several receivers can be told apart.
    #[arg(long)]
    pub freq_hz: Option<f32>,

    /// Append decode lines to this file
    ///
    /// Lines are written in the compact format regardless of
    /// --format. The file is created if it does not exist.
    #[arg(long)]
    pub log: Option<PathBuf>,

    /// Decode output style
    #[arg(long, value_enum, default_value = "compact")]
    pub format: OutputFormat,

    /// Tone score required to open a tone (0.0 < SCORE ≤ 1.0)
    #[arg(long, default_value_t = 0.25)]
    #[arg(hide_short_help = true)]
    #[arg(help_heading = ADVANCED)]
    pub tone_open: f32,

    /// Hysteresis margin below --tone-open at which a tone closes
    #[arg(long, default_value_t = 0.10)]
    #[arg(hide_short_help = true)]
    #[arg(help_heading = ADVANCED)]
    pub tone_margin: f32,

    /// Tone score smoothing bandwidth (0.0 < BW ≤ 1.0)
    #[arg(long, default_value_t = 0.75)]
    #[arg(hide_short_help = true)]
    #[arg(help_heading = ADVANCED)]
    pub smoothing_bw: f32,

    /// Frames a tone change must persist before it is believed (≥1)
    #[arg(long, default_value_t = 2)]
    #[arg(value_parser = value_parser!(u32).range(1..))]
    #[arg(hide_short_help = true)]
    #[arg(help_heading = ADVANCED)]
    pub debounce: u32,

    /// Minimum accepted pulse length (ms)
    #[arg(long, default_value_t = 750)]
    #[arg(hide_short_help = true)]
    #[arg(help_heading = ADVANCED)]
    pub hold_min_ms: u32,

    /// Nominal maximum pulse length (ms)
    ///
    /// Longer pulses are tolerated but noted in the logs.
    #[arg(long, default_value_t = 1250)]
    #[arg(hide_short_help = true)]
    #[arg(help_heading = ADVANCED)]
    pub hold_max_ms: u32,

    /// Minimum accepted inter-pulse gap (ms)
    #[arg(long, default_value_t = 100)]
    #[arg(hide_short_help = true)]
    #[arg(help_heading = ADVANCED)]
    pub gap_min_ms: u32,

    /// Maximum accepted inter-pulse gap (ms)
    #[arg(long, default_value_t = 300)]
    #[arg(hide_short_help = true)]
    #[arg(help_heading = ADVANCED)]
    pub gap_max_ms: u32,

    /// Abandon a stuck transmission after this long (ms)
    #[arg(long, default_value_t = 4000)]
    #[arg(hide_short_help = true)]
    #[arg(help_heading = ADVANCED)]
    pub inactivity_ms: u32,
}

impl Args {
    /// Return true if the user requests input from stdin
    pub fn input_is_stdin(&self) -> bool {
        self.file == STDIN_FILE
    }
}

/// Decode output style
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// One line per decode: timestamp, channel, code
    Compact,

    /// Several lines per decode, with pulse detail
    Verbose,
}

/// A program-level error with exit code
#[derive(Debug)]
pub struct CliError {
    error: anyhow::Error,
    exit_code: i32,
}

impl CliError {
    /// Create new error with a custom exit code
    pub fn new(error: anyhow::Error, code: i32) -> CliError {
        CliError {
            error,
            exit_code: code,
        }
    }

    /// Print this error to the terminal
    ///
    /// Errors from clap are printed verbatim. Other types of errors
    /// are printed indirectly via clap's fancy formatter.
    pub fn print(&self) -> std::io::Result<()> {
        if let Some(e) = self.error.downcast_ref::<clap::Error>() {
            e.print()
        } else {
            Args::command()
                .error(ErrorKind::Format, self.to_string())
                .print()
        }
    }

    /// Print this error to the terminal and exit
    pub fn exit(&self) -> ! {
        drop(self.print());
        std::process::exit(self.exit_code);
    }
}

impl Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.error)
    }
}

impl std::error::Error for CliError {}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> CliError {
        CliError::new(err, 1)
    }
}

impl From<clap::Error> for CliError {
    fn from(err: clap::Error) -> CliError {
        let code = if err.use_stderr() { 1 } else { 0 };
        CliError::new(err.into(), code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clap() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
