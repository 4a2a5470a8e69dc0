//! Decode reporting loop
//!
//! Binds the receiver to the sample source and prints every
//! decoded call: to stdout in the configured `--format`, and to
//! the `--log` file in the compact format. Pulse starts, pulse
//! ends, and rejected transmissions are narrated on the log
//! facade instead; raise `-v` to see them.

use std::fs::File;
use std::io::Write;

use chrono::Utc;
use log::warn;

use selcal::{SelcalCode, SelcalEventType, SelcalReceiver};

use crate::cli::{Args, OutputFormat};

/// Run the application
///
/// Runs the decode loop with the given command-line `args`, a
/// fully-initialized `receiver`, and an `input` iterator which
/// returns each `i16` sample from some input source until it is
/// exhausted. When the input ends, the receiver is flushed so
/// that a call cut off at the very end of a recording is still
/// reported.
pub fn run<I>(args: &Args, receiver: &mut SelcalReceiver, mut logfile: Option<&mut File>, input: I)
where
    I: Iterator<Item = i16>,
{
    for evt in receiver.iter(input.map(|sa| sa as f32)) {
        if let SelcalEventType::Decoded(code) = evt.what() {
            let code = *code;
            report(args, logfile.as_deref_mut(), &code, evt.input_sample_counter());
        }
    }

    if let Some(code) = receiver.flush() {
        let at = receiver.input_sample_counter();
        report(args, logfile.as_deref_mut(), &code, at);
    }
}

// Report one decoded call to stdout and the log file
fn report(args: &Args, logfile: Option<&mut File>, code: &SelcalCode, input_sample_counter: u64) {
    let stamp = Utc::now().format("%Y/%m/%d-%H:%M:%S").to_string();
    let line = compact_line(&stamp, args.freq_hz, code);

    if !args.quiet {
        match args.format {
            OutputFormat::Compact => println!("{}", line),
            OutputFormat::Verbose => {
                println!("{} selective call {}", stamp, code);
                if let Some(freq_hz) = args.freq_hz {
                    println!("  channel:      {:.3} kHz", freq_hz / 1000.0);
                }
                println!(
                    "  first pulse:  {} ({} {})",
                    code.first(),
                    code.first().lower(),
                    code.first().higher()
                );
                println!(
                    "  second pulse: {} ({} {})",
                    code.second(),
                    code.second().lower(),
                    code.second().higher()
                );
                println!("  input sample: {}", input_sample_counter);
            }
        }
    }

    if let Some(file) = logfile {
        if let Err(err) = writeln!(file, "{}", line) {
            warn!("unable to append to --log file: {}", err);
        }
    }
}

// One decode as a single log line
fn compact_line(stamp: &str, freq_hz: Option<f32>, code: &SelcalCode) -> String {
    match freq_hz {
        Some(freq_hz) => format!("{} {:.3} kHz {}", stamp, freq_hz / 1000.0, code),
        None => format!("{} {}", stamp, code),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compact_line() {
        let code: SelcalCode = "AB-CD".parse().unwrap();
        assert_eq!(
            "2024/03/07-18:22:41 8864.000 kHz AB-CD",
            compact_line("2024/03/07-18:22:41", Some(8864000.0), &code)
        );
        assert_eq!(
            "2024/03/07-18:22:41 AB-CD",
            compact_line("2024/03/07-18:22:41", None, &code)
        );
    }
}
