use std::io;

use anyhow::{anyhow, Context};
use byteorder::{NativeEndian, ReadBytesExt};
use clap::Parser;
use log::{info, LevelFilter};

use selcal::SelcalReceiverBuilder;

mod app;
mod cli;

use cli::{Args, CliError};

fn main() {
    match selcald() {
        Ok(()) => {}
        Err(cli_error) => cli_error.exit(),
    }
}

fn selcald() -> Result<(), CliError> {
    // Parse options and start logging
    let args = Args::try_parse()?;
    log_setup(&args);

    // create the decoder
    let mut rx = SelcalReceiverBuilder::new(args.rate)
        .with_detection_threshold(args.tone_open, args.tone_margin)
        .with_smoothing_bandwidth(args.smoothing_bw)
        .with_debounce_frames(args.debounce)
        .with_hold_duration(
            args.hold_min_ms as f32 / 1000.0,
            args.hold_max_ms as f32 / 1000.0,
        )
        .with_gap_duration(
            args.gap_min_ms as f32 / 1000.0,
            args.gap_max_ms as f32 / 1000.0,
        )
        .with_inactivity_timeout(args.inactivity_ms as f32 / 1000.0)
        .build()
        .context("invalid receiver configuration")?;

    // open the decode log, if requested
    let mut logfile = match &args.log {
        Some(path) => Some(
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Unable to open --log \"{}\"", path.display()))?,
        ),
        None => None,
    };

    // file setup: locks stdin in case we need it
    let stdin = io::stdin();
    let stdin_handle = stdin.lock();
    let mut inbuf = file_setup(&args, stdin_handle)?;

    // processing: read i16 from the input source until it ends,
    // then flush
    app::run(
        &args,
        &mut rx,
        logfile.as_mut(),
        std::iter::from_fn(|| Some(inbuf.read_i16::<NativeEndian>().ok()?)),
    );

    Ok(())
}

fn log_setup(args: &Args) {
    if args.quiet {
        // no logging
        return;
    } else if std::env::var_os("RUST_LOG").is_none() {
        // parameter controls
        let log_filter = match args.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        };

        pretty_env_logger::formatted_builder()
            .filter_module("selcal", log_filter)
            .filter_module("selcald", log_filter)
            .init();
    } else {
        // environment controls
        pretty_env_logger::init();
    }
}

fn file_setup<'stdin>(
    args: &Args,
    stdin: std::io::StdinLock<'stdin>,
) -> Result<Box<dyn io::BufRead + 'stdin>, anyhow::Error> {
    if args.input_is_stdin() {
        info!("SELCAL decoder reading standard input");
        if !is_terminal(&std::io::stdin()) {
            Ok(Box::new(io::BufReader::new(stdin)))
        } else {
            Err(anyhow!(
                "cowardly refusing to read audio samples from a terminal.

Pipe a source of raw uncompressed audio from sox, parec, rtl_fm,
or similar into this program."
            ))
        }
    } else {
        info!("SELCAL decoder reading file: \"{}\"", &args.file);
        Ok(Box::new(io::BufReader::new(
            std::fs::File::open(&args.file)
                .with_context(|| format!("Unable to open --file \"{}\"", args.file))?,
        )))
    }
}

#[cfg(not(target_os = "windows"))]
fn is_terminal<S>(stream: &S) -> bool
where
    S: std::os::fd::AsRawFd,
{
    terminal_size::terminal_size_using_fd(stream.as_raw_fd()).is_some()
}

#[cfg(target_os = "windows")]
fn is_terminal<S>(stream: &S) -> bool
where
    S: std::os::windows::io::AsRawHandle,
{
    terminal_size::terminal_size_using_handle(stream.as_raw_handle()).is_some()
}
