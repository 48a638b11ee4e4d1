//! huffarc: command-line archiver on top of huffarc-core.
//!
//! The selected task runs on a worker thread; the main thread waits for it
//! and, with `--interactive`, a reader thread turns stdin lines into pause,
//! resume and cancel requests.

mod config;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;

use huffarc_core::metrics::{format_duration, format_size};
use huffarc_core::{
    compare_algorithms, compress_files, compress_folder, decompress_all, decrypt_archive,
    encrypt_archive, extract_one, list_entries, AlgorithmComparison, CompressionInfo,
    OperationControl,
};
use log::{error, info, warn, LevelFilter};
use simplelog::{ColorChoice, TermLogger, TerminalMode};

use crate::config::{Config, Task};

/// What a finished task has to show.
enum Report {
    Compressed(CompressionInfo),
    Decompressed(CompressionInfo),
    Extracted { found: bool, output: PathBuf },
    Listing(Vec<String>),
    Written(PathBuf),
    Comparison(Vec<AlgorithmComparison>),
}

fn main() -> ExitCode {
    let config = match Config::from_args() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::from(2);
        }
    };

    // Available log levels are Error, Warn, Info, Debug, Trace
    if let Err(err) = TermLogger::init(
        config.log_level,
        simplelog::Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    ) {
        eprintln!("warning: logger unavailable: {err}");
    }

    if config.print_config {
        config.print();
    }

    let control = Arc::new(OperationControl::new());
    if config.interactive {
        spawn_control_reader(Arc::clone(&control));
    }

    let show_progress = config.log_level > LevelFilter::Error;
    let worker = {
        let control = Arc::clone(&control);
        let task = config.task.clone();
        thread::spawn(move || run(&task, &control, show_progress))
    };

    let result = match worker.join() {
        Ok(result) => result,
        Err(_) => {
            error!("worker thread panicked");
            return ExitCode::FAILURE;
        }
    };

    match result {
        Ok(report) => {
            print_report(&report);
            match report {
                Report::Extracted { found: false, .. } => ExitCode::FAILURE,
                _ => ExitCode::SUCCESS,
            }
        }
        Err(err) if err.is_canceled() => {
            warn!("canceled, no output was kept");
            ExitCode::from(130)
        }
        Err(err) if err.is_wrong_password() => {
            error!("{err}");
            error!("check the password and try again");
            ExitCode::from(3)
        }
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(
    task: &Task,
    control: &OperationControl,
    show_progress: bool,
) -> huffarc_core::Result<Report> {
    let mut last = None;
    let mut progress = |percent: u8| {
        if show_progress && last != Some(percent) {
            last = Some(percent);
            eprint!("\rprogress: {percent:3}%");
            if percent == 100 {
                eprintln!();
            }
            let _ = io::stderr().flush();
        }
    };

    let report = match task {
        Task::CompressFiles {
            inputs,
            output,
            options,
        } => Report::Compressed(compress_files(
            inputs,
            output,
            options,
            control,
            &mut progress,
        )?),
        Task::CompressFolder {
            folder,
            output,
            options,
        } => Report::Compressed(compress_folder(
            folder,
            output,
            options,
            control,
            &mut progress,
        )?),
        Task::Decompress {
            archive,
            output_dir,
            options,
        } => Report::Decompressed(decompress_all(
            archive,
            output_dir,
            options,
            control,
            &mut progress,
        )?),
        Task::Extract {
            archive,
            name,
            output,
            options,
        } => Report::Extracted {
            found: extract_one(archive, name, output, options, control, &mut progress)?,
            output: output.clone(),
        },
        Task::List { archive, options } => Report::Listing(list_entries(archive, options)?),
        Task::Encrypt {
            input,
            output,
            options,
        } => {
            encrypt_archive(input, output, options)?;
            Report::Written(output.clone())
        }
        Task::Decrypt {
            input,
            output,
            options,
        } => {
            decrypt_archive(input, output, options)?;
            Report::Written(output.clone())
        }
        Task::Compare { files } => {
            Report::Comparison(compare_algorithms(files, control, &mut progress)?)
        }
    };
    Ok(report)
}

/// Map stdin lines to control requests until stdin closes.
fn spawn_control_reader(control: Arc<OperationControl>) {
    info!("interactive: type p (pause), r (resume) or c (cancel) and press enter");
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else {
                break;
            };
            match line.trim() {
                "p" | "pause" => {
                    control.pause();
                    info!("pausing before the next item");
                }
                "r" | "resume" => {
                    control.resume();
                    info!("resumed");
                }
                "c" | "cancel" => {
                    control.cancel();
                    info!("canceling");
                    break;
                }
                "" => {}
                other => warn!("unknown command {other:?}"),
            }
        }
    });
}

fn print_report(report: &Report) {
    match report {
        Report::Compressed(info) => {
            println!("{info}");
            println!("Saved:           {} bytes", info.space_saved());
        }
        Report::Decompressed(info) => {
            println!("Archive size:      {}", format_size(info.compressed_size));
            println!("Decompressed size: {}", format_size(info.original_size));
            println!("Time:              {}", format_duration(info.elapsed));
        }
        Report::Extracted { found: true, output } => {
            println!("Extracted to {}", output.display());
        }
        Report::Extracted { found: false, .. } => {
            println!("No matching entry in the archive");
        }
        Report::Listing(names) => {
            for name in names {
                println!("{name}");
            }
            println!("{} entries", names.len());
        }
        Report::Written(path) => println!("Wrote {}", path.display()),
        Report::Comparison(comparisons) => {
            for comparison in comparisons {
                println!("{comparison}");
                if let Some(best) = comparison.best() {
                    println!("  best: {best}");
                }
            }
        }
    }
}
