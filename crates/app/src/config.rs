//! Configuration for the huffarc application.
//!
//! Command-line arguments are parsed with clap into [`Cli`], then resolved
//! into a [`Config`]: default output paths are filled in and archive options
//! are inferred from file extensions.
//!
//! # Philosophy
//!
//! Every path the tool will write is known before any work starts, and the
//! resolved configuration can be printed so runs are reproducible.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use huffarc_core::archive::ENCRYPTED_SUFFIX;
use huffarc_core::{Algorithm, Options};
use log::LevelFilter;

/// Command Line Interpretation - uses external CLAP crate.
#[derive(Parser, Debug)]
#[clap(
    name = "huffarc",
    version,
    about = "Huffman and Shannon-Fano file archiver",
    long_about = "
    Compresses files or whole folders into a single archive using either
    Huffman or Shannon-Fano coding, optionally encrypted with a password.
    Archives can be listed, fully decompressed, or have one file extracted."
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Command,

    /// More log output (-v debug, -vv trace)
    #[clap(short = 'v', long, global = true, parse(from_occurrences))]
    pub verbose: u64,

    /// Only log errors
    #[clap(short = 'q', long, global = true)]
    pub quiet: bool,

    /// Read p(ause) / r(esume) / c(ancel) commands from stdin while running
    #[clap(short = 'i', long, global = true)]
    pub interactive: bool,

    /// Print the resolved configuration before running
    #[clap(long, global = true)]
    pub print_config: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Compress files (or one folder) into an archive
    Compress {
        /// Files to compress, or a single folder with --folder
        #[clap(required = true)]
        inputs: Vec<PathBuf>,

        /// Treat the single input as a folder and store relative paths
        #[clap(long)]
        folder: bool,

        /// huffman or shannon-fano
        #[clap(short = 'a', long, default_value = "huffman")]
        algorithm: Algorithm,

        /// Archive path (default: derived from the input name)
        #[clap(short = 'o', long)]
        output: Option<PathBuf>,

        /// Encrypt the archive with this password (may be empty)
        #[clap(short = 'p', long)]
        password: Option<String>,
    },

    /// Decompress every entry of an archive into a directory
    Decompress {
        archive: PathBuf,

        /// Output directory
        #[clap(short = 'o', long, default_value = ".")]
        output_dir: PathBuf,

        #[clap(short = 'p', long)]
        password: Option<String>,
    },

    /// Extract a single entry by file name
    Extract {
        archive: PathBuf,

        /// Entry name (matched case-insensitively on the base name)
        name: String,

        /// Output file (default: the entry's base name)
        #[clap(short = 'o', long)]
        output: Option<PathBuf>,

        #[clap(short = 'p', long)]
        password: Option<String>,
    },

    /// List entry names without decompressing
    List {
        archive: PathBuf,

        #[clap(short = 'p', long)]
        password: Option<String>,
    },

    /// Encrypt an existing plain archive
    Encrypt {
        archive: PathBuf,

        #[clap(short = 'p', long)]
        password: String,

        /// Output path (default: archive path + .secure)
        #[clap(short = 'o', long)]
        output: Option<PathBuf>,
    },

    /// Decrypt an encrypted archive into a plain one
    Decrypt {
        archive: PathBuf,

        #[clap(short = 'p', long)]
        password: String,

        /// Output path (default: archive path without .secure)
        #[clap(short = 'o', long)]
        output: Option<PathBuf>,
    },

    /// Compress files with both algorithms and compare the results
    Compare {
        #[clap(required = true)]
        files: Vec<PathBuf>,
    },
}

/// One fully resolved unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    CompressFiles {
        inputs: Vec<PathBuf>,
        output: PathBuf,
        options: Options,
    },
    CompressFolder {
        folder: PathBuf,
        output: PathBuf,
        options: Options,
    },
    Decompress {
        archive: PathBuf,
        output_dir: PathBuf,
        options: Options,
    },
    Extract {
        archive: PathBuf,
        name: String,
        output: PathBuf,
        options: Options,
    },
    List {
        archive: PathBuf,
        options: Options,
    },
    Encrypt {
        input: PathBuf,
        output: PathBuf,
        options: Options,
    },
    Decrypt {
        input: PathBuf,
        output: PathBuf,
        options: Options,
    },
    Compare {
        files: Vec<PathBuf>,
    },
}

/// Complete configuration for a run.
#[derive(Debug, Clone)]
pub struct Config {
    pub task: Task,

    // === Behavior ===
    /// Log verbosity
    pub log_level: LevelFilter,

    /// Whether to accept pause/resume/cancel commands on stdin
    pub interactive: bool,

    /// Whether to print the resolved configuration
    pub print_config: bool,
}

impl Config {
    /// Parse configuration from the process arguments.
    ///
    /// Exits with clap's usage message on malformed arguments or `--help`.
    pub fn from_args() -> Result<Self, String> {
        Self::from_cli(Cli::parse())
    }

    /// Resolve parsed arguments into a configuration.
    pub fn from_cli(cli: Cli) -> Result<Self, String> {
        let log_level = if cli.quiet {
            LevelFilter::Error
        } else {
            match cli.verbose {
                0 => LevelFilter::Info,
                1 => LevelFilter::Debug,
                _ => LevelFilter::Trace,
            }
        };

        let task = match cli.command {
            Command::Compress {
                inputs,
                folder,
                algorithm,
                output,
                password,
            } => {
                let encrypted = password.is_some();
                let options = Options {
                    algorithm,
                    password,
                };
                if folder {
                    let [folder] = <[PathBuf; 1]>::try_from(inputs)
                        .map_err(|_| "--folder takes exactly one input".to_string())?;
                    let output = output.unwrap_or_else(|| {
                        default_archive_path(&folder, "archive", algorithm, encrypted)
                    });
                    Task::CompressFolder {
                        folder,
                        output,
                        options,
                    }
                } else {
                    let output = output.unwrap_or_else(|| match inputs.as_slice() {
                        [single] => default_archive_path(single, "archive", algorithm, encrypted),
                        _ => PathBuf::from(algorithm.archive_file_name("archive", encrypted)),
                    });
                    Task::CompressFiles {
                        inputs,
                        output,
                        options,
                    }
                }
            }
            Command::Decompress {
                archive,
                output_dir,
                password,
            } => {
                let options = archive_options(&archive, password)?;
                Task::Decompress {
                    archive,
                    output_dir,
                    options,
                }
            }
            Command::Extract {
                archive,
                name,
                output,
                password,
            } => {
                let options = archive_options(&archive, password)?;
                let output = output.unwrap_or_else(|| PathBuf::from(base_name(&name)));
                Task::Extract {
                    archive,
                    name,
                    output,
                    options,
                }
            }
            Command::List { archive, password } => {
                let options = archive_options(&archive, password)?;
                Task::List { archive, options }
            }
            Command::Encrypt {
                archive,
                password,
                output,
            } => {
                let options = archive_options(&archive, None)?.with_password(password);
                let output = output.unwrap_or_else(|| {
                    let mut name = archive.clone().into_os_string();
                    name.push(ENCRYPTED_SUFFIX);
                    PathBuf::from(name)
                });
                Task::Encrypt {
                    input: archive,
                    output,
                    options,
                }
            }
            Command::Decrypt {
                archive,
                password,
                output,
            } => {
                let options = archive_options(&archive, Some(password))?;
                let output = match output {
                    Some(output) => output,
                    None => archive
                        .to_str()
                        .and_then(strip_encrypted_suffix)
                        .map(PathBuf::from)
                        .ok_or_else(|| {
                            format!(
                                "{}: cannot derive an output name, use --output",
                                archive.display()
                            )
                        })?,
                };
                Task::Decrypt {
                    input: archive,
                    output,
                    options,
                }
            }
            Command::Compare { files } => Task::Compare { files },
        };

        Ok(Config {
            task,
            log_level,
            interactive: cli.interactive,
            print_config: cli.print_config,
        })
    }

    /// Print the configuration in human-readable form.
    pub fn print(&self) {
        println!("=== Configuration ===");
        match &self.task {
            Task::CompressFiles {
                inputs,
                output,
                options,
            } => {
                println!("Task:      compress {} file(s)", inputs.len());
                for input in inputs {
                    println!("  {}", input.display());
                }
                println!("Output:    {}", output.display());
                print_options(options);
            }
            Task::CompressFolder {
                folder,
                output,
                options,
            } => {
                println!("Task:      compress folder {}", folder.display());
                println!("Output:    {}", output.display());
                print_options(options);
            }
            Task::Decompress {
                archive,
                output_dir,
                options,
            } => {
                println!("Task:      decompress {}", archive.display());
                println!("Output:    {}", output_dir.display());
                print_options(options);
            }
            Task::Extract {
                archive,
                name,
                output,
                options,
            } => {
                println!("Task:      extract {:?} from {}", name, archive.display());
                println!("Output:    {}", output.display());
                print_options(options);
            }
            Task::List { archive, options } => {
                println!("Task:      list {}", archive.display());
                print_options(options);
            }
            Task::Encrypt {
                input,
                output,
                options,
            } => {
                println!("Task:      encrypt {}", input.display());
                println!("Output:    {}", output.display());
                print_options(options);
            }
            Task::Decrypt {
                input,
                output,
                options,
            } => {
                println!("Task:      decrypt {}", input.display());
                println!("Output:    {}", output.display());
                print_options(options);
            }
            Task::Compare { files } => {
                println!("Task:      compare algorithms on {} file(s)", files.len());
            }
        }
        println!("Log level:   {}", self.log_level);
        println!("Interactive: {}", self.interactive);
        println!();
    }
}

fn print_options(options: &Options) {
    println!("Algorithm: {}", options.algorithm);
    println!(
        "Encrypted: {}",
        if options.is_encrypted() { "yes" } else { "no" }
    );
}

fn archive_options(archive: &Path, password: Option<String>) -> Result<Options, String> {
    Options::for_archive(archive, password).map_err(|err| err.to_string())
}

/// `<stem>.<ext>[.secure]` next to the current directory.
fn default_archive_path(
    input: &Path,
    fallback: &str,
    algorithm: Algorithm,
    encrypted: bool,
) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(fallback);
    PathBuf::from(algorithm.archive_file_name(stem, encrypted))
}

/// `a.huff.secure` -> `a.huff`, matching the suffix in any case.
fn strip_encrypted_suffix(path: &str) -> Option<&str> {
    let split = path.len().checked_sub(ENCRYPTED_SUFFIX.len())?;
    let (stem, suffix) = (path.get(..split)?, path.get(split..)?);
    suffix
        .eq_ignore_ascii_case(ENCRYPTED_SUFFIX)
        .then_some(stem)
}

fn base_name(name: &str) -> &str {
    huffarc_core::archive::base_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(args: &[&str]) -> Result<Config, String> {
        let cli = Cli::try_parse_from(std::iter::once("huffarc").chain(args.iter().copied()))
            .map_err(|err| err.to_string())?;
        Config::from_cli(cli)
    }

    #[test]
    fn test_compress_defaults() {
        let config = resolve(&["compress", "notes.txt"]).unwrap();
        assert_eq!(config.log_level, LevelFilter::Info);
        assert_eq!(
            config.task,
            Task::CompressFiles {
                inputs: vec![PathBuf::from("notes.txt")],
                output: PathBuf::from("notes.huff"),
                options: Options::new(Algorithm::Huffman),
            }
        );
    }

    #[test]
    fn test_compress_many_encrypted() {
        let config =
            resolve(&["compress", "a", "b", "-a", "sf", "--password", "", "-vv"]).unwrap();
        assert_eq!(config.log_level, LevelFilter::Trace);
        match config.task {
            Task::CompressFiles {
                inputs,
                output,
                options,
            } => {
                assert_eq!(inputs.len(), 2);
                assert_eq!(output, PathBuf::from("archive.sfan.secure"));
                assert_eq!(
                    options,
                    Options::new(Algorithm::ShannonFano).with_password("")
                );
            }
            other => panic!("unexpected task {other:?}"),
        }
    }

    #[test]
    fn test_compress_folder() {
        let config = resolve(&["compress", "--folder", "photos", "-q"]).unwrap();
        assert_eq!(config.log_level, LevelFilter::Error);
        assert!(matches!(
            config.task,
            Task::CompressFolder { ref output, .. } if output == Path::new("photos.huff")
        ));
        assert!(resolve(&["compress", "--folder", "a", "b"]).is_err());
    }

    #[test]
    fn test_unknown_algorithm() {
        assert!(resolve(&["compress", "a", "-a", "lzw"]).is_err());
    }

    #[test]
    fn test_archive_options_from_extension() {
        let config = resolve(&["list", "x.SFAN"]).unwrap();
        assert_eq!(
            config.task,
            Task::List {
                archive: PathBuf::from("x.SFAN"),
                options: Options::new(Algorithm::ShannonFano),
            }
        );
        assert!(resolve(&["list", "x.zip"]).is_err());
        assert!(resolve(&["decompress", "x.huff.secure"]).is_err());
        assert!(resolve(&["decompress", "x.huff.secure", "-p", "pw"]).is_ok());
    }

    #[test]
    fn test_extract_default_output() {
        let config = resolve(&["extract", "a.huff", "docs/Read.me"]).unwrap();
        assert!(matches!(
            config.task,
            Task::Extract { ref output, .. } if output == Path::new("Read.me")
        ));
    }

    #[test]
    fn test_encrypt_decrypt_paths() {
        let config = resolve(&["encrypt", "a.huff", "-p", "pw"]).unwrap();
        assert!(matches!(
            config.task,
            Task::Encrypt { ref output, ref options, .. }
                if output == Path::new("a.huff.secure") && options.is_encrypted()
        ));

        let config = resolve(&["decrypt", "a.huff.secure", "-p", "pw"]).unwrap();
        assert!(matches!(
            config.task,
            Task::Decrypt { ref output, .. } if output == Path::new("a.huff")
        ));
    }

    #[test]
    fn test_decrypt_suffix_any_case() {
        let config = resolve(&["decrypt", "dir/a.sfan.SECURE", "-p", "pw"]).unwrap();
        assert!(matches!(
            config.task,
            Task::Decrypt { ref output, ref options, .. }
                if output == Path::new("dir/a.sfan") && options.algorithm == Algorithm::ShannonFano
        ));

        assert_eq!(strip_encrypted_suffix("a.huff.Secure"), Some("a.huff"));
        assert_eq!(strip_encrypted_suffix("a.huff"), None);
        assert_eq!(strip_encrypted_suffix("cure"), None);
    }
}
