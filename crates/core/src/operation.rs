//! Long-running operations over files and archives.
//!
//! Every operation processes its items (input files or archive entries) one at
//! a time. Before each item it calls [`OperationControl::checkpoint`], which is
//! where pause and cancel take effect; after each item it reports
//! `floor((i + 1) * 100 / N)` through the progress callback. An operation over
//! zero items reports 100 once.
//!
//! Any error, including cancellation, aborts the whole operation and removes
//! every file it created. Encrypted archives are decrypted into memory; the
//! plaintext never touches the disk.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Cursor, Read, Seek, Write};
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use walkdir::WalkDir;

use crate::archive::{self, names_match, Algorithm, ArchiveEntry, ArchiveReader, ArchiveWriter};
use crate::control::{OperationControl, OutputGuard};
use crate::crypto;
use crate::error::{ArchiveError, CryptoError, Error, Result};
use crate::metrics::{AlgorithmComparison, CompressionInfo, Stopwatch};

/// Per-operation settings chosen by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub algorithm: Algorithm,

    /// `None` for a plain archive. `Some` for an encrypted one; the empty
    /// string is a valid password and still encrypts.
    pub password: Option<String>,
}

impl Options {
    pub fn new(algorithm: Algorithm) -> Self {
        Self {
            algorithm,
            password: None,
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn is_encrypted(&self) -> bool {
        self.password.is_some()
    }

    /// Options for an existing archive, inferred from its extension.
    ///
    /// # Errors
    /// `Error::Config` if the extension is unknown, or names an encrypted
    /// archive and no password is given.
    pub fn for_archive(path: &Path, password: Option<String>) -> Result<Self> {
        let (algorithm, encrypted) = Algorithm::detect(path).ok_or_else(|| {
            Error::Config(format!(
                "{}: expected a .huff or .sfan archive (optionally .secure)",
                path.display()
            ))
        })?;
        if encrypted && password.is_none() {
            return Err(Error::Config(format!(
                "{} is encrypted; a password is required",
                path.display()
            )));
        }
        Ok(Self {
            algorithm,
            password,
        })
    }
}

/// Integer progress after `done` of `total` items.
fn percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        100
    } else {
        (done * 100 / total) as u8
    }
}

fn log_outcome<T>(operation: &str, result: Result<T>) -> Result<T> {
    match &result {
        Err(err) if err.is_canceled() => warn!("{operation} canceled"),
        Err(err) => warn!("{operation} failed: {err}"),
        Ok(_) => {}
    }
    result
}

/// With a password, a plaintext that does not parse as an archive means the
/// password was wrong (or the ciphertext damaged).
fn classify(err: Error, options: &Options) -> Error {
    if options.is_encrypted() && err.is_corrupt() {
        debug!("decrypted data is not an archive: {err}");
        CryptoError::NotAnArchive.into()
    } else {
        err
    }
}

fn file_name_of(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| Error::Config(format!("{}: not a UTF-8 file name", path.display())))
}

/// Compress `inputs` into one archive at `output`, storing bare file names.
///
/// Entries appear in the order of `inputs`.
pub fn compress_files(
    inputs: &[PathBuf],
    output: &Path,
    options: &Options,
    control: &OperationControl,
    progress: &mut dyn FnMut(u8),
) -> Result<CompressionInfo> {
    info!(
        "compressing {} file(s) into {} ({})",
        inputs.len(),
        output.display(),
        options.algorithm
    );
    let items = inputs
        .iter()
        .map(|path| Ok((file_name_of(path)?, path.clone())))
        .collect::<Result<Vec<_>>>()?;
    log_outcome(
        "compression",
        compress_items(&items, output, options, control, progress),
    )
}

/// Compress every file below `folder` into one archive at `output`.
///
/// Entry names are paths relative to `folder`, `/`-separated, in sorted
/// traversal order.
pub fn compress_folder(
    folder: &Path,
    output: &Path,
    options: &Options,
    control: &OperationControl,
    progress: &mut dyn FnMut(u8),
) -> Result<CompressionInfo> {
    info!(
        "compressing folder {} into {} ({})",
        folder.display(),
        output.display(),
        options.algorithm
    );
    let items = log_outcome("compression", collect_folder(folder))?;
    log_outcome(
        "compression",
        compress_items(&items, output, options, control, progress),
    )
}

fn collect_folder(folder: &Path) -> Result<Vec<(String, PathBuf)>> {
    if !folder.is_dir() {
        return Err(Error::Config(format!(
            "{} is not a directory",
            folder.display()
        )));
    }

    let mut items = Vec::new();
    for entry in WalkDir::new(folder).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(folder)
            .map_err(|_| Error::Config(format!("{} escapes the folder", entry.path().display())))?;
        let name = relative
            .components()
            .map(|part| {
                part.as_os_str().to_str().ok_or_else(|| {
                    Error::Config(format!("{}: not a UTF-8 path", entry.path().display()))
                })
            })
            .collect::<Result<Vec<_>>>()?
            .join("/");
        items.push((name, entry.into_path()));
    }
    Ok(items)
}

fn compress_items(
    items: &[(String, PathBuf)],
    output: &Path,
    options: &Options,
    control: &OperationControl,
    progress: &mut dyn FnMut(u8),
) -> Result<CompressionInfo> {
    let stopwatch = Stopwatch::start();
    let mut guard = OutputGuard::new();

    let (original_size, compressed_size) = match &options.password {
        Some(password) => {
            let (plain, original_size) =
                write_entries(Vec::new(), items, options.algorithm, control, progress)?;
            let sealed = crypto::encrypt(&plain, password);
            guard.track(output);
            fs::write(output, &sealed)?;
            (original_size, sealed.len() as u64)
        }
        None => {
            guard.track(output);
            let file = BufWriter::new(File::create(output)?);
            let (_, original_size) =
                write_entries(file, items, options.algorithm, control, progress)?;
            (original_size, fs::metadata(output)?.len())
        }
    };
    guard.commit();

    let info = CompressionInfo {
        original_size,
        compressed_size,
        elapsed: stopwatch.elapsed(),
    };
    info!(
        "compressed {} entries: {} -> {} bytes ({:.2}% saved)",
        items.len(),
        info.original_size,
        info.compressed_size,
        info.compression_ratio()
    );
    Ok(info)
}

/// Compress and append each item; returns the finished writer and the total
/// number of original bytes.
fn write_entries<W: Write>(
    inner: W,
    items: &[(String, PathBuf)],
    algorithm: Algorithm,
    control: &OperationControl,
    progress: &mut dyn FnMut(u8),
) -> Result<(W, u64)> {
    let total = items.len();
    let mut writer = ArchiveWriter::new(inner, algorithm, total)?;
    let mut original_size = 0u64;

    for (index, (name, path)) in items.iter().enumerate() {
        control.checkpoint()?;
        let data = fs::read(path)?;
        let entry = ArchiveEntry::compress(name.as_str(), &data, algorithm)?;
        writer.write_entry(&entry)?;
        original_size += data.len() as u64;
        debug!(
            "[{}/{}] {}: {} -> {} bytes",
            index + 1,
            total,
            name,
            data.len(),
            entry.payload.len()
        );
        progress(percent(index + 1, total));
    }
    if total == 0 {
        progress(100);
    }

    Ok((writer.finish()?, original_size))
}

trait ArchiveSource: Read + Seek {}

impl<T: Read + Seek> ArchiveSource for T {}

/// Open `path` for reading, decrypting into memory when a password is set.
fn open_source(path: &Path, options: &Options) -> Result<Box<dyn ArchiveSource>> {
    match &options.password {
        Some(password) => {
            let sealed = fs::read(path)?;
            let plain = crypto::decrypt(&sealed, password)?;
            Ok(Box::new(Cursor::new(plain)))
        }
        None => Ok(Box::new(BufReader::new(File::open(path)?))),
    }
}

fn open_archive(
    path: &Path,
    options: &Options,
) -> Result<ArchiveReader<Box<dyn ArchiveSource>>> {
    ArchiveReader::new(open_source(path, options)?, options.algorithm)
}

/// Entry base name, rejected if it cannot name a file inside a directory.
fn output_name(entry: &ArchiveEntry) -> Result<&str> {
    match entry.base_name() {
        "" | "." | ".." => Err(ArchiveError::InvalidName.into()),
        name => Ok(name),
    }
}

/// Decompress every entry into `output_dir`.
///
/// Entries are written under their base name only; directory components of
/// stored paths are dropped, and a later entry with the same base name
/// overwrites an earlier one.
pub fn decompress_all(
    archive_path: &Path,
    output_dir: &Path,
    options: &Options,
    control: &OperationControl,
    progress: &mut dyn FnMut(u8),
) -> Result<CompressionInfo> {
    info!(
        "decompressing {} into {}",
        archive_path.display(),
        output_dir.display()
    );
    let result = decompress_into(archive_path, output_dir, options, control, progress)
        .map_err(|err| classify(err, options));
    log_outcome("decompression", result)
}

fn decompress_into(
    archive_path: &Path,
    output_dir: &Path,
    options: &Options,
    control: &OperationControl,
    progress: &mut dyn FnMut(u8),
) -> Result<CompressionInfo> {
    let stopwatch = Stopwatch::start();
    let compressed_size = fs::metadata(archive_path)?.len();
    let mut reader = open_archive(archive_path, options)?;
    fs::create_dir_all(output_dir)?;

    let mut guard = OutputGuard::new();
    let total = reader.entry_count();
    let mut original_size = 0u64;

    for index in 0..total {
        control.checkpoint()?;
        let entry = reader
            .next_entry()?
            .ok_or(ArchiveError::EntryCountMismatch {
                expected: total,
                actual: index,
            })?;
        let data = entry.decompress()?;
        let target = output_dir.join(output_name(&entry)?);
        guard.track(&target);
        fs::write(&target, &data)?;
        original_size += data.len() as u64;

        debug!(
            "[{}/{}] {} -> {}",
            index + 1,
            total,
            entry.name,
            target.display()
        );
        progress(percent(index + 1, total));
    }
    if total == 0 {
        progress(100);
    }
    reader.finish()?;
    guard.commit();

    let info = CompressionInfo {
        original_size,
        compressed_size,
        elapsed: stopwatch.elapsed(),
    };
    info!("decompressed {} entries, {} bytes", total, original_size);
    Ok(info)
}

/// Decompress the first entry whose base name matches `entry_name`
/// (case-insensitive) into `output_path`.
///
/// Returns `Ok(false)` if no entry matches. Only the matching entry is
/// decoded; the others are skipped.
pub fn extract_one(
    archive_path: &Path,
    entry_name: &str,
    output_path: &Path,
    options: &Options,
    control: &OperationControl,
    progress: &mut dyn FnMut(u8),
) -> Result<bool> {
    info!(
        "extracting {:?} from {} to {}",
        entry_name,
        archive_path.display(),
        output_path.display()
    );
    let result = extract_into(
        archive_path,
        entry_name,
        output_path,
        options,
        control,
        progress,
    )
    .map_err(|err| classify(err, options));
    log_outcome("extraction", result)
}

fn extract_into(
    archive_path: &Path,
    entry_name: &str,
    output_path: &Path,
    options: &Options,
    control: &OperationControl,
    progress: &mut dyn FnMut(u8),
) -> Result<bool> {
    let mut reader = open_archive(archive_path, options)?;
    let total = reader.entry_count();

    for index in 0..total {
        control.checkpoint()?;
        let header = reader
            .next_header()?
            .ok_or(ArchiveError::EntryCountMismatch {
                expected: total,
                actual: index,
            })?;
        if !names_match(&header.name, entry_name) {
            progress(percent(index + 1, total));
            continue;
        }

        let entry = reader.read_body(header)?;
        let data = entry.decompress()?;

        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut guard = OutputGuard::new();
        guard.track(output_path);
        fs::write(output_path, &data)?;
        guard.commit();

        info!("extracted {} ({} bytes)", entry.name, data.len());
        progress(100);
        return Ok(true);
    }

    if total == 0 {
        progress(100);
    }
    info!("no entry named {:?}", entry_name);
    Ok(false)
}

/// Names of all entries in archive order, without decoding payloads.
pub fn list_entries(archive_path: &Path, options: &Options) -> Result<Vec<String>> {
    let result = open_source(archive_path, options)
        .and_then(|source| archive::list(source, options.algorithm))
        .map_err(|err| classify(err, options));
    log_outcome("listing", result)
}

/// Encrypt the plain archive at `input` into `output` with the password from
/// `options`.
///
/// The input must parse as an archive of `options.algorithm`.
pub fn encrypt_archive(input: &Path, output: &Path, options: &Options) -> Result<()> {
    let password = options
        .password
        .as_deref()
        .ok_or_else(|| Error::Config("encryption requires a password".to_string()))?;
    info!("encrypting {} into {}", input.display(), output.display());

    let result = (|| -> Result<()> {
        let plain = fs::read(input)?;
        archive::list(Cursor::new(plain.as_slice()), options.algorithm)?;
        let sealed = crypto::encrypt(&plain, password);

        let mut guard = OutputGuard::new();
        guard.track(output);
        fs::write(output, &sealed)?;
        guard.commit();
        Ok(())
    })();
    log_outcome("encryption", result)
}

/// Decrypt the encrypted archive at `input` into a plain archive at `output`.
///
/// The plaintext is checked to be an archive of `options.algorithm` before
/// anything is written.
pub fn decrypt_archive(input: &Path, output: &Path, options: &Options) -> Result<()> {
    let password = options
        .password
        .as_deref()
        .ok_or_else(|| Error::Config("decryption requires a password".to_string()))?;
    info!("decrypting {} into {}", input.display(), output.display());

    let result = (|| -> Result<()> {
        let sealed = fs::read(input)?;
        let plain = crypto::decrypt(&sealed, password)?;
        archive::list(Cursor::new(plain.as_slice()), options.algorithm)
            .map_err(|err| classify(err, options))?;

        let mut guard = OutputGuard::new();
        guard.track(output);
        fs::write(output, &plain)?;
        guard.commit();
        Ok(())
    })();
    log_outcome("decryption", result)
}

/// Compress each file with every algorithm, in memory, and report the results.
pub fn compare_algorithms(
    files: &[PathBuf],
    control: &OperationControl,
    progress: &mut dyn FnMut(u8),
) -> Result<Vec<AlgorithmComparison>> {
    info!("comparing algorithms on {} file(s)", files.len());
    let result = (|| -> Result<Vec<AlgorithmComparison>> {
        let total = files.len();
        let mut comparisons = Vec::with_capacity(total);

        for (index, path) in files.iter().enumerate() {
            control.checkpoint()?;
            let file_name = file_name_of(path)?;
            let data = fs::read(path)?;

            let mut results = Vec::with_capacity(Algorithm::ALL.len());
            for algorithm in Algorithm::ALL {
                let stopwatch = Stopwatch::start();
                let entry = ArchiveEntry::compress(file_name.as_str(), &data, algorithm)?;
                let bytes = archive::write(Vec::new(), algorithm, std::slice::from_ref(&entry))?;
                results.push((
                    algorithm,
                    CompressionInfo {
                        original_size: data.len() as u64,
                        compressed_size: bytes.len() as u64,
                        elapsed: stopwatch.elapsed(),
                    },
                ));
            }

            let comparison = AlgorithmComparison { file_name, results };
            debug!("{comparison}");
            comparisons.push(comparison);
            progress(percent(index + 1, total));
        }
        if total == 0 {
            progress(100);
        }
        Ok(comparisons)
    })();
    log_outcome("comparison", result)
}
