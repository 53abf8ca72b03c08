//! Transports move a remote artifact to a local path.
use std::fs::{File, create_dir_all};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use log::debug;
use ureq::Error as UreqError;

use crate::errors::TransportError;

///
/// Fetches a remote artifact to `local_path`. With `is_archive` set, the
/// payload is gzip-compressed and is decompressed on the way to disk.
///
/// Implementations must either leave a complete file at `local_path` or
/// return an error.
///
pub trait Transport {
    fn fetch(&self, remote: &str, local_path: &Path, is_archive: bool) -> Result<(), TransportError>;
}

fn write_payload(reader: Box<dyn Read + '_>, local_path: &Path, is_archive: bool) -> io::Result<()> {
    if let Some(parent) = local_path.parent() {
        create_dir_all(parent)?;
    }

    let mut reader: Box<dyn Read + '_> = match is_archive {
        true => Box::new(GzDecoder::new(reader)),
        false => reader,
    };

    let mut writer = BufWriter::new(File::create(local_path)?);
    io::copy(&mut reader, &mut writer)?;
    writer.flush()
}

/// Plain HTTP(S) downloads.
#[derive(Debug, Default, Clone)]
pub struct HttpTransport;

impl Transport for HttpTransport {
    fn fetch(&self, remote: &str, local_path: &Path, is_archive: bool) -> Result<(), TransportError> {
        debug!("Fetching {} -> {}", remote, local_path.display());

        let response = match ureq::get(remote).call() {
            Ok(resp) => resp,
            Err(UreqError::StatusCode(404)) => return Err(TransportError::NotFound(remote.to_string())),
            Err(e) => return Err(TransportError::Request(remote.to_string(), e.to_string())),
        };

        let body = response.into_body();
        write_payload(Box::new(body.into_reader()), local_path, is_archive)?;

        Ok(())
    }
}

///
/// Copies artifacts out of a local mirror directory. The remote spec is taken
/// as a path relative to the mirror root (any `scheme://host/` prefix is
/// ignored), which makes offline mirrors and tests possible.
///
#[derive(Debug, Clone)]
pub struct DirectoryTransport {
    root: PathBuf,
}

impl DirectoryTransport {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        DirectoryTransport {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn source_path(&self, remote: &str) -> PathBuf {
        let relative = match remote.split_once("://") {
            Some((_, rest)) => rest.split_once('/').map(|(_, path)| path).unwrap_or(rest),
            None => remote,
        };
        self.root.join(relative.trim_start_matches('/'))
    }
}

impl Transport for DirectoryTransport {
    fn fetch(&self, remote: &str, local_path: &Path, is_archive: bool) -> Result<(), TransportError> {
        let source = self.source_path(remote);
        if !source.is_file() {
            return Err(TransportError::NotFound(source.display().to_string()));
        }
        write_payload(Box::new(File::open(&source)?), local_path, is_archive)?;
        Ok(())
    }
}
