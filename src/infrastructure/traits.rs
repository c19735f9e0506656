//! I/O boundary traits for testability
//!
//! These traits abstract the job API, the vault session and the wait
//! pacing, allowing services to be tested with mock implementations.

use std::io::{self, Read, Write};
use std::time::Duration;

use crate::domain::{ApiBody, ApiRequest, RemoteEntry, RemoteEntryKind};
use crate::infrastructure::error::ApiError;

/// Authenticated gateway to the job API: one HTTP request per call.
pub trait JobApi: Send + Sync {
    fn call(&self, request: &ApiRequest) -> Result<ApiBody, ApiError>;
}

/// Filesystem view of a vault session.
///
/// Paths are vault-relative, `/`-separated strings.
pub trait RemoteFs {
    /// Kind of the entry at `path` (symlinks resolved), `None` if it does not exist.
    fn kind(&self, path: &str) -> io::Result<Option<RemoteEntryKind>>;

    /// Entries of a directory, sorted by name, without `.` and `..`.
    fn list_dir(&self, path: &str) -> io::Result<Vec<RemoteEntry>>;

    /// Create a single directory (parent must exist).
    fn mkdir(&self, path: &str) -> io::Result<()>;

    /// Stream a remote file into `dest`, returning the byte count.
    fn read_into(&self, path: &str, dest: &mut dyn Write) -> io::Result<u64>;

    /// Create or truncate a remote file and fill it from `src`.
    fn write_from(&self, path: &str, src: &mut dyn Read) -> io::Result<u64>;

    /// Rename `from` to `to`. Whether an existing `to` is replaced depends
    /// on the server; SFTP v3 servers refuse.
    fn rename(&self, from: &str, to: &str) -> io::Result<()>;

    /// Remove a remote file.
    fn remove_file(&self, path: &str) -> io::Result<()>;
}

/// Suspends the caller between polls.
pub trait Pacer: Send + Sync {
    fn pause(&self, interval: Duration);
}

// ============================================================
// REAL IMPLEMENTATIONS
// ============================================================

/// Real pacer: sleeps the current thread.
#[derive(Debug, Default)]
pub struct ThreadPacer;

impl Pacer for ThreadPacer {
    fn pause(&self, interval: Duration) {
        std::thread::sleep(interval);
    }
}
