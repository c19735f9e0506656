//! Domain entities: core data structures

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Reference to an existing job: either its number or its name, never both.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum JobHandle {
    Number(u64),
    Name(String),
}

impl JobHandle {
    /// Build a handle from the optional name/number pair supplied by the user.
    ///
    /// Exactly one of the two must be set. An empty name counts as unset.
    pub fn from_parts(name: Option<String>, number: Option<u64>) -> Result<Self, DomainError> {
        let name = name.filter(|n| !n.trim().is_empty());
        match (name, number) {
            (Some(_), Some(_)) => Err(DomainError::InvalidJobHandle(
                "specify either job name or number, not both".into(),
            )),
            (None, None) => Err(DomainError::InvalidJobHandle(
                "job name or number must be specified".into(),
            )),
            (Some(name), None) => Ok(Self::Name(name)),
            (None, Some(number)) => Ok(Self::Number(number)),
        }
    }

    /// Query parameter pair identifying the job (`number=..` or `name=..`).
    pub fn query_param(&self) -> (&'static str, String) {
        match self {
            JobHandle::Number(n) => ("number", n.to_string()),
            JobHandle::Name(name) => ("name", name.clone()),
        }
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobHandle::Number(n) => write!(f, "{}", n),
            JobHandle::Name(name) => write!(f, "{}", name),
        }
    }
}

/// Job status as reported by the job API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Submitted,
    Starting,
    Processing,
    Completed,
    CompletedWithError,
    Terminated,
    Canceled,
    /// Status string not known to this client, kept verbatim.
    Other(String),
}

impl JobStatus {
    /// Parse an API status string (case-insensitive, surrounding whitespace ignored).
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "submitted" => JobStatus::Submitted,
            "processing starting" => JobStatus::Starting,
            "processing" => JobStatus::Processing,
            "completed" => JobStatus::Completed,
            "completed with error" => JobStatus::CompletedWithError,
            "terminated" => JobStatus::Terminated,
            "canceled" => JobStatus::Canceled,
            _ => JobStatus::Other(raw.trim().to_string()),
        }
    }

    /// True once the job can no longer change state.
    ///
    /// Unknown statuses are treated as still active.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed
                | JobStatus::CompletedWithError
                | JobStatus::Terminated
                | JobStatus::Canceled
        )
    }

    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::Submitted => "SUBMITTED",
            JobStatus::Starting => "PROCESSING STARTING",
            JobStatus::Processing => "PROCESSING",
            JobStatus::Completed => "COMPLETED",
            JobStatus::CompletedWithError => "COMPLETED WITH ERROR",
            JobStatus::Terminated => "TERMINATED",
            JobStatus::Canceled => "CANCELED",
            JobStatus::Other(s) => s,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Credentials for the job API and the vault.
///
/// Resolved once per invocation and passed explicitly.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub apikey: String,
    pub apiurl: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("apikey", &"********")
            .field("apiurl", &self.apiurl)
            .finish()
    }
}

/// Where the vault lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VaultAddress {
    /// SFTP endpoint, e.g. `drop.jarvice.com` or `vault.example.com:2222`.
    Sftp { host: String, port: u16 },
    /// Locally mounted vault directory (`file:///mnt/vault`).
    Local(PathBuf),
}

impl VaultAddress {
    pub const DEFAULT_SFTP_PORT: u16 = 22;

    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(DomainError::InvalidVaultAddress("empty address".into()));
        }
        if let Some(dir) = raw.strip_prefix("file://") {
            if dir.is_empty() {
                return Err(DomainError::InvalidVaultAddress(raw.to_string()));
            }
            return Ok(VaultAddress::Local(PathBuf::from(dir)));
        }
        match raw.rsplit_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse::<u16>()
                    .map_err(|_| DomainError::InvalidVaultAddress(raw.to_string()))?;
                if host.is_empty() {
                    return Err(DomainError::InvalidVaultAddress(raw.to_string()));
                }
                Ok(VaultAddress::Sftp {
                    host: host.to_string(),
                    port,
                })
            }
            None => Ok(VaultAddress::Sftp {
                host: raw.to_string(),
                port: Self::DEFAULT_SFTP_PORT,
            }),
        }
    }
}

impl fmt::Display for VaultAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VaultAddress::Sftp { host, port } if *port == Self::DEFAULT_SFTP_PORT => {
                write!(f, "{}", host)
            }
            VaultAddress::Sftp { host, port } => write!(f, "{}:{}", host, port),
            VaultAddress::Local(dir) => write!(f, "file://{}", dir.display()),
        }
    }
}

/// Kind of an entry in the vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteEntryKind {
    File,
    Directory,
    Symlink,
    Other,
}

/// A single vault directory entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: RemoteEntryKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl RemoteEntry {
    pub fn is_dir(&self) -> bool {
        self.kind == RemoteEntryKind::Directory
    }
}

/// Which way a transfer goes, with the paths the user gave.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferDirection {
    Upload {
        local: PathBuf,
        remote: Option<String>,
        overwrite: bool,
    },
    Download {
        remote: String,
        local: Option<PathBuf>,
    },
}

/// One requested transfer, built from command line input and consumed once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferSpec {
    pub vault: VaultAddress,
    pub direction: TransferDirection,
}

/// One file moved between the local filesystem and the vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferredFile {
    pub source: String,
    pub destination: String,
    pub bytes: u64,
}

/// Outcome of an upload or download.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransferReport {
    pub files: Vec<TransferredFile>,
    /// Entries left out: special local files on upload, symlinked
    /// directories on download.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<String>,
}

impl TransferReport {
    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.bytes).sum()
    }
}

/// Condensed view of one job, as shown by `summary`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobSummary {
    pub number: u64,
    pub name: String,
    pub status: String,
    pub application: String,
}
