//! Vault sessions: SFTP (ssh2) and locally mounted directories

use std::fs;
use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::path::{Component, Path, PathBuf};

use ssh2::{ErrorCode, FileStat, RenameFlags, Session, Sftp};
use tracing::debug;

use crate::domain::{Credentials, RemoteEntry, RemoteEntryKind, VaultAddress};
use crate::infrastructure::error::{InfraError, InfraResult};
use crate::infrastructure::traits::RemoteFs;

/// libssh2 SFTP status codes for missing paths.
const FX_NO_SUCH_FILE: i32 = 2;
const FX_NO_SUCH_PATH: i32 = 10;

/// Open a session on the vault at `address` with the user's credentials.
pub fn open_vault(address: &VaultAddress, creds: &Credentials) -> InfraResult<Box<dyn RemoteFs>> {
    match address {
        VaultAddress::Sftp { host, port } => {
            Ok(Box::new(SftpVault::connect(host, *port, creds)?))
        }
        VaultAddress::Local(dir) => Ok(Box::new(DirectoryVault::open(dir)?)),
    }
}

// ============================================================
// SFTP
// ============================================================

/// SFTP session on a remote vault.
///
/// The SSH session is disconnected when the value is dropped.
pub struct SftpVault {
    sftp: Sftp,
    session: Session,
}

impl SftpVault {
    pub fn connect(host: &str, port: u16, creds: &Credentials) -> InfraResult<Self> {
        let address = format!("{host}:{port}");
        debug!("connect: vault={}, user={}", address, creds.username);
        let vault_err = |message: String| InfraError::Vault {
            address: address.clone(),
            message,
        };

        let tcp = TcpStream::connect((host, port)).map_err(|e| vault_err(e.to_string()))?;
        let mut session = Session::new().map_err(|e| vault_err(e.to_string()))?;
        session.set_tcp_stream(tcp);
        session.handshake().map_err(|e| vault_err(e.to_string()))?;

        if session
            .userauth_password(&creds.username, &creds.apikey)
            .is_err()
            || !session.authenticated()
        {
            return Err(InfraError::VaultAuthentication {
                username: creds.username.clone(),
                address: address.clone(),
            });
        }

        let sftp = session.sftp().map_err(|e| vault_err(e.to_string()))?;
        Ok(Self { sftp, session })
    }

    fn kind_of(stat: &FileStat) -> RemoteEntryKind {
        let file_type = stat.file_type();
        if file_type.is_symlink() {
            RemoteEntryKind::Symlink
        } else if file_type.is_dir() {
            RemoteEntryKind::Directory
        } else if file_type.is_file() {
            RemoteEntryKind::File
        } else {
            RemoteEntryKind::Other
        }
    }
}

impl Drop for SftpVault {
    fn drop(&mut self) {
        if let Err(e) = self.session.disconnect(None, "jarvice session closed", None) {
            debug!("drop: vault disconnect failed: {}", e);
        }
    }
}

impl RemoteFs for SftpVault {
    fn kind(&self, path: &str) -> io::Result<Option<RemoteEntryKind>> {
        match self.sftp.stat(Path::new(path)) {
            Ok(stat) => Ok(Some(Self::kind_of(&stat))),
            Err(e) if matches!(e.code(), ErrorCode::SFTP(FX_NO_SUCH_FILE | FX_NO_SUCH_PATH)) => {
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn list_dir(&self, path: &str) -> io::Result<Vec<RemoteEntry>> {
        let mut entries: Vec<RemoteEntry> = self
            .sftp
            .readdir(Path::new(path))?
            .into_iter()
            .filter_map(|(entry_path, stat)| {
                let name = entry_path.file_name()?.to_string_lossy().into_owned();
                if name == "." || name == ".." {
                    return None;
                }
                Some(RemoteEntry {
                    name,
                    kind: Self::kind_of(&stat),
                    size: stat.size,
                })
            })
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn mkdir(&self, path: &str) -> io::Result<()> {
        self.sftp.mkdir(Path::new(path), 0o755)?;
        Ok(())
    }

    fn read_into(&self, path: &str, dest: &mut dyn Write) -> io::Result<u64> {
        let mut file = self.sftp.open(Path::new(path))?;
        io::copy(&mut file, dest)
    }

    fn write_from(&self, path: &str, src: &mut dyn Read) -> io::Result<u64> {
        let mut file = self.sftp.create(Path::new(path))?;
        let written = io::copy(src, &mut file)?;
        file.flush()?;
        Ok(written)
    }

    fn rename(&self, from: &str, to: &str) -> io::Result<()> {
        self.sftp.rename(
            Path::new(from),
            Path::new(to),
            Some(RenameFlags::OVERWRITE | RenameFlags::ATOMIC | RenameFlags::NATIVE),
        )?;
        Ok(())
    }

    fn remove_file(&self, path: &str) -> io::Result<()> {
        self.sftp.unlink(Path::new(path))?;
        Ok(())
    }
}

// ============================================================
// LOCAL DIRECTORY
// ============================================================

/// Vault backed by a local directory (e.g. a mounted share).
#[derive(Debug, Clone)]
pub struct DirectoryVault {
    root: PathBuf,
}

impl DirectoryVault {
    pub fn open(root: &Path) -> InfraResult<Self> {
        if !root.is_dir() {
            return Err(InfraError::Vault {
                address: format!("file://{}", root.display()),
                message: "not a directory".into(),
            });
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// Map a vault path below the root; `..` is rejected.
    fn resolve(&self, path: &str) -> io::Result<PathBuf> {
        let relative = Path::new(path.trim_start_matches('/'));
        let mut resolved = self.root.clone();
        for component in relative.components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                _ => {
                    return Err(io::Error::new(
                        io::ErrorKind::PermissionDenied,
                        format!("path escapes vault: {path}"),
                    ))
                }
            }
        }
        Ok(resolved)
    }

    fn kind_of(file_type: fs::FileType) -> RemoteEntryKind {
        if file_type.is_symlink() {
            RemoteEntryKind::Symlink
        } else if file_type.is_dir() {
            RemoteEntryKind::Directory
        } else if file_type.is_file() {
            RemoteEntryKind::File
        } else {
            RemoteEntryKind::Other
        }
    }
}

impl RemoteFs for DirectoryVault {
    fn kind(&self, path: &str) -> io::Result<Option<RemoteEntryKind>> {
        match fs::metadata(self.resolve(path)?) {
            Ok(meta) => Ok(Some(Self::kind_of(meta.file_type()))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn list_dir(&self, path: &str) -> io::Result<Vec<RemoteEntry>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(self.resolve(path)?)? {
            let entry = entry?;
            let meta = entry.path().symlink_metadata()?;
            let kind = Self::kind_of(meta.file_type());
            entries.push(RemoteEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                kind,
                size: (kind == RemoteEntryKind::File).then(|| meta.len()),
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn mkdir(&self, path: &str) -> io::Result<()> {
        fs::create_dir(self.resolve(path)?)
    }

    fn read_into(&self, path: &str, dest: &mut dyn Write) -> io::Result<u64> {
        let mut file = fs::File::open(self.resolve(path)?)?;
        io::copy(&mut file, dest)
    }

    fn write_from(&self, path: &str, src: &mut dyn Read) -> io::Result<u64> {
        let mut file = fs::File::create(self.resolve(path)?)?;
        let written = io::copy(src, &mut file)?;
        file.flush()?;
        Ok(written)
    }

    fn rename(&self, from: &str, to: &str) -> io::Result<()> {
        fs::rename(self.resolve(from)?, self.resolve(to)?)
    }

    fn remove_file(&self, path: &str) -> io::Result<()> {
        fs::remove_file(self.resolve(path)?)
    }
}
