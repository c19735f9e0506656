//! Vault transfer service
//!
//! Resolves local/remote path pairs for uploads and downloads, walks
//! directory trees in both directions and enforces the overwrite policy.
//!
//! Batch policy: transfers run one file at a time and abort on the first
//! failure; the error reports the failing file and how many completed.
//! Files are written under a `.jarvice-part` name and renamed into place
//! once complete.

use std::ffi::OsString;
use std::fs;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, instrument, warn};
use walkdir::WalkDir;

use crate::application::TransferError;
use crate::domain::{
    RemoteEntry, RemoteEntryKind, TransferDirection, TransferReport, TransferredFile,
};
use crate::infrastructure::traits::RemoteFs;

/// Suffix of in-flight files, local and remote.
pub const PART_SUFFIX: &str = ".jarvice-part";

pub type TransferResult<T> = Result<T, TransferError>;

/// Files and directories an upload will touch, computed before any write.
#[derive(Debug, Default)]
struct UploadPlan {
    dirs: Vec<String>,
    files: Vec<(PathBuf, String)>,
    skipped: Vec<String>,
}

/// Progress of a multi-file transfer.
#[derive(Debug, Default)]
struct Batch {
    report: TransferReport,
    current: String,
}

impl Batch {
    fn abort(self, source: TransferError) -> TransferError {
        TransferError::Aborted {
            failed: self.current,
            completed: self.report.files.len(),
            source: Box::new(source),
        }
    }
}

/// Transfers between the local filesystem and one open vault session.
pub struct TransferService {
    remote: Box<dyn RemoteFs>,
}

impl TransferService {
    pub fn new(remote: Box<dyn RemoteFs>) -> Self {
        Self { remote }
    }

    /// Run one upload or download.
    pub fn execute(&self, direction: &TransferDirection) -> TransferResult<TransferReport> {
        match direction {
            TransferDirection::Upload {
                local,
                remote,
                overwrite,
            } => self.upload(local, remote.as_deref(), *overwrite),
            TransferDirection::Download { remote, local } => {
                self.download(remote, local.as_deref())
            }
        }
    }

    /// Entries of a remote directory, sorted by name.
    ///
    /// A remote file lists as a single entry for itself.
    pub fn list(&self, remote: &str) -> TransferResult<Vec<RemoteEntry>> {
        let remote = normalize_remote(remote);
        match self.stat(&remote)? {
            None => Err(TransferError::RemoteNotFound(remote)),
            Some(RemoteEntryKind::Directory) => self
                .remote
                .list_dir(&remote)
                .map_err(|e| TransferError::io("list", remote.as_str(), e)),
            Some(kind) => Ok(vec![RemoteEntry {
                name: remote_basename(&remote).to_string(),
                kind,
                size: None,
            }]),
        }
    }

    // ============================================================
    // download
    // ============================================================

    /// Download a remote file or directory tree.
    ///
    /// * remote file → `local` as a file path, `local/<name>` if `local` is an
    ///   existing directory, `./<name>` if omitted
    /// * remote directory → recreated at `local` (or `./<name>`); symlinks
    ///   to files are copied, symlinks to directories are skipped
    #[instrument(skip(self))]
    pub fn download(&self, remote: &str, local: Option<&Path>) -> TransferResult<TransferReport> {
        let remote = normalize_remote(remote);
        let name = match remote_basename(&remote) {
            "" => ".",
            name => name,
        };

        match self.stat(&remote)? {
            None => Err(TransferError::RemoteNotFound(remote)),
            Some(RemoteEntryKind::Directory) => {
                let root = local
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| PathBuf::from(name));
                let mut batch = Batch::default();
                match self.get_dir(&remote, &root, &mut batch) {
                    Ok(()) => Ok(batch.report),
                    Err(e) => Err(batch.abort(e)),
                }
            }
            Some(RemoteEntryKind::File) => {
                let dest = match local {
                    None => PathBuf::from(name),
                    Some(p) if p.is_dir() => p.join(name),
                    Some(p) => p.to_path_buf(),
                };
                let bytes = self.get_file(&remote, &dest)?;
                Ok(TransferReport {
                    files: vec![TransferredFile {
                        source: remote,
                        destination: dest.display().to_string(),
                        bytes,
                    }],
                    skipped: Vec::new(),
                })
            }
            Some(_) => Err(TransferError::UnsupportedRemoteType(remote)),
        }
    }

    fn get_dir(&self, remote_dir: &str, local_dir: &Path, batch: &mut Batch) -> TransferResult<()> {
        debug!("get_dir: {} -> {}", remote_dir, local_dir.display());
        batch.current = remote_dir.to_string();
        fs::create_dir_all(local_dir)
            .map_err(|e| TransferError::io("create directory", local_dir.display().to_string(), e))?;

        let entries = self
            .remote
            .list_dir(remote_dir)
            .map_err(|e| TransferError::io("list", remote_dir, e))?;

        for entry in entries {
            let child_remote = remote_join(remote_dir, &entry.name);
            let child_local = local_dir.join(&entry.name);
            batch.current = child_remote.clone();

            let kind = match entry.kind {
                RemoteEntryKind::Symlink => match self.stat(&child_remote)? {
                    Some(RemoteEntryKind::Directory) => {
                        warn!("skipping {}: symlink to a directory", child_remote);
                        batch.report.skipped.push(child_remote);
                        continue;
                    }
                    kind => kind,
                },
                kind => Some(kind),
            };
            match kind {
                Some(RemoteEntryKind::Directory) => {
                    self.get_dir(&child_remote, &child_local, batch)?;
                }
                Some(RemoteEntryKind::File) => {
                    let bytes = self.get_file(&child_remote, &child_local)?;
                    batch.report.files.push(TransferredFile {
                        source: child_remote,
                        destination: child_local.display().to_string(),
                        bytes,
                    });
                }
                _ => return Err(TransferError::UnsupportedRemoteType(child_remote)),
            }
        }
        Ok(())
    }

    fn get_file(&self, remote: &str, dest: &Path) -> TransferResult<u64> {
        debug!("get_file: {} -> {}", remote, dest.display());
        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| TransferError::io("create directory", parent.display().to_string(), e))?;
        }

        let part = local_part_path(dest);
        let file = fs::File::create(&part)
            .map_err(|e| TransferError::io("create", part.display().to_string(), e))?;
        let mut writer = BufWriter::new(file);

        let copied = self
            .remote
            .read_into(remote, &mut writer)
            .and_then(|bytes| writer.flush().map(|()| bytes));
        let bytes = match copied {
            Ok(bytes) => bytes,
            Err(e) => {
                drop(writer);
                let _ = fs::remove_file(&part);
                return Err(TransferError::io("download", remote, e));
            }
        };
        drop(writer);

        fs::rename(&part, dest).map_err(|e| {
            let _ = fs::remove_file(&part);
            TransferError::io("rename", dest.display().to_string(), e)
        })?;
        Ok(bytes)
    }

    // ============================================================
    // upload
    // ============================================================

    /// Upload a local file or directory tree.
    ///
    /// * local directory → mirrored under `remote` (or the local name)
    /// * local file → `remote/<name>` if `remote` is a directory or ends
    ///   with `/`, `remote` itself otherwise, `<name>` if omitted
    ///
    /// Without `overwrite`, every destination is checked first and an
    /// existing file fails the upload before anything is written.
    #[instrument(skip(self))]
    pub fn upload(
        &self,
        local: &Path,
        remote: Option<&str>,
        overwrite: bool,
    ) -> TransferResult<TransferReport> {
        let meta = fs::metadata(local).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => TransferError::LocalNotFound(local.to_path_buf()),
            _ => TransferError::io("stat", local.display().to_string(), e),
        })?;

        let plan = if meta.is_dir() {
            let root = match remote {
                Some(r) => normalize_remote(r),
                None => local_name(local),
            };
            self.plan_dir_upload(local, &root)?
        } else if meta.is_file() {
            let dest = self.resolve_file_destination(local, remote)?;
            UploadPlan {
                dirs: remote_parent(&dest).map(str::to_string).into_iter().collect(),
                files: vec![(local.to_path_buf(), dest)],
                skipped: Vec::new(),
            }
        } else {
            return Err(TransferError::UnsupportedLocalType(local.to_path_buf()));
        };

        self.check_destinations(&plan, overwrite)?;

        let mut batch = Batch::default();
        batch.report.skipped = plan.skipped.clone();
        match self.run_plan(&plan, &mut batch) {
            Ok(()) => Ok(batch.report),
            Err(e) if meta.is_dir() => Err(batch.abort(e)),
            Err(e) => Err(e),
        }
    }

    fn plan_dir_upload(&self, local: &Path, root: &str) -> TransferResult<UploadPlan> {
        let mut plan = UploadPlan::default();
        for entry in WalkDir::new(local).follow_links(true).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let path = e
                    .path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| local.display().to_string());
                TransferError::io("walk", path, e.into())
            })?;
            let rel = entry.path().strip_prefix(local).unwrap_or(entry.path());
            let dest = if rel.as_os_str().is_empty() {
                root.to_string()
            } else {
                remote_join(root, &to_remote_relative(rel))
            };

            let file_type = entry.file_type();
            if file_type.is_dir() {
                plan.dirs.push(dest);
            } else if file_type.is_file() {
                plan.files.push((entry.path().to_path_buf(), dest));
            } else {
                warn!("skipping {}: not a regular file", entry.path().display());
                plan.skipped.push(entry.path().display().to_string());
            }
        }
        Ok(plan)
    }

    fn resolve_file_destination(&self, local: &Path, remote: Option<&str>) -> TransferResult<String> {
        let name = local_name(local);
        let dest = match remote {
            None => name,
            Some(r) if r.ends_with('/') => remote_join(r, &name),
            Some(r) => match self.stat(r)? {
                Some(RemoteEntryKind::Directory) => remote_join(r, &name),
                _ => r.to_string(),
            },
        };
        Ok(dest)
    }

    fn check_destinations(&self, plan: &UploadPlan, overwrite: bool) -> TransferResult<()> {
        for (_, dest) in &plan.files {
            match self.stat(dest)? {
                None => {}
                Some(RemoteEntryKind::File) if overwrite => {}
                Some(RemoteEntryKind::File) => {
                    return Err(TransferError::WouldOverwrite(dest.clone()));
                }
                Some(_) => return Err(TransferError::UnsupportedRemoteType(dest.clone())),
            }
        }
        Ok(())
    }

    fn run_plan(&self, plan: &UploadPlan, batch: &mut Batch) -> TransferResult<()> {
        for dir in &plan.dirs {
            batch.current = dir.clone();
            self.ensure_remote_dir(dir)?;
        }
        for (source, dest) in &plan.files {
            batch.current = source.display().to_string();
            let bytes = self.put_file(source, dest)?;
            batch.report.files.push(TransferredFile {
                source: source.display().to_string(),
                destination: dest.clone(),
                bytes,
            });
        }
        Ok(())
    }

    fn put_file(&self, local: &Path, dest: &str) -> TransferResult<u64> {
        debug!("put_file: {} -> {}", local.display(), dest);
        let file = fs::File::open(local)
            .map_err(|e| TransferError::io("open", local.display().to_string(), e))?;
        let mut reader = BufReader::new(file);

        let part = format!("{dest}{PART_SUFFIX}");
        let bytes = self.remote.write_from(&part, &mut reader).map_err(|e| {
            let _ = self.remote.remove_file(&part);
            TransferError::io("upload", dest, e)
        })?;
        self.replace(&part, dest).map_err(|e| {
            let _ = self.remote.remove_file(&part);
            TransferError::io("rename", dest, e)
        })?;
        Ok(bytes)
    }

    /// Move `part` onto `dest`. Servers that refuse to rename over an
    /// existing file get the old file unlinked first.
    fn replace(&self, part: &str, dest: &str) -> io::Result<()> {
        match self.remote.rename(part, dest) {
            Ok(()) => Ok(()),
            Err(e) => match self.remote.kind(dest)? {
                Some(RemoteEntryKind::File) => {
                    debug!("rename onto {} refused ({}), unlinking first", dest, e);
                    self.remote.remove_file(dest)?;
                    self.remote.rename(part, dest)
                }
                _ => Err(e),
            },
        }
    }

    /// Create `path` and its missing parents (mkdir -p).
    fn ensure_remote_dir(&self, path: &str) -> TransferResult<()> {
        let mut current = String::new();
        if path.starts_with('/') {
            current.push('/');
        }
        for part in path.split('/').filter(|p| !p.is_empty() && *p != ".") {
            if !current.is_empty() && !current.ends_with('/') {
                current.push('/');
            }
            current.push_str(part);
            match self.stat(&current)? {
                Some(RemoteEntryKind::Directory) => {}
                None => self
                    .remote
                    .mkdir(&current)
                    .map_err(|e| TransferError::io("mkdir", current.as_str(), e))?,
                Some(_) => return Err(TransferError::UnsupportedRemoteType(current)),
            }
        }
        Ok(())
    }

    fn stat(&self, remote: &str) -> TransferResult<Option<RemoteEntryKind>> {
        self.remote
            .kind(remote)
            .map_err(|e| TransferError::io("stat", remote, e))
    }
}

// ============================================================
// path helpers
// ============================================================

/// Strip trailing separators (root stays `/`); empty becomes `.`.
pub fn normalize_remote(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    match (trimmed.is_empty(), path.starts_with('/')) {
        (true, true) => "/".to_string(),
        (true, false) => ".".to_string(),
        _ => trimmed.to_string(),
    }
}

/// Join a vault path and an entry name with `/`.
pub fn remote_join(base: &str, name: &str) -> String {
    if base.is_empty() || base == "." {
        name.to_string()
    } else if base.ends_with('/') {
        format!("{base}{name}")
    } else {
        format!("{base}/{name}")
    }
}

/// Last component of a vault path.
pub fn remote_basename(path: &str) -> &str {
    path.trim_end_matches('/').rsplit('/').next().unwrap_or("")
}

/// Parent directory of a vault path, if it has one.
pub fn remote_parent(path: &str) -> Option<&str> {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(0) => Some("/"),
        Some(i) => Some(&trimmed[..i]),
        None => None,
    }
}

/// Relative local path as a `/`-separated vault path.
fn to_remote_relative(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn local_name(local: &Path) -> String {
    local
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| ".".to_string())
}

fn local_part_path(dest: &Path) -> PathBuf {
    let mut name = OsString::from(dest.as_os_str());
    name.push(PART_SUFFIX);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("data", "a.txt", "data/a.txt")]
    #[case("data/", "a.txt", "data/a.txt")]
    #[case("/", "a.txt", "/a.txt")]
    #[case(".", "a.txt", "a.txt")]
    #[case("", "a.txt", "a.txt")]
    fn test_remote_join(#[case] base: &str, #[case] name: &str, #[case] expected: &str) {
        assert_eq!(remote_join(base, name), expected);
    }

    #[rstest]
    #[case("data/results/out.log", "out.log")]
    #[case("data/results/", "results")]
    #[case("file.txt", "file.txt")]
    #[case("/", "")]
    fn test_remote_basename(#[case] path: &str, #[case] expected: &str) {
        assert_eq!(remote_basename(path), expected);
    }

    #[rstest]
    #[case("data/results/out.log", Some("data/results"))]
    #[case("/out.log", Some("/"))]
    #[case("out.log", None)]
    fn test_remote_parent(#[case] path: &str, #[case] expected: Option<&str>) {
        assert_eq!(remote_parent(path), expected);
    }

    #[rstest]
    #[case("data/", "data")]
    #[case("/", "/")]
    #[case("", ".")]
    #[case("a/b", "a/b")]
    fn test_normalize_remote(#[case] path: &str, #[case] expected: &str) {
        assert_eq!(normalize_remote(path), expected);
    }

    #[test]
    fn given_nested_relative_path_when_converting_then_slash_separated() {
        let rel = Path::new("sub").join("deeper").join("b.txt");
        assert_eq!(to_remote_relative(&rel), "sub/deeper/b.txt");
    }

    #[test]
    fn given_destination_when_part_path_then_suffix_appended() {
        assert_eq!(
            local_part_path(Path::new("out/a.txt")),
            PathBuf::from("out/a.txt.jarvice-part")
        );
    }
}
