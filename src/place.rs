//! File placement: precondition checks, then copy or move

use crate::config::FileOperation;
use crate::error::{Error, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use sysinfo::Disks;
use tracing::{debug, info};

/// Marker file used to check write permission
const WRITE_MARKER_NAME: &str = ".photo_grouper_write_test";

/// Performs copies and moves after checking space and permissions
pub struct FileExecutor {
    disks: Disks,
    dry_run: bool,
}

impl FileExecutor {
    pub fn new(dry_run: bool) -> Self {
        Self {
            disks: Disks::new_with_refreshed_list(),
            dry_run,
        }
    }

    /// Copy or move `src` to `dst`
    ///
    /// Fails with [`Error::InsufficientSpace`] or [`Error::NotWritable`]
    /// before anything is touched.
    pub fn place(&mut self, src: &Path, dst: &Path, operation: FileOperation) -> Result<()> {
        if self.dry_run {
            info!(source = ?src, destination = ?dst, "Would {} file", operation.verb());
            return Ok(());
        }

        let metadata = fs::metadata(src)?;
        let size = metadata.len();
        let target_dir = dst.parent().unwrap_or(Path::new("."));
        let existing = nearest_existing_ancestor(target_dir);

        self.check_disk_space(dst, &existing, size)?;
        check_writable(&existing)?;

        fs::create_dir_all(target_dir)?;

        match operation {
            FileOperation::Copy => copy_file(src, dst)?,
            FileOperation::Move => move_file(src, dst)?,
        }

        if let Ok(mtime) = metadata.modified() {
            let _ = filetime::set_file_mtime(dst, filetime::FileTime::from_system_time(mtime));
        }

        info!(source = ?src, destination = ?dst, "{} file", past_tense(operation));
        Ok(())
    }

    /// Available bytes on the volume holding `dir` must exceed `required`
    fn check_disk_space(&mut self, dst: &Path, dir: &Path, required: u64) -> Result<()> {
        self.disks.refresh(true);
        let dir = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());

        let disk = self
            .disks
            .list()
            .iter()
            .filter(|disk| dir.starts_with(disk.mount_point()))
            .max_by_key(|disk| disk.mount_point().as_os_str().len());

        let Some(disk) = disk else {
            debug!(?dir, "No mounted disk found for destination, skipping space check");
            return Ok(());
        };

        ensure_space(dst, disk.available_space(), required)
    }
}

/// Placing `required` bytes needs strictly more than that available
fn ensure_space(dst: &Path, available: u64, required: u64) -> Result<()> {
    if available <= required {
        return Err(Error::InsufficientSpace {
            path: dst.to_path_buf(),
            required,
            available,
        });
    }
    Ok(())
}

/// Closest ancestor of `path` (itself included) that exists
fn nearest_existing_ancestor(path: &Path) -> PathBuf {
    path.ancestors()
        .find(|p| p.exists())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Check write permission by creating and removing a marker file
///
/// An existing file with the marker's name is left alone.
pub fn check_writable(dir: &Path) -> Result<()> {
    let marker = dir.join(WRITE_MARKER_NAME);
    let result = match OpenOptions::new().write(true).create_new(true).open(&marker) {
        Ok(_) => fs::remove_file(&marker),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(()),
        Err(e) => Err(e),
    };

    result.map_err(|e| Error::NotWritable {
        path: dir.to_path_buf(),
        message: e.to_string(),
    })
}

/// Rename, or copy then delete when `src` and `dst` are on different file systems
fn move_file(src: &Path, dst: &Path) -> Result<()> {
    match fs::rename(src, dst) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            debug!(source = ?src, destination = ?dst, "Cross-device move, copying instead");
            copy_file(src, dst)?;
            if let Err(e) = fs::remove_file(src) {
                // Never leave the file in both places
                let _ = fs::remove_file(dst);
                return Err(e.into());
            }
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Copy file with buffered I/O for efficiency
///
/// Data goes to a hidden temporary file next to `dest` that is renamed into
/// place only once complete; on failure it is removed and `dest` never appears.
fn copy_file(source: &Path, dest: &Path) -> Result<()> {
    let src_file = File::open(source)?;
    let dir = dest.parent().unwrap_or(Path::new("."));
    let temp = tempfile::Builder::new()
        .prefix(".photo_grouper_")
        .suffix(".part")
        .tempfile_in(dir)?;

    let mut reader = BufReader::with_capacity(256 * 1024, src_file);
    let mut writer = BufWriter::with_capacity(256 * 1024, temp);

    let mut buffer = vec![0u8; 256 * 1024];
    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        writer.write_all(&buffer[..bytes_read])?;
    }

    let temp = writer.into_inner().map_err(|e| e.into_error())?;
    temp.persist_noclobber(dest).map_err(|e| e.error)?;
    Ok(())
}

fn past_tense(operation: FileOperation) -> &'static str {
    match operation {
        FileOperation::Copy => "Copied",
        FileOperation::Move => "Moved",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetime::FileTime;
    use tempfile::tempdir;

    #[test]
    fn test_copy_creates_parent_and_keeps_source() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("a.jpg");
        fs::write(&src, b"pixels").unwrap();
        let dst = dir.path().join("out").join("nested").join("a.jpg");

        let mut executor = FileExecutor::new(false);
        executor.place(&src, &dst, FileOperation::Copy).unwrap();

        assert!(src.exists());
        assert_eq!(fs::read(&dst).unwrap(), b"pixels");
    }

    #[test]
    fn test_move_removes_source() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("clip.mp4");
        fs::write(&src, b"frames").unwrap();
        let dst = dir.path().join("20240315_Trip").join("clip.mp4");

        let mut executor = FileExecutor::new(false);
        executor.place(&src, &dst, FileOperation::Move).unwrap();

        assert!(!src.exists());
        assert_eq!(fs::read(&dst).unwrap(), b"frames");
    }

    #[test]
    fn test_copy_preserves_mtime() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("old.jpg");
        fs::write(&src, b"x").unwrap();
        let old = FileTime::from_unix_time(1_600_000_000, 0);
        filetime::set_file_mtime(&src, old).unwrap();

        let dst = dir.path().join("copy.jpg");
        FileExecutor::new(false)
            .place(&src, &dst, FileOperation::Copy)
            .unwrap();

        let copied = FileTime::from_last_modification_time(&fs::metadata(&dst).unwrap());
        assert_eq!(copied.unix_seconds(), old.unix_seconds());
    }

    #[test]
    fn test_dry_run_touches_nothing() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("a.jpg");
        fs::write(&src, b"x").unwrap();
        let dst = dir.path().join("out").join("a.jpg");

        FileExecutor::new(true)
            .place(&src, &dst, FileOperation::Move)
            .unwrap();
        assert!(src.exists());
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn test_missing_source_is_an_error() {
        let dir = tempdir().unwrap();
        let result = FileExecutor::new(false).place(
            &dir.path().join("missing.jpg"),
            &dir.path().join("out.jpg"),
            FileOperation::Copy,
        );
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_nearest_existing_ancestor() {
        let dir = tempdir().unwrap();
        let deep = dir.path().join("a").join("b").join("c");
        assert_eq!(nearest_existing_ancestor(&deep), dir.path());
    }

    #[test]
    fn test_check_writable() {
        let dir = tempdir().unwrap();
        check_writable(dir.path()).unwrap();
        assert!(!dir.path().join(WRITE_MARKER_NAME).exists());

        let missing = dir.path().join("missing");
        assert!(matches!(
            check_writable(&missing),
            Err(Error::NotWritable { .. })
        ));
    }

    #[test]
    fn test_space_must_exceed_file_size() {
        let dst = Path::new("/out/a.jpg");
        ensure_space(dst, 1001, 1000).unwrap();

        let err = ensure_space(dst, 1000, 1000).unwrap_err();
        assert!(err.is_policy_violation());
        assert!(matches!(
            err,
            Error::InsufficientSpace {
                required: 1000,
                available: 1000,
                ..
            }
        ));
        assert!(ensure_space(dst, 0, 0).is_err());
    }

    #[test]
    fn test_file_in_place_of_folder_is_not_writable() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("a.jpg");
        fs::write(&src, b"x").unwrap();
        let blocker = dir.path().join("Landscape");
        fs::write(&blocker, b"not a folder").unwrap();

        let result = FileExecutor::new(false).place(&src, &blocker.join("a.jpg"), FileOperation::Copy);

        let err = result.unwrap_err();
        assert!(matches!(err, Error::NotWritable { .. }));
        assert!(err.is_policy_violation());
        assert_eq!(fs::read(&blocker).unwrap(), b"not a folder");
        assert!(src.exists());
    }

    #[test]
    fn test_write_check_keeps_existing_marker_file() {
        let dir = tempdir().unwrap();
        let marker = dir.path().join(WRITE_MARKER_NAME);
        fs::write(&marker, b"user data").unwrap();

        check_writable(dir.path()).unwrap();
        assert_eq!(fs::read(&marker).unwrap(), b"user data");
    }

    #[test]
    fn test_copy_leaves_no_temporary_files() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("a.jpg");
        fs::write(&src, b"pixels").unwrap();
        let out = dir.path().join("out");
        fs::create_dir(&out).unwrap();

        copy_file(&src, &out.join("a.jpg")).unwrap();

        let names: Vec<_> = fs::read_dir(&out)
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, ["a.jpg"]);
    }

    #[test]
    fn test_copy_never_overwrites() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("a.jpg");
        fs::write(&src, b"new").unwrap();
        let dst = dir.path().join("b.jpg");
        fs::write(&dst, b"old").unwrap();

        assert!(copy_file(&src, &dst).is_err());
        assert_eq!(fs::read(&dst).unwrap(), b"old");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_copy_leaves_nothing_behind() {
        let dir = tempdir().unwrap();
        // Opening a directory works on unix but reading it fails
        let unreadable = dir.path().join("folder.jpg");
        fs::create_dir(&unreadable).unwrap();
        let out = dir.path().join("out");
        fs::create_dir(&out).unwrap();

        assert!(copy_file(&unreadable, &out.join("folder.jpg")).is_err());
        assert_eq!(fs::read_dir(&out).unwrap().count(), 0);
    }

    #[test]
    fn test_failed_rename_does_not_copy() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("a.jpg");
        fs::write(&src, b"x").unwrap();
        // Renaming a file onto a non-empty folder fails without crossing devices
        let dst = dir.path().join("taken");
        fs::create_dir(&dst).unwrap();
        fs::write(dst.join("inner.jpg"), b"y").unwrap();

        assert!(move_file(&src, &dst).is_err());
        assert!(src.exists());
        assert!(dst.is_dir());
        assert_eq!(fs::read_dir(&dst).unwrap().count(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_read_only_destination_is_policy_violation() {
        use std::os::unix::fs::PermissionsExt;

        // Root ignores permission bits
        if running_as_root() {
            return;
        }

        let dir = tempdir().unwrap();
        let src = dir.path().join("a.jpg");
        fs::write(&src, b"x").unwrap();
        let locked = dir.path().join("locked");
        fs::create_dir(&locked).unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o555)).unwrap();

        let result = FileExecutor::new(false).place(&src, &locked.join("a.jpg"), FileOperation::Copy);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        let err = result.unwrap_err();
        assert!(err.is_policy_violation());
        assert!(!locked.join("a.jpg").exists());
    }

    #[cfg(unix)]
    fn running_as_root() -> bool {
        use std::os::unix::fs::MetadataExt;
        // A file we create is owned by our effective uid
        let dir = tempdir().unwrap();
        let marker = dir.path().join("uid");
        fs::write(&marker, b"").unwrap();
        fs::metadata(&marker).unwrap().uid() == 0
    }
}
