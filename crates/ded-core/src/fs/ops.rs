//! Filesystem capability consumed by the core.
//!
//! The session never touches the filesystem directly; everything goes
//! through the [`FileSystem`] trait so the state machine stays testable
//! and host-agnostic. [`LocalFs`] is the default implementation over
//! `tokio::fs`.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::time::SystemTime;

use async_trait::async_trait;

use crate::error::{CoreError, CoreResult};

/// Stat result for a single directory entry.
///
/// For symlinks the kind flags describe the resolved target (when it can be
/// resolved); `is_symlink` stays `true` either way and `symlink_target`
/// carries the raw link text.
#[derive(Debug, Clone)]
pub struct EntryMeta {
    pub is_dir: bool,
    pub is_file: bool,
    pub is_symlink: bool,
    pub read_only: bool,
    /// Bytes for files, child count for directories, `-1` unknown.
    pub size: i64,
    pub modified: SystemTime,
    /// Raw link target, empty for non-links.
    pub symlink_target: String,
}

/// The filesystem operations the core requires from its host environment.
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Stats one entry without following symlinks for identity, but
    /// resolving them for the kind flags.
    async fn stat_entry(&self, path: &Path) -> CoreResult<EntryMeta>;

    /// Returns the names of the immediate children of `path`, unsorted.
    async fn list_directory(&self, path: &Path) -> CoreResult<Vec<String>>;

    /// Creates a directory, with parents when `recursive` is set.
    async fn create_directory(&self, path: &Path, recursive: bool) -> CoreResult<()>;

    /// Creates an empty file. Fails if the path already exists.
    async fn create_file(&self, path: &Path) -> CoreResult<()>;

    /// Renames `src` to `dst`. A rename across filesystem boundaries fails
    /// with [`CoreError::CrossDevice`] and is never retried as copy+delete.
    async fn rename(&self, src: &Path, dst: &Path) -> CoreResult<()>;

    /// Copies a file, or a directory tree when `src` is a directory.
    /// Symlinks are copied as symlinks, never followed.
    async fn copy(&self, src: &Path, dst: &Path) -> CoreResult<()>;

    /// Removes a file, or a directory when `recursive` is set.
    async fn remove(&self, path: &Path, recursive: bool) -> CoreResult<()>;
}

/// [`FileSystem`] implementation over the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

fn io_error(path: &Path, err: std::io::Error) -> CoreError {
    match err.kind() {
        std::io::ErrorKind::NotFound => CoreError::NotFound(path.to_path_buf()),
        std::io::ErrorKind::PermissionDenied => CoreError::PermissionDenied(path.to_path_buf()),
        _ => CoreError::Io(err),
    }
}

/// Maximum recursion depth for directory copies, guarding against
/// symlink loops.
const MAX_COPY_DEPTH: usize = 64;

fn copy_dir_recursive<'a>(
    src: &'a Path,
    dest: &'a Path,
    depth: usize,
) -> Pin<Box<dyn Future<Output = CoreResult<()>> + Send + 'a>> {
    Box::pin(async move {
        if depth > MAX_COPY_DEPTH {
            return Err(CoreError::Io(std::io::Error::other(format!(
                "maximum recursion depth ({MAX_COPY_DEPTH}) exceeded during copy"
            ))));
        }

        tokio::fs::create_dir_all(dest).await?;

        let mut read_dir = tokio::fs::read_dir(src).await.map_err(|e| io_error(src, e))?;
        while let Some(child) = read_dir.next_entry().await? {
            let child_path = child.path();
            let target = dest.join(child.file_name());

            // file_type() does not follow symlinks
            let ft = child.file_type().await?;

            if ft.is_symlink() {
                copy_symlink(&child_path, &target).await?;
            } else if ft.is_dir() {
                copy_dir_recursive(&child_path, &target, depth + 1).await?;
            } else {
                tokio::fs::copy(&child_path, &target).await?;
            }
        }

        Ok(())
    })
}

async fn copy_symlink(src: &Path, dest: &Path) -> CoreResult<()> {
    let link_target = tokio::fs::read_link(src).await?;
    #[cfg(unix)]
    tokio::fs::symlink(&link_target, dest).await?;
    #[cfg(not(unix))]
    {
        let _ = link_target;
        tokio::fs::copy(src, dest).await?;
    }
    Ok(())
}

#[async_trait]
impl FileSystem for LocalFs {
    async fn stat_entry(&self, path: &Path) -> CoreResult<EntryMeta> {
        let link_meta = tokio::fs::symlink_metadata(path)
            .await
            .map_err(|e| io_error(path, e))?;
        let is_symlink = link_meta.file_type().is_symlink();

        // follow the link for the kind flags; if the target is unreachable,
        // carry on with the link's own metadata
        let meta = if is_symlink {
            tokio::fs::metadata(path).await.unwrap_or(link_meta.clone())
        } else {
            link_meta.clone()
        };

        let symlink_target = if is_symlink {
            tokio::fs::read_link(path)
                .await
                .map(|t| t.to_string_lossy().into_owned())
                .unwrap_or_default()
        } else {
            String::new()
        };

        let size = if meta.is_dir() {
            match count_children(path).await {
                Ok(n) => n,
                Err(_) => -1,
            }
        } else {
            meta.len() as i64
        };

        Ok(EntryMeta {
            is_dir: meta.is_dir(),
            is_file: meta.is_file(),
            is_symlink,
            read_only: meta.permissions().readonly(),
            size,
            modified: link_meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            symlink_target,
        })
    }

    async fn list_directory(&self, path: &Path) -> CoreResult<Vec<String>> {
        let meta = tokio::fs::metadata(path).await.map_err(|e| io_error(path, e))?;
        if !meta.is_dir() {
            return Err(CoreError::NotADirectory(path.to_path_buf()));
        }

        let mut names = Vec::new();
        let mut read_dir = tokio::fs::read_dir(path).await.map_err(|e| io_error(path, e))?;
        while let Some(child) = read_dir.next_entry().await.map_err(|e| io_error(path, e))? {
            names.push(child.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }

    async fn create_directory(&self, path: &Path, recursive: bool) -> CoreResult<()> {
        let result = if recursive {
            tokio::fs::create_dir_all(path).await
        } else {
            tokio::fs::create_dir(path).await
        };
        result.map_err(|e| io_error(path, e))
    }

    async fn create_file(&self, path: &Path) -> CoreResult<()> {
        tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await
            .map(|_| ())
            .map_err(|e| io_error(path, e))
    }

    async fn rename(&self, src: &Path, dst: &Path) -> CoreResult<()> {
        tokio::fs::rename(src, dst).await.map_err(|e| {
            if e.raw_os_error() == Some(CROSS_DEVICE_ERRNO) {
                CoreError::CrossDevice(src.to_path_buf())
            } else {
                io_error(src, e)
            }
        })
    }

    async fn copy(&self, src: &Path, dst: &Path) -> CoreResult<()> {
        let meta = tokio::fs::symlink_metadata(src)
            .await
            .map_err(|e| io_error(src, e))?;

        if meta.is_dir() {
            copy_dir_recursive(src, dst, 0).await?;
        } else {
            if let Some(parent) = dst.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            if meta.file_type().is_symlink() {
                copy_symlink(src, dst).await?;
            } else {
                tokio::fs::copy(src, dst).await.map_err(|e| io_error(src, e))?;
            }
        }

        Ok(())
    }

    async fn remove(&self, path: &Path, recursive: bool) -> CoreResult<()> {
        let meta = tokio::fs::symlink_metadata(path)
            .await
            .map_err(|e| io_error(path, e))?;

        let result = if meta.is_dir() {
            if recursive {
                tokio::fs::remove_dir_all(path).await
            } else {
                tokio::fs::remove_dir(path).await
            }
        } else {
            // regular files and symlinks alike
            tokio::fs::remove_file(path).await
        };
        result.map_err(|e| io_error(path, e))
    }
}

#[cfg(unix)]
const CROSS_DEVICE_ERRNO: i32 = 18; // EXDEV
#[cfg(windows)]
const CROSS_DEVICE_ERRNO: i32 = 17; // ERROR_NOT_SAME_DEVICE
#[cfg(not(any(unix, windows)))]
const CROSS_DEVICE_ERRNO: i32 = 18;

async fn count_children(path: &Path) -> std::io::Result<i64> {
    let mut read_dir = tokio::fs::read_dir(path).await?;
    let mut count = 0;
    while read_dir.next_entry().await?.is_some() {
        count += 1;
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn stat_regular_file() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("test.txt");
        fs::write(&file, "hello").unwrap();

        let meta = LocalFs.stat_entry(&file).await.unwrap();
        assert!(meta.is_file);
        assert!(!meta.is_dir);
        assert!(!meta.is_symlink);
        assert_eq!(meta.size, 5);
        assert!(meta.symlink_target.is_empty());
    }

    #[tokio::test]
    async fn stat_directory_counts_children() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("sub");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("a.txt"), "").unwrap();
        fs::write(dir.join("b.txt"), "").unwrap();

        let meta = LocalFs.stat_entry(&dir).await.unwrap();
        assert!(meta.is_dir);
        assert_eq!(meta.size, 2);
    }

    #[tokio::test]
    async fn stat_nonexistent_returns_not_found() {
        let tmp = TempDir::new().unwrap();
        let err = LocalFs.stat_entry(&tmp.path().join("nope")).await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stat_symlink_resolves_target_kind() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("real");
        fs::create_dir(&dir).unwrap();
        let link = tmp.path().join("link");
        std::os::unix::fs::symlink(&dir, &link).unwrap();

        let meta = LocalFs.stat_entry(&link).await.unwrap();
        assert!(meta.is_symlink);
        assert!(meta.is_dir);
        assert_eq!(meta.symlink_target, dir.to_string_lossy());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stat_broken_symlink_keeps_link_metadata() {
        let tmp = TempDir::new().unwrap();
        let link = tmp.path().join("dangling");
        std::os::unix::fs::symlink(tmp.path().join("gone"), &link).unwrap();

        let meta = LocalFs.stat_entry(&link).await.unwrap();
        assert!(meta.is_symlink);
        assert!(!meta.is_dir);
        assert!(!meta.is_file);
    }

    #[tokio::test]
    async fn list_directory_returns_names() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("file1.txt"), "").unwrap();
        fs::create_dir(tmp.path().join("subdir")).unwrap();

        let mut names = LocalFs.list_directory(tmp.path()).await.unwrap();
        names.sort();
        assert_eq!(names, vec!["file1.txt", "subdir"]);
    }

    #[tokio::test]
    async fn list_directory_on_file_returns_not_a_directory() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("not_a_dir.txt");
        fs::write(&file, "content").unwrap();

        let err = LocalFs.list_directory(&file).await.unwrap_err();
        assert!(matches!(err, CoreError::NotADirectory(_)));
    }

    #[tokio::test]
    async fn list_directory_nonexistent_returns_not_found() {
        let err = LocalFs
            .list_directory(Path::new("/nonexistent/path/that/does/not/exist"))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn create_directory_recursive() {
        let tmp = TempDir::new().unwrap();
        let deep = tmp.path().join("a").join("b").join("c");

        LocalFs.create_directory(&deep, true).await.unwrap();
        assert!(deep.is_dir());
    }

    #[tokio::test]
    async fn create_directory_non_recursive_needs_parent() {
        let tmp = TempDir::new().unwrap();
        let deep = tmp.path().join("missing").join("child");

        let result = LocalFs.create_directory(&deep, false).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn create_file_makes_empty_file() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("new.txt");

        LocalFs.create_file(&file).await.unwrap();
        assert_eq!(fs::read_to_string(&file).unwrap(), "");
    }

    #[tokio::test]
    async fn create_file_refuses_existing() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("existing.txt");
        fs::write(&file, "precious").unwrap();

        let result = LocalFs.create_file(&file).await;
        assert!(result.is_err());
        assert_eq!(fs::read_to_string(&file).unwrap(), "precious");
    }

    #[tokio::test]
    async fn rename_moves_file() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src.txt");
        let dst = tmp.path().join("dst.txt");
        fs::write(&src, "content").unwrap();

        LocalFs.rename(&src, &dst).await.unwrap();
        assert!(!src.exists());
        assert_eq!(fs::read_to_string(&dst).unwrap(), "content");
    }

    #[tokio::test]
    async fn rename_nonexistent_returns_not_found() {
        let tmp = TempDir::new().unwrap();
        let err = LocalFs
            .rename(&tmp.path().join("nope"), &tmp.path().join("dst"))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn copy_regular_file() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src.txt");
        let dst = tmp.path().join("dst.txt");
        fs::write(&src, "content").unwrap();

        LocalFs.copy(&src, &dst).await.unwrap();
        assert!(src.exists());
        assert_eq!(fs::read_to_string(&dst).unwrap(), "content");
    }

    #[tokio::test]
    async fn copy_directory_recursive() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src_dir");
        fs::create_dir(&src).unwrap();
        fs::write(src.join("a.txt"), "aaa").unwrap();
        fs::create_dir(src.join("nested")).unwrap();
        fs::write(src.join("nested").join("b.txt"), "bbb").unwrap();

        let dst = tmp.path().join("dst_dir");
        LocalFs.copy(&src, &dst).await.unwrap();

        assert_eq!(fs::read_to_string(dst.join("a.txt")).unwrap(), "aaa");
        assert_eq!(
            fs::read_to_string(dst.join("nested").join("b.txt")).unwrap(),
            "bbb"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn copy_preserves_symlinks_inside_tree() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("tree");
        fs::create_dir(&src).unwrap();
        fs::write(src.join("real.txt"), "data").unwrap();
        std::os::unix::fs::symlink("real.txt", src.join("link.txt")).unwrap();

        let dst = tmp.path().join("tree_copy");
        LocalFs.copy(&src, &dst).await.unwrap();

        let copied = dst.join("link.txt");
        assert!(fs::symlink_metadata(&copied).unwrap().file_type().is_symlink());
        assert_eq!(fs::read_to_string(&copied).unwrap(), "data");
    }

    #[tokio::test]
    async fn copy_nonexistent_src_returns_not_found() {
        let tmp = TempDir::new().unwrap();
        let err = LocalFs
            .copy(&tmp.path().join("nope"), &tmp.path().join("dst"))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn remove_file() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("bye.txt");
        fs::write(&file, "").unwrap();

        LocalFs.remove(&file, false).await.unwrap();
        assert!(!file.exists());
    }

    #[tokio::test]
    async fn remove_directory_recursive() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("doomed");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("inside.txt"), "").unwrap();

        LocalFs.remove(&dir, true).await.unwrap();
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn remove_nonexistent_returns_not_found() {
        let tmp = TempDir::new().unwrap();
        let err = LocalFs.remove(&tmp.path().join("nope"), true).await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }
}
