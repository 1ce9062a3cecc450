//! Filesystem helpers shared by the downloader, transcoder and library

use crate::error::{Error, Result};
use std::path::Path;

/// Free bytes on the filesystem holding `path`
///
/// Uses platform-specific APIs to query filesystem statistics:
/// - Unix: statvfs
/// - Windows: GetDiskFreeSpaceExW
///
/// # Examples
///
/// ```no_run
/// use tunefetch::utils::get_available_space;
/// use std::path::Path;
///
/// let available = get_available_space(Path::new("./data/audio")).unwrap();
/// println!("{} MiB free", available / (1024 * 1024));
/// ```
pub fn get_available_space(path: &Path) -> std::io::Result<u64> {
    #[cfg(unix)]
    {
        use std::ffi::CString;
        use std::os::unix::ffi::OsStrExt;

        let c_path = CString::new(path.as_os_str().as_bytes())
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

        // SAFETY: c_path is a valid NUL-terminated string, stat is zero-initialized and only
        // read after statvfs reports success.
        unsafe {
            let mut stat: libc::statvfs = std::mem::zeroed();
            if libc::statvfs(c_path.as_ptr(), &mut stat) != 0 {
                return Err(std::io::Error::last_os_error());
            }

            // f_bavail: blocks available to unprivileged users, f_frsize: fragment size
            #[allow(clippy::unnecessary_cast)]
            Ok((stat.f_bavail as u64).saturating_mul(stat.f_frsize as u64))
        }
    }

    #[cfg(windows)]
    {
        use std::os::windows::ffi::OsStrExt;
        use winapi::um::fileapi::GetDiskFreeSpaceExW;

        let wide_path: Vec<u16> = path
            .as_os_str()
            .encode_wide()
            .chain(std::iter::once(0))
            .collect();

        // SAFETY: wide_path is NUL-terminated and every out pointer refers to a live, aligned
        // u64 that is only read after the call succeeds.
        unsafe {
            let mut free_to_caller: u64 = 0;
            let mut total: u64 = 0;
            let mut total_free: u64 = 0;

            if GetDiskFreeSpaceExW(
                wide_path.as_ptr(),
                &mut free_to_caller as *mut u64 as *mut _,
                &mut total as *mut u64 as *mut _,
                &mut total_free as *mut u64 as *mut _,
            ) == 0
            {
                return Err(std::io::Error::last_os_error());
            }

            Ok(free_to_caller)
        }
    }

    #[cfg(not(any(unix, windows)))]
    {
        Err(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "Disk space checking is not supported on this platform",
        ))
    }
}

/// Fail with `StorageFailed` unless `dir` can take `needed` bytes and keep `min_free` spare
///
/// A failing space query is logged and treated as "enough space": the write itself will
/// surface a real storage error if there is none.
pub fn ensure_free_space(dir: &Path, needed: u64, min_free: u64) -> Result<()> {
    let available = match get_available_space(dir) {
        Ok(available) => available,
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "Could not query free disk space");
            return Ok(());
        }
    };

    let required = needed.saturating_add(min_free);
    if available < required {
        return Err(Error::StorageFailed {
            path: dir.to_path_buf(),
            reason: format!(
                "insufficient disk space: {} MiB needed, {} MiB available",
                required.div_ceil(1024 * 1024),
                available / (1024 * 1024)
            ),
        });
    }
    Ok(())
}

/// Remove a file, ignoring "not found"; other failures are logged
pub async fn remove_file_quietly(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove temporary file");
        }
    }
}
