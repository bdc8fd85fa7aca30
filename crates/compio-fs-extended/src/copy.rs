//! copy_file_range operations for efficient whole-file copies
//!
//! Data moves inside the kernel whenever the filesystem allows it. When the
//! kernel refuses before the first byte (cross-device on older kernels,
//! unsupported filesystem, special files) the copy falls back to a
//! `pread`/`pwrite` loop. Both paths use explicit offsets, so the file
//! positions of the descriptors are never consulted or moved.

use crate::error::{spawn_join_error, Result};
use std::io;
use std::os::unix::io::RawFd;

/// Maximum bytes requested per copy_file_range call
const COPY_CHUNK: usize = 1 << 30;

/// Buffer size for the user-space fallback
const BUFFER_SIZE: usize = 64 * 1024;

/// Copy the full content of `src_fd` into `dst_fd` starting at offset 0
///
/// The destination is written from offset 0 but never truncated; callers
/// that replace existing content truncate to the returned length afterwards.
///
/// # Returns
///
/// Number of bytes copied
///
/// # Errors
///
/// This function will return an error if:
/// - Either descriptor is invalid or opened with the wrong access mode
/// - The kernel copy fails after data was already transferred
/// - The fallback read or write fails
pub async fn copy_file_range_all(src_fd: RawFd, dst_fd: RawFd) -> Result<u64> {
    let copied = compio::runtime::spawn_blocking(move || copy_blocking(src_fd, dst_fd))
        .await
        .map_err(spawn_join_error)??;
    Ok(copied)
}

/// errnos for which an in-kernel copy is not possible but a plain copy is
fn wants_fallback(errno: Option<i32>) -> bool {
    matches!(
        errno,
        Some(libc::EXDEV | libc::ENOSYS | libc::EINVAL | libc::EOPNOTSUPP)
    )
}

fn copy_blocking(src_fd: RawFd, dst_fd: RawFd) -> io::Result<u64> {
    let mut src_off: libc::loff_t = 0;
    let mut dst_off: libc::loff_t = 0;

    loop {
        // SAFETY: both offsets are valid for writes; the descriptors are kept
        // open by the caller for the duration of the blocking task.
        let n = unsafe {
            libc::copy_file_range(src_fd, &mut src_off, dst_fd, &mut dst_off, COPY_CHUNK, 0)
        };

        if n == 0 {
            return Ok(dst_off as u64);
        }
        if n < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            if dst_off == 0 && wants_fallback(err.raw_os_error()) {
                return copy_read_write(src_fd, dst_fd);
            }
            return Err(err);
        }
    }
}

fn copy_read_write(src_fd: RawFd, dst_fd: RawFd) -> io::Result<u64> {
    let mut buffer = vec![0u8; BUFFER_SIZE];
    let mut offset: u64 = 0;

    loop {
        // SAFETY: buffer is valid for buffer.len() bytes of writes.
        let read = unsafe {
            libc::pread(
                src_fd,
                buffer.as_mut_ptr().cast(),
                buffer.len(),
                offset as libc::off_t,
            )
        };
        if read < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return Err(err);
        }
        if read == 0 {
            return Ok(offset);
        }

        let read = read as usize;
        let mut written = 0usize;
        while written < read {
            let chunk = &buffer[written..read];
            // SAFETY: chunk is an initialized slice of the buffer.
            let n = unsafe {
                libc::pwrite(
                    dst_fd,
                    chunk.as_ptr().cast(),
                    chunk.len(),
                    (offset + written as u64) as libc::off_t,
                )
            };
            if n < 0 {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(err);
            }
            written += n as usize;
        }
        offset += read as u64;
    }
}
