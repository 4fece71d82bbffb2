use std::fs::File;
use std::io::{Read, Write};
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};

use tracing::debug;

use crate::error::{Result, TransportError};

/// Buffer size assumed for pipes on platforms that cannot report it.
///
/// 16 KiB is the smallest default pipe buffer among the supported Unix
/// targets (macOS starts there and grows on demand).
#[cfg(not(target_os = "linux"))]
pub const PORTABLE_PIPE_CAPACITY: usize = 16 * 1024;

/// Create an anonymous pipe.
///
/// Both descriptors are close-on-exec. Dropping the writer signals EOF to the
/// reader once buffered bytes are drained.
pub fn pipe() -> Result<(PipeWriter, PipeReader)> {
    let mut fds: [libc::c_int; 2] = [-1, -1];

    #[cfg(target_os = "linux")]
    // SAFETY: `fds` is a valid, writable array of two c_ints as required by pipe2(2).
    let rc = unsafe { libc::pipe2(fds.as_mut_ptr(), libc::O_CLOEXEC) };

    #[cfg(not(target_os = "linux"))]
    // SAFETY: `fds` is a valid, writable array of two c_ints as required by pipe(2).
    let rc = unsafe { libc::pipe(fds.as_mut_ptr()) };

    if rc != 0 {
        return Err(TransportError::Create(std::io::Error::last_os_error()));
    }

    // SAFETY: pipe(2) succeeded, so both descriptors are open and owned solely by us.
    let (read_fd, write_fd) = unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) };

    #[cfg(not(target_os = "linux"))]
    {
        set_cloexec(read_fd.as_raw_fd())?;
        set_cloexec(write_fd.as_raw_fd())?;
    }

    debug!(
        read_fd = read_fd.as_raw_fd(),
        write_fd = write_fd.as_raw_fd(),
        "created pipe"
    );

    Ok((
        PipeWriter {
            file: File::from(write_fd),
        },
        PipeReader {
            file: File::from(read_fd),
        },
    ))
}

#[cfg(not(target_os = "linux"))]
fn set_cloexec(fd: RawFd) -> Result<()> {
    // SAFETY: `fd` is an open descriptor owned by the caller; F_GETFD takes no argument.
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFD) };
    if flags < 0 {
        return Err(TransportError::Create(std::io::Error::last_os_error()));
    }
    // SAFETY: `fd` is open; F_SETFD takes an int flag set.
    let rc = unsafe { libc::fcntl(fd, libc::F_SETFD, flags | libc::FD_CLOEXEC) };
    if rc < 0 {
        return Err(TransportError::Create(std::io::Error::last_os_error()));
    }
    Ok(())
}

/// Write end of an anonymous pipe.
pub struct PipeWriter {
    file: File,
}

impl PipeWriter {
    /// Bytes the pipe can hold before a write blocks.
    pub fn capacity(&self) -> Result<usize> {
        pipe_capacity(self.file.as_raw_fd())
    }

    /// Make sure the pipe can buffer at least `min` bytes without blocking.
    ///
    /// On Linux the buffer is grown with `F_SETPIPE_SZ` when it is smaller
    /// than `min`. Other platforms cannot resize and fail with
    /// [`TransportError::Resize`] if `min` exceeds the assumed capacity.
    pub fn ensure_capacity(&self, min: usize) -> Result<usize> {
        let current = self.capacity()?;
        if current >= min {
            return Ok(current);
        }
        let resized = resize_pipe(self.file.as_raw_fd(), min)?;
        debug!(from = current, to = resized, "grew pipe buffer");
        Ok(resized)
    }
}

impl Write for PipeWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.file.flush()
    }
}

impl std::fmt::Debug for PipeWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipeWriter")
            .field("fd", &self.file.as_raw_fd())
            .finish()
    }
}

/// Read end of an anonymous pipe.
pub struct PipeReader {
    file: File,
}

impl Read for PipeReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.file.read(buf)
    }
}

impl std::fmt::Debug for PipeReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipeReader")
            .field("fd", &self.file.as_raw_fd())
            .finish()
    }
}

#[cfg(target_os = "linux")]
fn pipe_capacity(fd: RawFd) -> Result<usize> {
    // SAFETY: `fd` is an open pipe descriptor; F_GETPIPE_SZ takes no argument.
    let size = unsafe { libc::fcntl(fd, libc::F_GETPIPE_SZ) };
    if size < 0 {
        return Err(TransportError::Io(std::io::Error::last_os_error()));
    }
    Ok(size as usize)
}

#[cfg(not(target_os = "linux"))]
fn pipe_capacity(_fd: RawFd) -> Result<usize> {
    Ok(PORTABLE_PIPE_CAPACITY)
}

#[cfg(target_os = "linux")]
fn resize_pipe(fd: RawFd, min: usize) -> Result<usize> {
    let requested = libc::c_int::try_from(min).map_err(|_| TransportError::Resize {
        requested: min,
        source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "size out of range"),
    })?;
    // SAFETY: `fd` is an open pipe descriptor; F_SETPIPE_SZ takes an int size.
    let size = unsafe { libc::fcntl(fd, libc::F_SETPIPE_SZ, requested) };
    if size < 0 {
        return Err(TransportError::Resize {
            requested: min,
            source: std::io::Error::last_os_error(),
        });
    }
    Ok(size as usize)
}

#[cfg(not(target_os = "linux"))]
fn resize_pipe(_fd: RawFd, min: usize) -> Result<usize> {
    Err(TransportError::Resize {
        requested: min,
        source: std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "pipe buffers cannot be resized on this platform",
        ),
    })
}
