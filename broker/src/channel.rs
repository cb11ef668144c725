//! The one-shot decision channel.
//!
//! The requester creates a FIFO and blocks reading [`DECISION_RECORD_LEN`]
//! bytes from it. The broker never creates, truncates or removes the path; it
//! opens it for writing once, writes one record, and closes it.

use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::os::fd::AsRawFd;
use std::os::unix::fs::FileTypeExt;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use rootprompt_protocol::DECISION_RECORD_LEN;
use rootprompt_protocol::Policy;

const OPEN_RETRY_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("decision channel {} does not exist", .path.display())]
    Missing { path: PathBuf },
    #[error("decision channel {} is not a FIFO", .path.display())]
    NotAFifo { path: PathBuf },
    #[error("no reader on decision channel {} after {timeout:?}", .path.display())]
    NoReader { path: PathBuf, timeout: Duration },
    #[error("failed to open decision channel {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write decision to {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("decision write did not complete: {0}")]
    Task(String),
}

/// Destination for the single decision record of one prompt.
///
/// Implementations may block. Callers guarantee `deliver` runs at most once.
pub trait DecisionSink: Send + Sync {
    fn deliver(&self, policy: Policy) -> Result<(), ChannelError>;
}

/// Builds the sink for a channel path taken from a live request.
pub trait ChannelFactory: Send + Sync {
    fn channel_for(&self, path: &Path) -> Arc<dyn DecisionSink>;
}

/// Writes the record to a FIFO created by the requester.
#[derive(Debug, Clone)]
pub struct FifoChannel {
    path: PathBuf,
    open_timeout: Duration,
}

impl FifoChannel {
    pub fn new(path: impl Into<PathBuf>, open_timeout: Duration) -> Self {
        Self {
            path: path.into(),
            open_timeout,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Opens the FIFO for writing without blocking the caller forever.
    ///
    /// A non-blocking open of a FIFO fails with `ENXIO` until a reader is
    /// attached, so the open is polled until `open_timeout` elapses. The
    /// returned descriptor is switched back to blocking mode for the write.
    fn open_writer(&self) -> Result<File, ChannelError> {
        let deadline = Instant::now() + self.open_timeout;
        loop {
            let attempt = OpenOptions::new()
                .write(true)
                .custom_flags(libc::O_NONBLOCK)
                .open(&self.path);
            match attempt {
                Ok(file) => {
                    self.ensure_fifo(&file)?;
                    set_blocking(&file).map_err(|source| ChannelError::Open {
                        path: self.path.clone(),
                        source,
                    })?;
                    return Ok(file);
                }
                Err(err) if err.raw_os_error() == Some(libc::ENXIO) => {
                    if Instant::now() >= deadline {
                        return Err(ChannelError::NoReader {
                            path: self.path.clone(),
                            timeout: self.open_timeout,
                        });
                    }
                    std::thread::sleep(OPEN_RETRY_INTERVAL);
                }
                Err(err) if err.kind() == io::ErrorKind::NotFound => {
                    return Err(ChannelError::Missing {
                        path: self.path.clone(),
                    });
                }
                Err(source) => {
                    return Err(ChannelError::Open {
                        path: self.path.clone(),
                        source,
                    });
                }
            }
        }
    }

    fn ensure_fifo(&self, file: &File) -> Result<(), ChannelError> {
        let metadata = file.metadata().map_err(|source| ChannelError::Open {
            path: self.path.clone(),
            source,
        })?;
        if metadata.file_type().is_fifo() {
            Ok(())
        } else {
            Err(ChannelError::NotAFifo {
                path: self.path.clone(),
            })
        }
    }
}

impl DecisionSink for FifoChannel {
    fn deliver(&self, policy: Policy) -> Result<(), ChannelError> {
        let mut file = self.open_writer()?;
        let record: [u8; DECISION_RECORD_LEN] = policy.to_record();
        file.write_all(&record)
            .and_then(|()| file.flush())
            .map_err(|source| ChannelError::Write {
                path: self.path.clone(),
                source,
            })?;
        tracing::debug!(path = %self.path.display(), %policy, "decision record written");
        Ok(())
    }
}

/// Produces [`FifoChannel`]s sharing one open timeout.
#[derive(Debug, Clone, Copy)]
pub struct FifoChannelFactory {
    open_timeout: Duration,
}

impl FifoChannelFactory {
    pub fn new(open_timeout: Duration) -> Self {
        Self { open_timeout }
    }
}

impl ChannelFactory for FifoChannelFactory {
    fn channel_for(&self, path: &Path) -> Arc<dyn DecisionSink> {
        Arc::new(FifoChannel::new(path, self.open_timeout))
    }
}

fn set_blocking(file: &File) -> io::Result<()> {
    let fd = file.as_raw_fd();
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags < 0 {
        return Err(io::Error::last_os_error());
    }
    let ret = unsafe { libc::fcntl(fd, libc::F_SETFL, flags & !libc::O_NONBLOCK) };
    if ret < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}
