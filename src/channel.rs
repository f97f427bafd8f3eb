/*!

Capturing what the keyring libraries print on stderr.

[`Capture::install`] points file descriptor 2 at a pipe and keeps a
duplicate of the original stream, so the treasurer's own logging still
reaches the terminal. The read end of the pipe becomes an [`ErrorChannel`].

*/

use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, Read};
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};

use tracing::debug;

/// Guard for a redirected descriptor; dropping it puts the original stream back.
#[derive(Debug)]
pub struct Capture {
    target: RawFd,
    original: File,
}

impl Capture {
    /// Redirect the process's stderr into a pipe.
    pub fn install() -> io::Result<(Capture, ErrorChannel)> {
        Self::redirect(libc::STDERR_FILENO)
    }

    /// Redirect `target` into a pipe, returning the guard and the pipe's read end.
    pub fn redirect(target: RawFd) -> io::Result<(Capture, ErrorChannel)> {
        let original = dup(target)?;
        let (reader, writer) = pipe()?;
        set_nonblocking(&reader)?;
        // SAFETY: both descriptors are open; dup2 atomically replaces `target`.
        if unsafe { libc::dup2(writer.as_raw_fd(), target) } == -1 {
            return Err(io::Error::last_os_error());
        }
        drop(writer);
        debug!(target, "redirected descriptor into error channel");
        Ok((
            Capture {
                target,
                original: File::from(original),
            },
            ErrorChannel::new(File::from(reader)),
        ))
    }

    /// A fresh handle on the stream that was redirected away.
    pub fn original(&self) -> io::Result<File> {
        self.original.try_clone()
    }
}

impl Drop for Capture {
    fn drop(&mut self) {
        // SAFETY: `original` stays open for the lifetime of self.
        if unsafe { libc::dup2(self.original.as_raw_fd(), self.target) } == -1 {
            debug!(
                error = %io::Error::last_os_error(),
                "could not restore redirected descriptor"
            );
        }
    }
}

fn dup(fd: RawFd) -> io::Result<OwnedFd> {
    // SAFETY: on success the returned descriptor is new and owned by nobody else.
    let copy = unsafe { libc::fcntl(fd, libc::F_DUPFD_CLOEXEC, 0) };
    if copy == -1 {
        return Err(io::Error::last_os_error());
    }
    Ok(unsafe { OwnedFd::from_raw_fd(copy) })
}

fn pipe() -> io::Result<(OwnedFd, OwnedFd)> {
    let mut fds = [0 as libc::c_int; 2];
    // SAFETY: `fds` has room for the two descriptors pipe2 writes.
    if unsafe { libc::pipe2(fds.as_mut_ptr(), libc::O_CLOEXEC) } == -1 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: pipe2 succeeded, so both descriptors are open and unowned.
    Ok(unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) })
}

fn set_nonblocking(fd: &OwnedFd) -> io::Result<()> {
    let raw = fd.as_raw_fd();
    // SAFETY: plain flag manipulation on a descriptor we own.
    unsafe {
        let flags = libc::fcntl(raw, libc::F_GETFL);
        if flags == -1 || libc::fcntl(raw, libc::F_SETFL, flags | libc::O_NONBLOCK) == -1 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}

/// Line-oriented reader over a captured diagnostic stream.
///
/// Reads never block: whatever the stream holds is drained and split into
/// complete lines, which are then handed out one at a time.
#[derive(Debug)]
pub struct ErrorChannel<R = File> {
    source: R,
    pending: Vec<u8>,
    lines: VecDeque<String>,
}

impl<R: Read> ErrorChannel<R> {
    pub fn new(source: R) -> Self {
        Self {
            source,
            pending: Vec::new(),
            lines: VecDeque::new(),
        }
    }

    /// Consume the next non-blank captured line and return its message part.
    pub fn next_error(&mut self) -> Option<String> {
        self.drain();
        while let Some(line) = self.lines.pop_front() {
            let message = message_of(&line);
            if !message.is_empty() {
                return Some(message.to_string());
            }
        }
        None
    }

    fn drain(&mut self) {
        let mut chunk = [0u8; 4096];
        loop {
            match self.source.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => self.pending.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    debug!(error = %e, "error channel read failed");
                    break;
                }
            }
        }
        while let Some(end) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=end).collect();
            self.lines
                .push_back(String::from_utf8_lossy(&line).into_owned());
        }
    }
}

/// The part of a diagnostic line after its last `:`, trimmed.
///
/// libdbus and gnome-keyring prefix their messages with a source or error
/// name; the classifier only cares about the trailing sentence.
pub fn message_of(line: &str) -> &str {
    line.rsplit(':').next().unwrap_or_default().trim()
}
