//! Blocking byte-channel helpers: exact reads and caller-driven cancellation.

use std::io::{self, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{Error, Result};

/// Shared flag a transport layer sets to abort a blocked read.
///
/// The codec only observes it between reads, so the underlying reader should
/// have a read timeout for cancellation to take effect promptly.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Fill `buf` completely, looping over short reads.
///
/// `Interrupted` is retried. With a token, `TimedOut` and `WouldBlock` are
/// treated as a chance to check for cancellation and the read is retried;
/// without one they are returned as errors. EOF before `buf` is full is
/// `UnexpectedEof`.
pub(crate) fn read_full<R: Read + ?Sized>(
    reader: &mut R,
    buf: &mut [u8],
    cancel: Option<&CancelToken>,
) -> Result<()> {
    let mut filled = 0;
    while filled < buf.len() {
        if cancel.is_some_and(CancelToken::is_cancelled) {
            return Err(Error::Cancelled);
        }
        match reader.read(&mut buf[filled..]) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("channel closed after {filled} of {} octets", buf.len()),
                )
                .into())
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e)
                if cancel.is_some()
                    && matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}
