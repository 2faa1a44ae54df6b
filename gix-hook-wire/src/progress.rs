//! Human-readable progress output that stays quiet for fast pushes.
//!
//! Hooks print a character per processed reference. For pushes that finish quickly this is only
//! noise, so output can be held back until a delay has elapsed. The delay is a deadline which is
//! checked whenever something is written; no thread or timer is involved.

use std::io::{self, Write};
use std::time::{Duration, Instant};

/// A writer which buffers everything until its delay elapsed, and passes writes through afterwards.
///
/// The first write observed after the deadline flushes the buffer ahead of its own data.
/// [`close()`](DelayWriter::close) discards the buffer if the deadline wasn't reached yet, and
/// flushes it otherwise. Dropping the writer closes it.
#[derive(Debug)]
pub struct DelayWriter<W: Write> {
    inner: W,
    /// `None` once the writer became a passthrough or was closed.
    buf: Option<Vec<u8>>,
    deadline: Instant,
}

impl<W: Write> DelayWriter<W> {
    /// Create a new instance which holds back output to `inner` for `delay`.
    pub fn new(inner: W, delay: Duration) -> Self {
        DelayWriter {
            inner,
            buf: Some(Vec::new()),
            deadline: Instant::now() + delay,
        }
    }

    /// Return `true` if the delay elapsed.
    pub fn has_fired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    /// Return `true` if writes go straight to the underlying writer.
    pub fn is_passthrough(&self) -> bool {
        self.buf.is_none()
    }

    /// Finish writing.
    ///
    /// Output buffered so far is shown only if the delay elapsed, otherwise it's dropped.
    /// Calling this more than once has no effect.
    pub fn close(&mut self) -> io::Result<()> {
        let Some(buf) = self.buf.take() else {
            return Ok(());
        };
        if !self.has_fired() {
            tracing::trace!(discarded = buf.len(), "push finished before progress delay elapsed");
            return Ok(());
        }
        self.inner.write_all(&buf)?;
        self.inner.flush()
    }

    /// Access the underlying writer.
    pub fn inner(&self) -> &W {
        &self.inner
    }
}

impl<W: Write> Write for DelayWriter<W> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        if let Some(buf) = self.buf.as_mut() {
            if Instant::now() < self.deadline {
                buf.extend_from_slice(data);
                return Ok(data.len());
            }
            self.inner.write_all(buf)?;
            self.buf = None;
        }
        self.inner.write(data)
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.buf.is_some() {
            return Ok(());
        }
        self.inner.flush()
    }
}

impl<W: Write> Drop for DelayWriter<W> {
    fn drop(&mut self) {
        self.close().ok();
    }
}

/// Where progress output of a hook goes, as chosen by configuration.
#[derive(Debug)]
pub enum ProgressWriter<W: Write> {
    /// Progress is disabled; all writes succeed and are dropped.
    Discard(io::Sink),
    /// Progress is written immediately.
    Direct(W),
    /// Progress is held back for a while, see [`DelayWriter`].
    Delayed(DelayWriter<W>),
}

impl<W: Write> ProgressWriter<W> {
    /// Pick the writer for `out` given whether progress is `verbose` at all and how long to `delay` it.
    ///
    /// A zero `delay` writes directly.
    pub fn new(out: W, verbose: bool, delay: Duration) -> Self {
        if !verbose {
            ProgressWriter::Discard(io::sink())
        } else if delay.is_zero() {
            ProgressWriter::Direct(out)
        } else {
            ProgressWriter::Delayed(DelayWriter::new(out, delay))
        }
    }

    /// Finish writing, see [`DelayWriter::close()`].
    pub fn close(&mut self) -> io::Result<()> {
        match self {
            ProgressWriter::Discard(_) => Ok(()),
            ProgressWriter::Direct(out) => out.flush(),
            ProgressWriter::Delayed(out) => out.close(),
        }
    }
}

impl<W: Write> Write for ProgressWriter<W> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        match self {
            ProgressWriter::Discard(sink) => sink.write(data),
            ProgressWriter::Direct(out) => out.write(data),
            ProgressWriter::Delayed(out) => out.write(data),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            ProgressWriter::Discard(sink) => sink.flush(),
            ProgressWriter::Direct(out) => out.flush(),
            ProgressWriter::Delayed(out) => out.flush(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LONG: Duration = Duration::from_secs(3600);

    #[test]
    fn writes_are_held_back_until_the_delay_elapsed() {
        let mut out = Vec::new();
        {
            let mut w = DelayWriter::new(&mut out, LONG);
            w.write_all(b"***").unwrap();
            assert!(!w.is_passthrough());
            assert!(w.inner().is_empty());
        }
        assert!(out.is_empty(), "closing before the deadline discards the buffer");
    }

    #[test]
    fn first_write_after_the_deadline_flushes_in_order() {
        let mut out = Vec::new();
        {
            let mut w = DelayWriter::new(&mut out, LONG);
            w.write_all(b"ab").unwrap();
            w.deadline = Instant::now();
            w.write_all(b"cd").unwrap();
            assert!(w.is_passthrough());
            w.write_all(b"ef").unwrap();
        }
        assert_eq!(out, b"abcdef");
    }

    #[test]
    fn close_after_the_deadline_flushes_the_buffer() {
        let mut out = Vec::new();
        let mut w = DelayWriter::new(&mut out, LONG);
        w.write_all(b"pending").unwrap();
        w.deadline = Instant::now();
        w.close().unwrap();
        w.close().unwrap();
        drop(w);
        assert_eq!(out, b"pending");
    }

    #[test]
    fn zero_delay_writes_directly_and_disabled_progress_writes_nothing() {
        let mut out = Vec::new();
        let mut w = ProgressWriter::new(&mut out, true, Duration::ZERO);
        assert!(matches!(w, ProgressWriter::Direct(_)));
        w.write_all(b"*").unwrap();
        w.close().unwrap();
        drop(w);
        assert_eq!(out, b"*");

        let mut out = Vec::new();
        let mut w = ProgressWriter::new(&mut out, false, LONG);
        w.write_all(b"*").unwrap();
        w.close().unwrap();
        drop(w);
        assert!(out.is_empty());
    }
}
