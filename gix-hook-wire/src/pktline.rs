//! Strict pkt-line framing as spoken between `receive-pack` and its `proc-receive` hook.
//!
//! Encoding is delegated to `gix-packetline-blocking`, which already refuses empty and oversized
//! payloads. Decoding is implemented here because the hook protocol needs to state up-front which
//! frame type it expects, and because delimiter and response-end packets are not part of it:
//! any length in `1..=4` is a framing error instead of a special packet.

use std::io::{Read, Write};

use gix_packetline_blocking as pkt;

const HEADER_LEN: usize = 4;

/// The largest value a length header may carry, including the 4 bytes of the header itself.
pub const MAX_LINE_LEN: usize = 65520;
/// The largest payload a data pkt-line may carry.
pub const MAX_DATA_LEN: usize = MAX_LINE_LEN - HEADER_LEN;

/// The frame type a reader is prepared to accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    /// Both flush and data frames are acceptable.
    Any,
    /// Only a flush-pkt is acceptable.
    Flush,
    /// Only a data pkt-line is acceptable.
    Data,
}

/// The kind of a decoded frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// `0000`
    Flush,
    /// A length-prefixed, non-empty payload.
    Data,
}

/// A single decoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PktLine {
    /// The flush-pkt, `0000`.
    Flush,
    /// A data frame whose payload is never empty.
    Data(Vec<u8>),
}

impl PktLine {
    /// Return the kind of this frame.
    pub fn kind(&self) -> Kind {
        match self {
            PktLine::Flush => Kind::Flush,
            PktLine::Data(_) => Kind::Data,
        }
    }

    /// Return the value of the length header this frame was decoded from, `0` for a flush-pkt.
    pub fn length(&self) -> usize {
        match self {
            PktLine::Flush => 0,
            PktLine::Data(data) => data.len() + HEADER_LEN,
        }
    }

    /// Return the payload, which is empty for a flush-pkt.
    pub fn payload(&self) -> &[u8] {
        match self {
            PktLine::Flush => &[],
            PktLine::Data(data) => data,
        }
    }

    /// Return `true` if this is a flush-pkt.
    pub fn is_flush(&self) -> bool {
        matches!(self, PktLine::Flush)
    }
}

/// The error returned by [`read()`] and the `write_*` functions.
#[derive(Debug, thiserror::Error)]
#[allow(missing_docs)]
pub enum Error {
    #[error("could not read pkt-line from input")]
    Read(#[source] std::io::Error),
    #[error("pkt-line length header {header:?} is not a hexadecimal number")]
    InvalidHeader { header: String },
    #[error("expected a data pkt-line but received a flush-pkt")]
    UnexpectedFlush,
    #[error("pkt-line length {length} is outside of the valid range 5..=65520")]
    InvalidLength { length: usize },
    #[error("expected a flush-pkt but received a pkt-line of length {length}")]
    UnexpectedData { length: usize },
    #[error("not allowed to write an empty pkt-line")]
    EmptyData,
    #[error("pkt-line of {length} bytes exceeds the maximum of 65520 bytes")]
    DataTooLong { length: usize },
    #[error("could not write pkt-line to output")]
    Write(#[source] std::io::Error),
}

impl Error {
    /// Return `true` if the error was caused by the underlying stream rather than by its content.
    pub fn is_io(&self) -> bool {
        matches!(self, Error::Read(_) | Error::Write(_))
    }
}

/// Read exactly one frame from `input`, failing if it isn't of the `expected` kind.
///
/// The payload is read in full; a stream ending early is an error.
pub fn read(input: &mut impl Read, expected: Expect) -> Result<PktLine, Error> {
    let mut header = [0u8; HEADER_LEN];
    input.read_exact(&mut header).map_err(Error::Read)?;
    let length = decode_header(&header)?;

    if length == 0 {
        if expected == Expect::Data {
            return Err(Error::UnexpectedFlush);
        }
        tracing::trace!("read flush-pkt");
        return Ok(PktLine::Flush);
    }
    if length <= HEADER_LEN || length > MAX_LINE_LEN {
        return Err(Error::InvalidLength { length });
    }
    if expected == Expect::Flush {
        return Err(Error::UnexpectedData { length });
    }

    let mut data = vec![0u8; length - HEADER_LEN];
    input.read_exact(&mut data).map_err(Error::Read)?;
    tracing::trace!(length, "read data pkt-line");
    Ok(PktLine::Data(data))
}

/// Write the flush-pkt, `0000`.
pub fn write_flush(out: &mut impl Write) -> Result<(), Error> {
    pkt::encode::flush_to_write(&mut *out).map_err(Error::Write)?;
    tracing::trace!("wrote flush-pkt");
    Ok(())
}

/// Write `data` as a single data pkt-line.
///
/// Empty payloads are refused as git's protocol forbids sending `0004`, and so are payloads
/// that would make the frame longer than [`MAX_LINE_LEN`].
pub fn write_data(out: &mut impl Write, data: &[u8]) -> Result<(), Error> {
    if data.is_empty() {
        return Err(Error::EmptyData);
    }
    let length = data.len() + HEADER_LEN;
    if length > MAX_LINE_LEN {
        return Err(Error::DataTooLong { length });
    }
    pkt::encode::data_to_write(data, &mut *out).map_err(Error::Write)?;
    tracing::trace!(length, "wrote data pkt-line");
    Ok(())
}

fn decode_header(header: &[u8; HEADER_LEN]) -> Result<usize, Error> {
    let invalid = || Error::InvalidHeader {
        header: String::from_utf8_lossy(header).into_owned(),
    };
    if !header.iter().all(u8::is_ascii_hexdigit) {
        return Err(invalid());
    }
    let digits = std::str::from_utf8(header).map_err(|_| invalid())?;
    usize::from_str_radix(digits, 16).map_err(|_| invalid())
}
