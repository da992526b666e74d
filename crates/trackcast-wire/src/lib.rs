//! Wire protocol for trackcast
//!
//! Tagged-variant binary message catalogs exchanged between the tracker
//! server, renderer clients, and the emulator-attached producer. All
//! multi-byte integers are big-endian, all discriminants are a single
//! unsigned byte, and strings carry a u64 length prefix followed by that
//! many UTF-8 bytes.

pub mod cell;
pub mod layout;
pub mod message;
pub mod packet;

pub use cell::{CellOverlay, CellRender, CellStyle, ImageDir, LocationStyle};
pub use layout::{DoubleTrackerLayout, ElementOrder, TrackerLayout, UnknownLayoutTag};
pub use message::{ClientMessage, ServerMessage};
pub use packet::{FrameCodec, Packet, PROTO_VERSION};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("buffer ended in the middle of a message")]
    UnexpectedEof,

    #[error("unknown {kind} discriminant: {value}")]
    UnknownDiscriminant { kind: &'static str, value: u8 },

    #[error("declared string length {0} exceeds remaining buffer")]
    StringLength(u64),

    #[error("string field is not valid UTF-8")]
    InvalidUtf8,

    #[error("{0} bytes left over after message end")]
    TrailingBytes(usize),

    #[error("frame of {0} bytes exceeds the maximum frame size")]
    FrameTooLarge(usize),

    #[error("protocol version mismatch: ours {ours}, theirs {theirs}")]
    VersionMismatch { ours: u8, theirs: u8 },
}

/// Primitive field readers/writers shared by the catalogs.
///
/// Every reader bounds-checks before consuming, so a truncated buffer is
/// rejected rather than overread.
pub(crate) mod primitive {
    use super::DecodeError;
    use bytes::Buf;

    pub fn read_u8(buf: &mut &[u8]) -> Result<u8, DecodeError> {
        if buf.remaining() < 1 {
            return Err(DecodeError::UnexpectedEof);
        }
        Ok(buf.get_u8())
    }

    pub fn read_u32(buf: &mut &[u8]) -> Result<u32, DecodeError> {
        if buf.remaining() < 4 {
            return Err(DecodeError::UnexpectedEof);
        }
        Ok(buf.get_u32())
    }

    pub fn read_u64(buf: &mut &[u8]) -> Result<u64, DecodeError> {
        if buf.remaining() < 8 {
            return Err(DecodeError::UnexpectedEof);
        }
        Ok(buf.get_u64())
    }

    pub fn read_bool(buf: &mut &[u8]) -> Result<bool, DecodeError> {
        match read_u8(buf)? {
            0 => Ok(false),
            1 => Ok(true),
            value => Err(DecodeError::UnknownDiscriminant { kind: "bool", value }),
        }
    }

    pub fn read_string(buf: &mut &[u8]) -> Result<String, DecodeError> {
        let len = read_u64(buf)?;
        let len_usize = usize::try_from(len).map_err(|_| DecodeError::StringLength(len))?;
        if buf.remaining() < len_usize {
            return Err(DecodeError::StringLength(len));
        }
        let raw = buf[..len_usize].to_vec();
        buf.advance(len_usize);
        String::from_utf8(raw).map_err(|_| DecodeError::InvalidUtf8)
    }

    pub fn write_bool(buf: &mut Vec<u8>, value: bool) {
        buf.push(value as u8);
    }

    pub fn write_string(buf: &mut Vec<u8>, value: &str) {
        buf.extend_from_slice(&(value.len() as u64).to_be_bytes());
        buf.extend_from_slice(value.as_bytes());
    }

    /// Checks that a full-message decode consumed the whole buffer.
    pub fn finish(buf: &[u8]) -> Result<(), DecodeError> {
        if buf.is_empty() {
            Ok(())
        } else {
            Err(DecodeError::TrailingBytes(buf.len()))
        }
    }
}
