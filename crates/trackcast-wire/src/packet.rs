//! Producer packet protocol
//!
//! The emulator-attached producer streams raw memory-range payloads to the
//! server over TCP. The stream opens with a single protocol version byte;
//! after that, packets travel in 4-byte length-prefixed frames so a reader
//! can pull complete packets out of a byte stream incrementally.

use crate::{
    primitive::{finish, read_u32, read_u8},
    DecodeError,
};
use bytes::{Buf, BufMut, BytesMut};

/// Bumped whenever any discriminant range in the protocol widens.
pub const PROTO_VERSION: u8 = 1;

/// Largest frame a peer may send. Range payloads are a few KiB in practice;
/// anything near this size indicates a corrupt or hostile stream.
pub const MAX_FRAME_LEN: usize = 1 << 20;

/// One message from the producer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    /// Clean end of stream.
    Goodbye,
    /// Full payloads for every range in the static table, in table order.
    RangesInit(Vec<Vec<u8>>),
    /// Payloads for ranges that changed since the previous packet.
    RangesDelta(Vec<(u8, Vec<u8>)>),
}

impl Packet {
    fn write_to(&self, buf: &mut Vec<u8>) {
        match self {
            Packet::Goodbye => buf.push(0),
            Packet::RangesInit(ranges) => {
                buf.push(1);
                buf.push(ranges.len() as u8);
                for range in ranges {
                    buf.extend_from_slice(&(range.len() as u32).to_be_bytes());
                    buf.extend_from_slice(range);
                }
            }
            Packet::RangesDelta(entries) => {
                buf.push(2);
                buf.push(entries.len() as u8);
                for (index, bytes) in entries {
                    buf.push(*index);
                    buf.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
                    buf.extend_from_slice(bytes);
                }
            }
        }
    }

    fn read_from(buf: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(match read_u8(buf)? {
            0 => Packet::Goodbye,
            1 => {
                let count = read_u8(buf)?;
                let mut ranges = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    ranges.push(read_range_payload(buf)?);
                }
                Packet::RangesInit(ranges)
            }
            2 => {
                let count = read_u8(buf)?;
                let mut entries = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    let index = read_u8(buf)?;
                    entries.push((index, read_range_payload(buf)?));
                }
                Packet::RangesDelta(entries)
            }
            value => return Err(DecodeError::UnknownDiscriminant { kind: "Packet", value }),
        })
    }
}

fn read_range_payload(buf: &mut &[u8]) -> Result<Vec<u8>, DecodeError> {
    let len = read_u32(buf)? as usize;
    if buf.remaining() < len {
        return Err(DecodeError::UnexpectedEof);
    }
    let payload = buf[..len].to_vec();
    buf.advance(len);
    Ok(payload)
}

/// Frame encoder/decoder for the producer stream.
pub struct FrameCodec;

impl FrameCodec {
    /// Encode a packet with its length prefix.
    pub fn encode(packet: &Packet, buf: &mut BytesMut) -> Result<(), DecodeError> {
        let mut payload = Vec::new();
        packet.write_to(&mut payload);
        if payload.len() > MAX_FRAME_LEN {
            return Err(DecodeError::FrameTooLarge(payload.len()));
        }
        buf.put_u32(payload.len() as u32);
        buf.extend_from_slice(&payload);
        Ok(())
    }

    /// Decode one packet from the buffer.
    ///
    /// Returns `Ok(None)` if the buffer does not yet hold a complete frame;
    /// the caller reads more bytes and retries.
    pub fn decode(buf: &mut BytesMut) -> Result<Option<Packet>, DecodeError> {
        if buf.len() < 4 {
            return Ok(None);
        }
        let mut len_bytes = [0u8; 4];
        len_bytes.copy_from_slice(&buf[..4]);
        let len = u32::from_be_bytes(len_bytes) as usize;
        if len > MAX_FRAME_LEN {
            return Err(DecodeError::FrameTooLarge(len));
        }
        if buf.len() < 4 + len {
            return Ok(None);
        }
        buf.advance(4);
        let frame = buf.split_to(len);
        let mut slice = &frame[..];
        let packet = Packet::read_from(&mut slice)?;
        finish(slice)?;
        Ok(Some(packet))
    }
}

/// Validates the version byte a peer sent at the start of its stream.
pub fn check_version(theirs: u8) -> Result<(), DecodeError> {
    if theirs == PROTO_VERSION {
        Ok(())
    } else {
        Err(DecodeError::VersionMismatch { ours: PROTO_VERSION, theirs })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packet_roundtrip_through_frames() {
        let packets = [
            Packet::Goodbye,
            Packet::RangesInit(vec![vec![1, 2, 3], vec![], vec![0xff; 64]]),
            Packet::RangesDelta(vec![(0, vec![9, 9]), (4, vec![])]),
        ];
        let mut buf = BytesMut::new();
        for packet in &packets {
            FrameCodec::encode(packet, &mut buf).unwrap();
        }
        for expected in &packets {
            let decoded = FrameCodec::decode(&mut buf).unwrap().unwrap();
            assert_eq!(&decoded, expected);
        }
        assert!(buf.is_empty());
    }

    #[test]
    fn partial_frame_waits_for_more_bytes() {
        let mut full = BytesMut::new();
        FrameCodec::encode(&Packet::RangesInit(vec![vec![7; 16]]), &mut full).unwrap();
        let mut partial = BytesMut::from(&full[..full.len() - 1]);
        assert_eq!(FrameCodec::decode(&mut partial).unwrap(), None);
    }

    #[test]
    fn oversized_frame_is_rejected_without_buffering() {
        let mut buf = BytesMut::new();
        buf.put_u32(MAX_FRAME_LEN as u32 + 1);
        assert!(matches!(
            FrameCodec::decode(&mut buf),
            Err(DecodeError::FrameTooLarge(_))
        ));
    }

    #[test]
    fn unknown_packet_discriminant_is_fatal() {
        let mut buf = BytesMut::new();
        buf.put_u32(1);
        buf.put_u8(77);
        assert_eq!(
            FrameCodec::decode(&mut buf),
            Err(DecodeError::UnknownDiscriminant { kind: "Packet", value: 77 })
        );
    }

    #[test]
    fn version_mismatch_reports_both_sides() {
        assert_eq!(check_version(PROTO_VERSION), Ok(()));
        assert_eq!(
            check_version(0),
            Err(DecodeError::VersionMismatch { ours: PROTO_VERSION, theirs: 0 })
        );
    }
}
