//! Trackcast feed
//!
//! Producer-side poll loop: watches a RAM dump file an emulator keeps
//! rewriting, detects changed ranges, and streams them to the server as
//! framed packets. A real emulator attachment implements
//! [`MemoryReader`] against its marshaling API instead of a file.

use anyhow::{Context, Result};
use bytes::BytesMut;
use clap::Parser;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{info, warn};
use trackcast_state::{
    slots::RANGES, ChangeDetector, MemoryRange, MemoryReader, ReadError,
};
use trackcast_wire::{FrameCodec, Packet, PROTO_VERSION};

#[derive(Parser, Debug)]
#[command(author, version, about = "Trackcast feed - streams RAM changes to a trackcast server")]
struct Args {
    /// Server producer address
    #[arg(short, long, default_value = "127.0.0.1:24802")]
    server: SocketAddr,

    /// Room to publish into
    #[arg(short, long)]
    room: String,

    /// RAM dump file to poll
    #[arg(short, long)]
    dump: PathBuf,

    /// Poll interval in milliseconds
    #[arg(long, default_value = "500")]
    poll_interval: u64,
}

/// Reads ranges out of a dump file, reopening per poll so a rewrite by
/// the emulator is picked up whole.
pub struct FileReader {
    path: PathBuf,
}

impl FileReader {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl MemoryReader for FileReader {
    fn read(&mut self, range: MemoryRange) -> Result<Vec<u8>, ReadError> {
        let mut file = File::open(&self.path)?;
        file.seek(SeekFrom::Start(u64::from(range.offset)))?;
        let mut buf = vec![0; range.len as usize];
        let mut filled = 0;
        while filled < buf.len() {
            let n = file.read(&mut buf[filled..])?;
            if n == 0 {
                return Err(ReadError::Short {
                    offset: range.offset,
                    wanted: range.len,
                    got: filled,
                });
            }
            filled += n;
        }
        Ok(buf)
    }
}

pub async fn run() -> Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt().init();

    let mut detector = ChangeDetector::new(FileReader::new(args.dump.clone()), RANGES);
    let mut stream = TcpStream::connect(args.server)
        .await
        .with_context(|| format!("failed to connect to {}", args.server))?;

    // handshake: version byte, then the room name
    stream.write_u8(PROTO_VERSION).await?;
    stream.write_u64(args.room.len() as u64).await?;
    stream.write_all(args.room.as_bytes()).await?;
    info!(room = %args.room, server = %args.server, "feed connected");

    let mut interval = tokio::time::interval(Duration::from_millis(args.poll_interval));
    let mut sent_init = false;
    loop {
        tokio::select! {
            _ = interval.tick() => {
                let changed = match detector.poll() {
                    Ok(changed) => changed,
                    Err(e) => {
                        // recoverable: retried on the next tick
                        warn!("memory read failed: {e}");
                        continue;
                    }
                };
                let packet = if !sent_init {
                    let ranges = (0..detector.ranges().len())
                        .map(|i| detector.snapshot(i).map(|s| s.data().to_vec()))
                        .collect::<Option<Vec<_>>>()
                        .context("bootstrap poll left ranges unread")?;
                    sent_init = true;
                    Packet::RangesInit(ranges)
                } else if changed.is_empty() {
                    continue;
                } else {
                    let entries = changed
                        .indices()
                        .iter()
                        .map(|&i| {
                            detector
                                .snapshot(i as usize)
                                .map(|s| (i, s.data().to_vec()))
                        })
                        .collect::<Option<Vec<_>>>()
                        .context("changed range has no snapshot")?;
                    Packet::RangesDelta(entries)
                };
                write_packet(&mut stream, &packet).await?;
            }
            _ = tokio::signal::ctrl_c() => {
                write_packet(&mut stream, &Packet::Goodbye).await?;
                info!("goodbye sent, shutting down");
                return Ok(());
            }
        }
    }
}

async fn write_packet(stream: &mut TcpStream, packet: &Packet) -> Result<()> {
    let mut buf = BytesMut::new();
    FrameCodec::encode(packet, &mut buf)?;
    stream
        .write_all(&buf)
        .await
        .context("failed to write to server")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn file_reader_reads_the_requested_window() {
        let mut file = NamedTempFile::new().unwrap();
        let bytes: Vec<u8> = (0..=255).collect();
        file.write_all(&bytes).unwrap();
        let mut reader = FileReader::new(file.path().to_owned());
        let window = reader.read(MemoryRange { offset: 16, len: 4 }).unwrap();
        assert_eq!(window, vec![16, 17, 18, 19]);
    }

    #[test]
    fn short_file_is_a_short_read() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&[1, 2, 3]).unwrap();
        let mut reader = FileReader::new(file.path().to_owned());
        let err = reader.read(MemoryRange { offset: 0, len: 8 }).unwrap_err();
        assert!(matches!(err, ReadError::Short { wanted: 8, got: 3, .. }));
    }
}
