//! Cell visuals as they travel over the wire
//!
//! A cell is one of the 52 fixed slots a renderer displays: a main image,
//! a dimming style, and an optional overlay (count badge, second image, or
//! location marker).

use crate::{
    primitive::{read_string, read_u8, write_string},
    DecodeError,
};

/// Which image directory a filename resolves against on the renderer side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageDir {
    Xopar,
    Extra,
}

impl ImageDir {
    pub(crate) fn write_to(self, buf: &mut Vec<u8>) {
        buf.push(match self {
            ImageDir::Xopar => 0,
            ImageDir::Extra => 1,
        });
    }

    pub(crate) fn read_from(buf: &mut &[u8]) -> Result<Self, DecodeError> {
        match read_u8(buf)? {
            0 => Ok(ImageDir::Xopar),
            1 => Ok(ImageDir::Extra),
            value => Err(DecodeError::UnknownDiscriminant { kind: "ImageDir", value }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellStyle {
    Normal,
    Dimmed,
    LeftDimmed,
    RightDimmed,
}

impl CellStyle {
    pub(crate) fn write_to(self, buf: &mut Vec<u8>) {
        buf.push(match self {
            CellStyle::Normal => 0,
            CellStyle::Dimmed => 1,
            CellStyle::LeftDimmed => 2,
            CellStyle::RightDimmed => 3,
        });
    }

    pub(crate) fn read_from(buf: &mut &[u8]) -> Result<Self, DecodeError> {
        match read_u8(buf)? {
            0 => Ok(CellStyle::Normal),
            1 => Ok(CellStyle::Dimmed),
            2 => Ok(CellStyle::LeftDimmed),
            3 => Ok(CellStyle::RightDimmed),
            value => Err(DecodeError::UnknownDiscriminant { kind: "CellStyle", value }),
        }
    }
}

/// Style of a location marker overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocationStyle {
    Normal,
    Dimmed,
    Mq,
}

impl LocationStyle {
    pub(crate) fn write_to(self, buf: &mut Vec<u8>) {
        buf.push(match self {
            LocationStyle::Normal => 0,
            LocationStyle::Dimmed => 1,
            LocationStyle::Mq => 2,
        });
    }

    pub(crate) fn read_from(buf: &mut &[u8]) -> Result<Self, DecodeError> {
        match read_u8(buf)? {
            0 => Ok(LocationStyle::Normal),
            1 => Ok(LocationStyle::Dimmed),
            2 => Ok(LocationStyle::Mq),
            value => Err(DecodeError::UnknownDiscriminant { kind: "LocationStyle", value }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CellOverlay {
    None,
    Count {
        count: u8,
        dir: ImageDir,
        img: String,
    },
    Image {
        dir: ImageDir,
        img: String,
    },
    Location {
        dir: ImageDir,
        img: String,
        style: LocationStyle,
    },
}

impl CellOverlay {
    pub(crate) fn write_to(&self, buf: &mut Vec<u8>) {
        match self {
            CellOverlay::None => buf.push(0),
            CellOverlay::Count { count, dir, img } => {
                buf.push(1);
                buf.push(*count);
                dir.write_to(buf);
                write_string(buf, img);
            }
            CellOverlay::Image { dir, img } => {
                buf.push(2);
                dir.write_to(buf);
                write_string(buf, img);
            }
            CellOverlay::Location { dir, img, style } => {
                buf.push(3);
                dir.write_to(buf);
                write_string(buf, img);
                style.write_to(buf);
            }
        }
    }

    pub(crate) fn read_from(buf: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(match read_u8(buf)? {
            0 => CellOverlay::None,
            1 => CellOverlay::Count {
                count: read_u8(buf)?,
                dir: ImageDir::read_from(buf)?,
                img: read_string(buf)?,
            },
            2 => CellOverlay::Image {
                dir: ImageDir::read_from(buf)?,
                img: read_string(buf)?,
            },
            3 => CellOverlay::Location {
                dir: ImageDir::read_from(buf)?,
                img: read_string(buf)?,
                style: LocationStyle::read_from(buf)?,
            },
            value => return Err(DecodeError::UnknownDiscriminant { kind: "CellOverlay", value }),
        })
    }
}

/// The full visual of one renderer slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CellRender {
    pub dir: ImageDir,
    pub img: String,
    pub style: CellStyle,
    pub overlay: CellOverlay,
}

impl CellRender {
    pub(crate) fn write_to(&self, buf: &mut Vec<u8>) {
        self.dir.write_to(buf);
        write_string(buf, &self.img);
        self.style.write_to(buf);
        self.overlay.write_to(buf);
    }

    pub(crate) fn read_from(buf: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(CellRender {
            dir: ImageDir::read_from(buf)?,
            img: read_string(buf)?,
            style: CellStyle::read_from(buf)?,
            overlay: CellOverlay::read_from(buf)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(cell: &CellRender) -> CellRender {
        let mut buf = Vec::new();
        cell.write_to(&mut buf);
        let mut slice = buf.as_slice();
        let decoded = CellRender::read_from(&mut slice).unwrap();
        assert!(slice.is_empty(), "cell decode left bytes behind");
        decoded
    }

    #[test]
    fn cell_roundtrip_all_overlays() {
        let overlays = [
            CellOverlay::None,
            CellOverlay::Count {
                count: 7,
                dir: ImageDir::Xopar,
                img: "skulls".to_owned(),
            },
            CellOverlay::Image {
                dir: ImageDir::Extra,
                img: "fairy".to_owned(),
            },
            CellOverlay::Location {
                dir: ImageDir::Xopar,
                img: "deku-tree".to_owned(),
                style: LocationStyle::Mq,
            },
        ];
        for overlay in overlays {
            let cell = CellRender {
                dir: ImageDir::Extra,
                img: "hookshot".to_owned(),
                style: CellStyle::LeftDimmed,
                overlay,
            };
            assert_eq!(roundtrip(&cell), cell);
        }
    }

    #[test]
    fn cell_rejects_unknown_style() {
        let mut buf = Vec::new();
        ImageDir::Xopar.write_to(&mut buf);
        write_string(&mut buf, "sword");
        buf.push(9); // not a CellStyle
        let mut slice = buf.as_slice();
        assert_eq!(
            CellRender::read_from(&mut slice),
            Err(DecodeError::UnknownDiscriminant { kind: "CellStyle", value: 9 })
        );
    }

    #[test]
    fn cell_rejects_truncated_filename() {
        let mut buf = Vec::new();
        ImageDir::Xopar.write_to(&mut buf);
        buf.extend_from_slice(&100u64.to_be_bytes()); // claims 100 bytes, provides 3
        buf.extend_from_slice(b"abc");
        let mut slice = buf.as_slice();
        assert_eq!(
            CellRender::read_from(&mut slice),
            Err(DecodeError::StringLength(100))
        );
    }
}
