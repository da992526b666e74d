//! Tracker layouts
//!
//! A layout names the mapping from game state onto the fixed cell array.
//! Clients select one by string tag in the page URL; on the wire it travels
//! as a one-byte discriminant, with the default layout carrying three extra
//! configuration bytes.

use crate::{
    primitive::{read_bool, read_u8, write_bool},
    DecodeError,
};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Ordering of the six dungeon-reward elements in the default layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ElementOrder {
    LightShadowSpirit,
    LightSpiritShadow,
    ShadowSpiritLight,
    SpiritShadowLight,
}

impl ElementOrder {
    fn discriminant(self) -> u8 {
        match self {
            ElementOrder::LightShadowSpirit => 0,
            ElementOrder::LightSpiritShadow => 1,
            ElementOrder::ShadowSpiritLight => 2,
            ElementOrder::SpiritShadowLight => 3,
        }
    }

    fn from_discriminant(value: u8) -> Result<Self, DecodeError> {
        Ok(match value {
            0 => ElementOrder::LightShadowSpirit,
            1 => ElementOrder::LightSpiritShadow,
            2 => ElementOrder::ShadowSpiritLight,
            3 => ElementOrder::SpiritShadowLight,
            value => return Err(DecodeError::UnknownDiscriminant { kind: "ElementOrder", value }),
        })
    }
}

/// A single-runner cell layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrackerLayout {
    Default {
        auto: bool,
        meds: ElementOrder,
        warp_songs: ElementOrder,
    },
    MwExpanded,
    MwCollapsed,
    MwEdit,
    RslLeft,
    RslRight,
    RslEdit,
    Rsl3Player,
    TsgMainLocs,
    TsgMainLocsEdit,
}

impl TrackerLayout {
    pub(crate) fn write_to(&self, buf: &mut Vec<u8>) {
        match self {
            TrackerLayout::Default { auto, meds, warp_songs } => {
                buf.push(0);
                write_bool(buf, *auto);
                buf.push(meds.discriminant());
                buf.push(warp_songs.discriminant());
            }
            TrackerLayout::MwExpanded => buf.push(1),
            TrackerLayout::MwCollapsed => buf.push(2),
            TrackerLayout::MwEdit => buf.push(3),
            TrackerLayout::RslLeft => buf.push(4),
            TrackerLayout::RslRight => buf.push(5),
            TrackerLayout::RslEdit => buf.push(6),
            TrackerLayout::Rsl3Player => buf.push(7),
            TrackerLayout::TsgMainLocs => buf.push(8),
            TrackerLayout::TsgMainLocsEdit => buf.push(9),
        }
    }

    pub(crate) fn read_from(buf: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(match read_u8(buf)? {
            0 => TrackerLayout::Default {
                auto: read_bool(buf)?,
                meds: ElementOrder::from_discriminant(read_u8(buf)?)?,
                warp_songs: ElementOrder::from_discriminant(read_u8(buf)?)?,
            },
            1 => TrackerLayout::MwExpanded,
            2 => TrackerLayout::MwCollapsed,
            3 => TrackerLayout::MwEdit,
            4 => TrackerLayout::RslLeft,
            5 => TrackerLayout::RslRight,
            6 => TrackerLayout::RslEdit,
            7 => TrackerLayout::Rsl3Player,
            8 => TrackerLayout::TsgMainLocs,
            9 => TrackerLayout::TsgMainLocsEdit,
            value => return Err(DecodeError::UnknownDiscriminant { kind: "TrackerLayout", value }),
        })
    }
}

impl Default for TrackerLayout {
    fn default() -> Self {
        TrackerLayout::Default {
            auto: false,
            meds: ElementOrder::LightShadowSpirit,
            warp_songs: ElementOrder::SpiritShadowLight,
        }
    }
}

/// Raised when a URL layout tag has no wire mapping. This is fatal on the
/// client before any bytes are sent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown layout tag: {0}")]
pub struct UnknownLayoutTag(pub String);

impl FromStr for TrackerLayout {
    type Err = UnknownLayoutTag;

    fn from_str(tag: &str) -> Result<Self, UnknownLayoutTag> {
        Ok(match tag {
            "default" => TrackerLayout::default(),
            "mw-expanded" => TrackerLayout::MwExpanded,
            "mw-collapsed" => TrackerLayout::MwCollapsed,
            "mw-edit" => TrackerLayout::MwEdit,
            "rsl-left" => TrackerLayout::RslLeft,
            "rsl-right" => TrackerLayout::RslRight,
            "rsl-edit" => TrackerLayout::RslEdit,
            "rsl-3player" => TrackerLayout::Rsl3Player,
            "tsg-main-locs" => TrackerLayout::TsgMainLocs,
            "tsg-main-locs-edit" => TrackerLayout::TsgMainLocsEdit,
            _ => return Err(UnknownLayoutTag(tag.to_owned())),
        })
    }
}

impl fmt::Display for TrackerLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TrackerLayout::Default { .. } => "default",
            TrackerLayout::MwExpanded => "mw-expanded",
            TrackerLayout::MwCollapsed => "mw-collapsed",
            TrackerLayout::MwEdit => "mw-edit",
            TrackerLayout::RslLeft => "rsl-left",
            TrackerLayout::RslRight => "rsl-right",
            TrackerLayout::RslEdit => "rsl-edit",
            TrackerLayout::Rsl3Player => "rsl-3player",
            TrackerLayout::TsgMainLocs => "tsg-main-locs",
            TrackerLayout::TsgMainLocsEdit => "tsg-main-locs-edit",
        })
    }
}

/// Layout for a side-by-side view of two runners' states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DoubleTrackerLayout {
    DungeonRewards,
}

impl DoubleTrackerLayout {
    pub fn discriminant(self) -> u8 {
        match self {
            DoubleTrackerLayout::DungeonRewards => 0,
        }
    }

    pub fn from_discriminant(value: u8) -> Result<Self, DecodeError> {
        match value {
            0 => Ok(DoubleTrackerLayout::DungeonRewards),
            value => Err(DecodeError::UnknownDiscriminant {
                kind: "DoubleTrackerLayout",
                value,
            }),
        }
    }
}

impl FromStr for DoubleTrackerLayout {
    type Err = UnknownLayoutTag;

    fn from_str(tag: &str) -> Result<Self, UnknownLayoutTag> {
        match tag {
            "dungeon-rewards" => Ok(DoubleTrackerLayout::DungeonRewards),
            _ => Err(UnknownLayoutTag(tag.to_owned())),
        }
    }
}

impl fmt::Display for DoubleTrackerLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DoubleTrackerLayout::DungeonRewards => "dungeon-rewards",
        })
    }
}
