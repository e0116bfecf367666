/// Persisted geometry of one photo on the board
///
/// A placement is computed once by the layout engine and then saved by image
/// id, so a returning viewer sees the same board. Positions are absolute board
/// coordinates; the anchor ids are only kept to restore grid occupancy.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::geometry::Rect;
use super::growth::scale_for_level;

/// Separator between the two anchor ids of a two-anchor portrait
pub const ANCHOR_PAIR_SEPARATOR: char = ',';

/// Stable name of one anchor slot: its row band and its column's x position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnchorId {
    pub row: usize,
    pub column_x: i64,
}

impl AnchorId {
    pub fn new(row: usize, column_x: i64) -> Self {
        Self { row, column_x }
    }
}

impl fmt::Display for AnchorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "anchor_{}_col_{}", self.row, self.column_x)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseAnchorError(pub String);

impl fmt::Display for ParseAnchorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid anchor id: {}", self.0)
    }
}

impl std::error::Error for ParseAnchorError {}

impl FromStr for AnchorId {
    type Err = ParseAnchorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseAnchorError(s.to_string());
        let rest = s.trim().strip_prefix("anchor_").ok_or_else(err)?;
        let (row, column_x) = rest.split_once("_col_").ok_or_else(err)?;
        Ok(AnchorId {
            row: row.parse().map_err(|_| err())?,
            column_x: column_x.parse().map_err(|_| err())?,
        })
    }
}

/// Which anchor(s) a photo holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum AnchorMapping {
    Single(AnchorId),
    /// Upper anchor first
    Pair(AnchorId, AnchorId),
}

impl AnchorMapping {
    pub fn anchors(&self) -> Vec<AnchorId> {
        match *self {
            AnchorMapping::Single(id) => vec![id],
            AnchorMapping::Pair(upper, lower) => vec![upper, lower],
        }
    }

    pub fn is_pair(&self) -> bool {
        matches!(self, AnchorMapping::Pair(..))
    }
}

impl fmt::Display for AnchorMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnchorMapping::Single(id) => write!(f, "{}", id),
            AnchorMapping::Pair(upper, lower) => {
                write!(f, "{}{}{}", upper, ANCHOR_PAIR_SEPARATOR, lower)
            }
        }
    }
}

impl FromStr for AnchorMapping {
    type Err = ParseAnchorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(ANCHOR_PAIR_SEPARATOR) {
            Some((upper, lower)) => Ok(AnchorMapping::Pair(upper.parse()?, lower.parse()?)),
            None => Ok(AnchorMapping::Single(s.parse()?)),
        }
    }
}

impl From<AnchorMapping> for String {
    fn from(mapping: AnchorMapping) -> String {
        mapping.to_string()
    }
}

impl TryFrom<String> for AnchorMapping {
    type Error = ParseAnchorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Geometry of a placed photo.
///
/// Sizes are stored at growth level 0; the accessors apply the growth scale
/// so repeated growth never compounds rounding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    /// Wrapper top-left, board coordinates
    pub x: f64,
    pub y: f64,
    /// Rendered photo size
    pub photo_width: f64,
    pub photo_height: f64,
    /// Frame behind the photo (1.1x the photo)
    pub background_width: f64,
    pub background_height: f64,
    /// Outer box including slack for the rotated photo
    pub wrapper_width: f64,
    pub wrapper_height: f64,
    /// Rendered photo width over original pixel width
    pub scale: f64,
    pub anchor: AnchorMapping,
    pub row_index: usize,
    /// Degrees, clockwise
    pub rotation: f64,
    #[serde(default)]
    pub growth_level: u32,
}

impl Placement {
    pub fn growth_scale(&self) -> f64 {
        scale_for_level(self.growth_level)
    }

    pub fn photo_size(&self) -> (f64, f64) {
        let s = self.growth_scale();
        (self.photo_width * s, self.photo_height * s)
    }

    pub fn background_size(&self) -> (f64, f64) {
        let s = self.growth_scale();
        (self.background_width * s, self.background_height * s)
    }

    pub fn wrapper_size(&self) -> (f64, f64) {
        let s = self.growth_scale();
        (self.wrapper_width * s, self.wrapper_height * s)
    }

    /// Horizontal gap between frame edge and photo edge
    pub fn padding(&self) -> f64 {
        let (bg, _) = self.background_size();
        let (photo, _) = self.photo_size();
        (bg - photo) / 2.0
    }

    /// Collision box at the current growth level
    pub fn bounds(&self) -> Rect {
        let (w, h) = self.wrapper_size();
        Rect::new(self.x, self.y, w, h)
    }

    /// Same placement at another growth level; position is kept, so growth
    /// expands right and down from the top-left corner.
    pub fn with_growth(&self, level: u32) -> Placement {
        Placement {
            growth_level: level,
            ..self.clone()
        }
    }

    /// Convert to JSON string for catalog storage
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse from JSON string (from catalog)
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
