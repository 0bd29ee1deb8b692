//! Shared report types.
//!
//! These are the inputs of a single generation request. They are supplied once
//! by the caller and never mutated while a report is being rendered.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Free-text report metadata shown on the first page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportMetadata {
    pub institution: String,
    pub motive: String,
    pub process_number: String,
    pub address: String,
    pub date: String,
    pub comments: String,
}

/// Clockwise rotation applied to a photo before it is embedded.
///
/// Serialized as the plain angle (`0`, `90`, `180`, `270`); any other value is
/// rejected on deserialization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum Rotation {
    #[default]
    None,
    Quarter,
    Half,
    ThreeQuarter,
}

impl Rotation {
    pub fn degrees(self) -> u16 {
        match self {
            Rotation::None => 0,
            Rotation::Quarter => 90,
            Rotation::Half => 180,
            Rotation::ThreeQuarter => 270,
        }
    }

    /// True when the rotation swaps width and height.
    pub fn swaps_axes(self) -> bool {
        matches!(self, Rotation::Quarter | Rotation::ThreeQuarter)
    }
}

impl TryFrom<u16> for Rotation {
    type Error = String;

    fn try_from(degrees: u16) -> Result<Self, Self::Error> {
        match degrees {
            0 => Ok(Rotation::None),
            90 => Ok(Rotation::Quarter),
            180 => Ok(Rotation::Half),
            270 => Ok(Rotation::ThreeQuarter),
            other => Err(format!("rotation must be 0, 90, 180 or 270 (got {other})")),
        }
    }
}

impl From<Rotation> for u16 {
    fn from(rotation: Rotation) -> Self {
        rotation.degrees()
    }
}

/// One photo of the report, in document order.
///
/// The position of a record in the photo list is its figure number (1-based);
/// the `id` stays stable when the caller reorders the list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoRecord {
    pub id: String,
    pub source: Vec<u8>,
    pub description: String,
    pub rotation: Rotation,
}

/// Number of figures placed side by side in one row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Columns {
    One,
    #[default]
    Two,
    Three,
}

impl Columns {
    pub fn count(self) -> usize {
        match self {
            Columns::One => 1,
            Columns::Two => 2,
            Columns::Three => 3,
        }
    }
}

impl TryFrom<u8> for Columns {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Columns::One),
            2 => Ok(Columns::Two),
            3 => Ok(Columns::Three),
            other => Err(format!("columns must be 1, 2 or 3 (got {other})")),
        }
    }
}

impl From<Columns> for u8 {
    fn from(columns: Columns) -> Self {
        columns.count() as u8
    }
}

impl fmt::Display for Columns {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.count())
    }
}

/// Whether a visible rule is drawn around each cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellStyle {
    Plain,
    #[default]
    Bordered,
}

impl CellStyle {
    pub fn is_bordered(self) -> bool {
        self == CellStyle::Bordered
    }
}

impl fmt::Display for CellStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellStyle::Plain => f.write_str("plain"),
            CellStyle::Bordered => f.write_str("bordered"),
        }
    }
}

/// Outline of the rule drawn around bordered cells.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BorderShape {
    #[default]
    Rounded,
    Square,
}

/// Binary artifact formats produced for a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    /// Fixed-page document with explicit page breaks.
    Pdf,
    /// Flow document paginated by the word processor that opens it.
    Docx,
}

impl DocumentFormat {
    pub fn extension(self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::Docx => "docx",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub columns: Columns,
    pub style: CellStyle,
}
