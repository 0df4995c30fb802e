//! A1-style address arithmetic.
//!
//! Columns use bijective base-26 (A=1 … Z=26, AA=27 …): there is no zero
//! digit, so the conversions are not plain radix changes. Rows are 1-based.
//! Everything here is pure and runs before any request is built.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{AirScriptError, Result};

static CELL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z]+)([0-9]+)$").expect("cell address pattern"));

/// Convert column letters ("A", "ab", "XFD") to a 1-based column number.
pub fn column_letter_to_number(letters: &str) -> Result<u32> {
    if letters.is_empty() {
        return Err(AirScriptError::InvalidAddress("empty column letters".into()));
    }

    let mut col: u32 = 0;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return Err(AirScriptError::InvalidAddress(format!(
                "{:?} is not a column (bad character {:?})",
                letters, c
            )));
        }
        let digit = u32::from(c.to_ascii_uppercase() as u8 - b'A' + 1);
        col = col
            .checked_mul(26)
            .and_then(|v| v.checked_add(digit))
            .ok_or_else(|| AirScriptError::InvalidAddress(format!("column {:?} is too large", letters)))?;
    }
    Ok(col)
}

/// Convert a 1-based column number to its letters (1 → "A", 27 → "AA").
pub fn column_number_to_letter(n: u32) -> Result<String> {
    if n == 0 {
        return Err(AirScriptError::InvalidAddress("column numbers start at 1".into()));
    }

    let mut result = String::new();
    let mut n = n;
    while n > 0 {
        let rem = (n - 1) % 26;
        result.insert(0, (b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    Ok(result)
}

/// A single cell, e.g. `AB12`. Both coordinates are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellAddress {
    pub column: u32,
    pub row: u32,
}

impl CellAddress {
    pub fn new(column: u32, row: u32) -> Result<Self> {
        if column == 0 || row == 0 {
            return Err(AirScriptError::InvalidAddress(format!(
                "cell coordinates are 1-based (got column {}, row {})",
                column, row
            )));
        }
        Ok(Self { column, row })
    }

    /// Parse `<letters><digits>`, case-insensitive. Anything else is rejected.
    pub fn parse(s: &str) -> Result<Self> {
        let caps = CELL_RE
            .captures(s.trim())
            .ok_or_else(|| AirScriptError::InvalidAddress(format!("{:?} is not a cell address", s)))?;

        let column = column_letter_to_number(&caps[1])?;
        let row: u32 = caps[2]
            .parse()
            .map_err(|_| AirScriptError::InvalidAddress(format!("row in {:?} is out of range", s)))?;
        Self::new(column, row)
    }

    /// Letters for this cell's column.
    pub fn column_letters(&self) -> String {
        // column >= 1 is upheld by every constructor
        column_number_to_letter(self.column).unwrap_or_default()
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.column_letters(), self.row)
    }
}

/// Inclusive rectangle, top-left to bottom-right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RangeAddress {
    pub start: CellAddress,
    pub end: CellAddress,
}

impl RangeAddress {
    pub fn new(start: CellAddress, end: CellAddress) -> Result<Self> {
        if start.column > end.column || start.row > end.row {
            return Err(AirScriptError::InvalidAddress(format!(
                "range {}:{} is not ordered top-left to bottom-right",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// Parse `A1:B3`. A lone cell is accepted as a one-cell range.
    pub fn parse(s: &str) -> Result<Self> {
        match s.split_once(':') {
            Some((a, b)) => Self::new(CellAddress::parse(a)?, CellAddress::parse(b)?),
            None => {
                let cell = CellAddress::parse(s)?;
                Ok(Self { start: cell, end: cell })
            }
        }
    }

    pub fn rows(&self) -> u32 {
        self.end.row - self.start.row + 1
    }

    pub fn columns(&self) -> u32 {
        self.end.column - self.start.column + 1
    }
}

impl fmt::Display for RangeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start, self.end)
    }
}

/// Range covering `row_count` × `col_count` cells anchored at `start_cell`.
pub fn compute_range(start_cell: &str, row_count: usize, col_count: usize) -> Result<RangeAddress> {
    if row_count == 0 || col_count == 0 {
        return Err(AirScriptError::EmptyData(format!(
            "cannot size a range of {} rows x {} columns",
            row_count, col_count
        )));
    }

    let start = CellAddress::parse(start_cell)?;
    let end = CellAddress::new(
        offset(start.column, col_count, start_cell)?,
        offset(start.row, row_count, start_cell)?,
    )?;
    RangeAddress::new(start, end)
}

/// Range a 2D block would occupy when written at `start_cell`.
///
/// The column count comes from the first row, matching how the block is
/// sent to `setRangeValues`.
pub fn range_for_block<T>(start_cell: &str, block: &[Vec<T>]) -> Result<RangeAddress> {
    let rows = block.len();
    let cols = block.first().map(Vec::len).unwrap_or(0);
    compute_range(start_cell, rows, cols)
}

fn offset(base: u32, count: usize, start_cell: &str) -> Result<u32> {
    u32::try_from(count - 1)
        .ok()
        .and_then(|extra| base.checked_add(extra))
        .ok_or_else(|| AirScriptError::InvalidAddress(format!("range from {:?} runs off the sheet", start_cell)))
}
