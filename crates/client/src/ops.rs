//! Typed spreadsheet operations.
//!
//! Each method is one [`AirScriptClient::invoke`] of a named remote procedure.
//! The names and argument keys below are the script's wire contract and must
//! not change. The script answers every call with
//! `[{"success": bool, ...}]`; `success: false` becomes
//! [`AirScriptError::Remote`], and read operations project the field they
//! need, failing with `DecodeMismatch` when it has the wrong shape.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{json, Map, Value};

use crate::address::{range_for_block, CellAddress};
use crate::client::{params, AirScriptClient};
use crate::envelope::{unwrap_singleton, Unwrapped};
use crate::error::{AirScriptError, Result};
use crate::value::{json_kind, RemoteValue, Scalar};

// ── Option types ────────────────────────────────────────────────────

/// Font settings for `setCellFont`. Unset fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FontOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub italic: Option<bool>,
    /// Color value, see [`rgb_to_excel_color`]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
}

/// Horizontal alignment constants understood by the spreadsheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HorizontalAlignment {
    General,
    Left,
    Center,
    Right,
    Fill,
    Justify,
    CenterAcrossSelection,
    Distributed,
}

impl HorizontalAlignment {
    pub fn code(self) -> i32 {
        match self {
            HorizontalAlignment::General => 1,
            HorizontalAlignment::Left => -4131,
            HorizontalAlignment::Center => -4108,
            HorizontalAlignment::Right => -4152,
            HorizontalAlignment::Fill => 5,
            HorizontalAlignment::Justify => -4130,
            HorizontalAlignment::CenterAcrossSelection => 7,
            HorizontalAlignment::Distributed => -4117,
        }
    }
}

impl Serialize for HorizontalAlignment {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_i32(self.code())
    }
}

/// Vertical alignment constants understood by the spreadsheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalAlignment {
    Top,
    Center,
    Bottom,
    Justify,
    Distributed,
}

impl VerticalAlignment {
    pub fn code(self) -> i32 {
        match self {
            VerticalAlignment::Top => -4160,
            VerticalAlignment::Center => -4108,
            VerticalAlignment::Bottom => -4107,
            VerticalAlignment::Justify => -4130,
            VerticalAlignment::Distributed => -4117,
        }
    }
}

impl Serialize for VerticalAlignment {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_i32(self.code())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AlignOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub horizontal: Option<HorizontalAlignment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vertical: Option<VerticalAlignment>,
}

/// Border line styles and weights (spreadsheet constants).
pub mod border {
    pub const CONTINUOUS: i32 = 1;
    pub const DASH: i32 = -4115;
    pub const DOT: i32 = -4118;
    pub const DOUBLE: i32 = -4119;
    pub const NONE: i32 = -4142;

    pub const HAIRLINE: i32 = 1;
    pub const THIN: i32 = 2;
    pub const MEDIUM: i32 = -4138;
    pub const THICK: i32 = 4;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BorderOptions {
    #[serde(rename = "lineStyle", skip_serializing_if = "Option::is_none")]
    pub line_style: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl Serialize for SortOrder {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u8(match self {
            SortOrder::Ascending => 1,
            SortOrder::Descending => 2,
        })
    }
}

/// Sort settings for `sortRange`. `key` is a cell in the sort column, e.g. "B1".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SortOptions {
    pub key: String,
    pub order: SortOrder,
    #[serde(rename = "hasHeader")]
    pub has_header: bool,
}

impl SortOptions {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into(), order: SortOrder::Ascending, has_header: false }
    }

    pub fn descending(mut self) -> Self {
        self.order = SortOrder::Descending;
        self
    }

    pub fn with_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }
}

/// Worksheet to delete: by name or 1-based position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SheetIdentifier {
    Name(String),
    Index(u32),
}

impl From<&str> for SheetIdentifier {
    fn from(name: &str) -> Self {
        SheetIdentifier::Name(name.to_string())
    }
}

impl From<String> for SheetIdentifier {
    fn from(name: String) -> Self {
        SheetIdentifier::Name(name)
    }
}

impl From<u32> for SheetIdentifier {
    fn from(index: u32) -> Self {
        SheetIdentifier::Index(index)
    }
}

/// RGB → the spreadsheet's BGR-packed color integer.
pub fn rgb_to_excel_color(r: u8, g: u8, b: u8) -> u32 {
    u32::from(r) + u32::from(g) * 256 + u32::from(b) * 256 * 256
}

// ── Result types ────────────────────────────────────────────────────

/// Acknowledgement of a mutating call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Ack {
    /// Message from the script, if any
    pub message: Option<String>,
}

/// One match from `findCell` / `findAllCells`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoundCell {
    pub address: String,
    #[serde(default)]
    pub value: Value,
    pub row: u32,
    pub column: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FindResult {
    pub found: bool,
    pub cells: Vec<FoundCell>,
}

// ── Operations ──────────────────────────────────────────────────────

impl AirScriptClient {
    // Cells

    pub fn get_cell_value(&self, address: &str, sheet_name: Option<&str>) -> Result<RemoteValue> {
        let op = "getCellValue";
        let out = self.invoke(op, sheet_name, params([("address", json!(address))]))?;
        let map = success_mapping(op, out)?;
        Ok(map.get("value").cloned().map(RemoteValue::from_json).unwrap_or_default())
    }

    pub fn set_cell_value(&self, address: &str, value: impl Serialize, sheet_name: Option<&str>) -> Result<Ack> {
        let op = "setCellValue";
        let value = to_json(op, value)?;
        let out = self.invoke(op, sheet_name, params([("address", json!(address)), ("value", value)]))?;
        ack(op, out)
    }

    pub fn get_range_values(&self, address: &str, sheet_name: Option<&str>) -> Result<Vec<Vec<Value>>> {
        let op = "getRangeValues";
        let out = self.invoke(op, sheet_name, params([("address", json!(address))]))?;
        let map = success_mapping(op, out)?;
        grid_field(op, &map, "values")
    }

    pub fn set_range_values<T: Serialize>(
        &self,
        address: &str,
        values: &[Vec<T>],
        sheet_name: Option<&str>,
    ) -> Result<Ack> {
        let op = "setRangeValues";
        let values = to_json(op, values)?;
        let out = self.invoke(op, sheet_name, params([("address", json!(address)), ("values", values)]))?;
        ack(op, out)
    }

    /// Write a 2D block starting at `start_cell`, sizing the target range
    /// from the block. Empty blocks and bad start cells fail before any call.
    pub fn batch_write<T: Serialize>(
        &self,
        data: &[Vec<T>],
        start_cell: &str,
        sheet_name: Option<&str>,
    ) -> Result<Ack> {
        let range = range_for_block(start_cell, data)?;
        self.set_range_values(&range.to_string(), data, sheet_name)
    }

    pub fn clear_range(&self, address: &str, sheet_name: Option<&str>) -> Result<Ack> {
        self.address_call("clearRange", address, sheet_name)
    }

    /// Clear values but keep formatting.
    pub fn clear_range_contents(&self, address: &str, sheet_name: Option<&str>) -> Result<Ack> {
        self.address_call("clearRangeContents", address, sheet_name)
    }

    pub fn get_cell_formula(&self, address: &str, sheet_name: Option<&str>) -> Result<String> {
        let op = "getCellFormula";
        let out = self.invoke(op, sheet_name, params([("address", json!(address))]))?;
        let map = success_mapping(op, out)?;
        field(op, &map, "formula", "scalar")
    }

    pub fn set_cell_formula(&self, address: &str, formula: &str, sheet_name: Option<&str>) -> Result<Ack> {
        let op = "setCellFormula";
        let out = self.invoke(op, sheet_name, params([("address", json!(address)), ("formula", json!(formula))]))?;
        ack(op, out)
    }

    // Formatting

    pub fn set_font(&self, address: &str, font: &FontOptions, sheet_name: Option<&str>) -> Result<Ack> {
        let op = "setCellFont";
        let font = to_json(op, font)?;
        let out = self.invoke(op, sheet_name, params([("address", json!(address)), ("fontOptions", font)]))?;
        ack(op, out)
    }

    pub fn set_background_color(&self, address: &str, color: u32, sheet_name: Option<&str>) -> Result<Ack> {
        let op = "setCellBackgroundColor";
        let out = self.invoke(op, sheet_name, params([("address", json!(address)), ("color", json!(color))]))?;
        ack(op, out)
    }

    pub fn set_alignment(&self, address: &str, align: &AlignOptions, sheet_name: Option<&str>) -> Result<Ack> {
        let op = "setCellAlignment";
        let align = to_json(op, align)?;
        let out = self.invoke(op, sheet_name, params([("address", json!(address)), ("alignOptions", align)]))?;
        ack(op, out)
    }

    pub fn set_border(&self, address: &str, border: &BorderOptions, sheet_name: Option<&str>) -> Result<Ack> {
        let op = "setCellBorder";
        let border = to_json(op, border)?;
        let out = self.invoke(op, sheet_name, params([("address", json!(address)), ("borderOptions", border)]))?;
        ack(op, out)
    }

    pub fn merge_cells(&self, address: &str, sheet_name: Option<&str>) -> Result<Ack> {
        self.address_call("mergeCells", address, sheet_name)
    }

    pub fn unmerge_cells(&self, address: &str, sheet_name: Option<&str>) -> Result<Ack> {
        self.address_call("unmergeCells", address, sheet_name)
    }

    /// `address` may be a column span ("A:C") or a range.
    pub fn auto_fit_columns(&self, address: &str, sheet_name: Option<&str>) -> Result<Ack> {
        self.address_call("autoFitColumns", address, sheet_name)
    }

    /// Number format such as "0.00", "#,##0", "0%" or "yyyy-mm-dd".
    pub fn set_number_format(&self, address: &str, format: &str, sheet_name: Option<&str>) -> Result<Ack> {
        let op = "setCellNumberFormat";
        let out = self.invoke(op, sheet_name, params([("address", json!(address)), ("format", json!(format))]))?;
        ack(op, out)
    }

    // Rows and columns (1-based)

    pub fn insert_rows(&self, row_index: u32, count: u32, sheet_name: Option<&str>) -> Result<Ack> {
        self.line_call("insertRows", "rowIndex", row_index, count, sheet_name)
    }

    pub fn delete_rows(&self, row_index: u32, count: u32, sheet_name: Option<&str>) -> Result<Ack> {
        self.line_call("deleteRows", "rowIndex", row_index, count, sheet_name)
    }

    /// Height in points.
    pub fn set_row_height(&self, row_index: u32, height: f64, sheet_name: Option<&str>) -> Result<Ack> {
        let op = "setRowHeight";
        check_index(op, "rowIndex", row_index)?;
        let out = self.invoke(op, sheet_name, params([("rowIndex", json!(row_index)), ("height", json!(height))]))?;
        ack(op, out)
    }

    pub fn insert_columns(&self, column_index: u32, count: u32, sheet_name: Option<&str>) -> Result<Ack> {
        self.line_call("insertColumns", "columnIndex", column_index, count, sheet_name)
    }

    pub fn delete_columns(&self, column_index: u32, count: u32, sheet_name: Option<&str>) -> Result<Ack> {
        self.line_call("deleteColumns", "columnIndex", column_index, count, sheet_name)
    }

    /// Width in characters.
    pub fn set_column_width(&self, column_index: u32, width: f64, sheet_name: Option<&str>) -> Result<Ack> {
        let op = "setColumnWidth";
        check_index(op, "columnIndex", column_index)?;
        let out = self.invoke(
            op,
            sheet_name,
            params([("columnIndex", json!(column_index)), ("width", json!(width))]),
        )?;
        ack(op, out)
    }

    // Search

    pub fn find_cell(&self, search_text: &str, search_range: &str, sheet_name: Option<&str>) -> Result<FindResult> {
        let op = "findCell";
        let out = self.invoke(op, sheet_name, search_params(search_text, search_range))?;
        let map = success_mapping(op, out)?;
        Ok(FindResult {
            found: field(op, &map, "found", "scalar")?,
            cells: field(op, &map, "cells", "sequence")?,
        })
    }

    pub fn find_all_cells(
        &self,
        search_text: &str,
        search_range: &str,
        sheet_name: Option<&str>,
    ) -> Result<Vec<FoundCell>> {
        let op = "findAllCells";
        let out = self.invoke(op, sheet_name, search_params(search_text, search_range))?;
        let map = success_mapping(op, out)?;
        field(op, &map, "cells", "sequence")
    }

    /// Replace text in a range; returns how many cells matched.
    pub fn replace_in_range(
        &self,
        search_text: &str,
        replace_text: &str,
        search_range: &str,
        sheet_name: Option<&str>,
    ) -> Result<u64> {
        let op = "replaceInRangeWithCount";
        let mut args = search_params(search_text, search_range);
        args.insert("replaceText".into(), json!(replace_text));
        let out = self.invoke(op, sheet_name, args)?;
        let map = success_mapping(op, out)?;
        field(op, &map, "count", "scalar")
    }

    // Sort, copy, paste

    pub fn sort_range(&self, address: &str, sort: &SortOptions, sheet_name: Option<&str>) -> Result<Ack> {
        let op = "sortRange";
        CellAddress::parse(&sort.key)?;
        let sort = to_json(op, sort)?;
        let out = self.invoke(op, sheet_name, params([("address", json!(address)), ("sortOptions", sort)]))?;
        ack(op, out)
    }

    pub fn copy_paste_range(
        &self,
        source_address: &str,
        target_address: &str,
        sheet_name: Option<&str>,
    ) -> Result<Ack> {
        let op = "copyPasteRange";
        let out = self.invoke(
            op,
            sheet_name,
            params([("sourceAddress", json!(source_address)), ("targetAddress", json!(target_address))]),
        )?;
        ack(op, out)
    }

    pub fn copy_range(&self, source_address: &str, sheet_name: Option<&str>) -> Result<Ack> {
        let op = "copyRange";
        let out = self.invoke(op, sheet_name, params([("sourceAddress", json!(source_address))]))?;
        ack(op, out)
    }

    pub fn paste_to_range(&self, target_address: &str, sheet_name: Option<&str>) -> Result<Ack> {
        let op = "pasteToRange";
        let out = self.invoke(op, sheet_name, params([("targetAddress", json!(target_address))]))?;
        ack(op, out)
    }

    // Workbook and worksheets

    pub fn get_worksheet_count(&self) -> Result<u32> {
        let op = "getWorksheetCount";
        let out = self.invoke(op, None, Map::new())?;
        let map = success_mapping(op, out)?;
        field(op, &map, "count", "scalar")
    }

    /// Names of all worksheets, in workbook order.
    pub fn get_workbook_sheets(&self) -> Result<Vec<String>> {
        let op = "getWorkbookName";
        let out = self.invoke(op, None, Map::new())?;
        let map = success_mapping(op, out)?;
        field(op, &map, "sheets", "sequence")
    }

    pub fn get_used_range_data(&self, sheet_name: Option<&str>) -> Result<Vec<Vec<Value>>> {
        let op = "getUsedRangeData";
        let out = self.invoke(op, sheet_name, Map::new())?;
        let map = success_mapping(op, out)?;
        grid_field(op, &map, "data")
    }

    /// Add a worksheet; returns the name it ended up with.
    pub fn add_worksheet(&self, sheet_name: Option<&str>) -> Result<String> {
        let op = "addWorksheet";
        let out = self.invoke(op, None, params([("sheetName", json!(sheet_name))]))?;
        let map = success_mapping(op, out)?;
        field(op, &map, "sheetName", "scalar")
    }

    pub fn delete_worksheet(&self, sheet: impl Into<SheetIdentifier>) -> Result<Ack> {
        let op = "deleteWorksheet";
        let sheet = to_json(op, sheet.into())?;
        let out = self.invoke(op, None, params([("sheetIdentifier", sheet)]))?;
        ack(op, out)
    }

    /// Whether a worksheet matching `sheet_name` exists. The script also
    /// matches on substrings.
    pub fn worksheet_exists(&self, sheet_name: &str) -> Result<bool> {
        let op = "worksheetExists";
        let out = self.invoke(op, None, params([("sheetName", json!(sheet_name))]))?;
        let map = success_mapping(op, out)?;
        field(op, &map, "exists", "scalar")
    }

    // ── Internal helpers ────────────────────────────────────────────

    fn address_call(&self, op: &str, address: &str, sheet_name: Option<&str>) -> Result<Ack> {
        let out = self.invoke(op, sheet_name, params([("address", json!(address))]))?;
        ack(op, out)
    }

    fn line_call(&self, op: &str, index_key: &str, index: u32, count: u32, sheet_name: Option<&str>) -> Result<Ack> {
        check_index(op, index_key, index)?;
        if count == 0 {
            return Err(AirScriptError::InvalidArgument(format!("{}: count must be at least 1", op)));
        }
        let out = self.invoke(op, sheet_name, params([(index_key, json!(index)), ("count", json!(count))]))?;
        ack(op, out)
    }
}

// ── Free helpers ────────────────────────────────────────────────────

fn search_params(search_text: &str, search_range: &str) -> Map<String, Value> {
    params([("searchText", json!(search_text)), ("searchRange", json!(search_range))])
}

fn check_index(op: &str, key: &str, index: u32) -> Result<()> {
    if index == 0 {
        return Err(AirScriptError::InvalidArgument(format!("{}: {} is 1-based", op, key)));
    }
    Ok(())
}

fn to_json(op: &str, value: impl Serialize) -> Result<Value> {
    serde_json::to_value(value)
        .map_err(|e| AirScriptError::InvalidArgument(format!("{}: cannot encode argument: {}", op, e)))
}

/// Fail with `Remote` when the script reported `success: false`.
fn check_success(op: &str, map: &Map<String, Value>) -> Result<()> {
    if map.get("success") != Some(&Value::Bool(false)) {
        return Ok(());
    }
    let message = map
        .get("error")
        .or_else(|| map.get("message"))
        .and_then(Value::as_str)
        .unwrap_or("unknown error")
        .to_string();
    Err(AirScriptError::Remote { operation: op.to_string(), message })
}

/// Reduce to the result mapping of a read operation.
fn success_mapping(op: &str, out: Unwrapped) -> Result<Map<String, Value>> {
    let map = unwrap_singleton(out.into_value()).expect_mapping(op)?;
    check_success(op, &map)?;
    Ok(map)
}

fn ack(op: &str, out: Unwrapped) -> Result<Ack> {
    let value = match out {
        Unwrapped::NoValue(_) => return Ok(Ack::default()),
        Unwrapped::Fallback(text) => return Ok(Ack { message: Some(text) }),
        Unwrapped::Decoded(value) => unwrap_singleton(value),
    };

    match value {
        RemoteValue::Absent => Ok(Ack::default()),
        RemoteValue::Scalar(Scalar::Text(text)) => Ok(Ack { message: Some(text) }),
        RemoteValue::Mapping(map) => {
            check_success(op, &map)?;
            Ok(Ack {
                message: map.get("message").and_then(Value::as_str).map(String::from),
            })
        }
        other => Err(AirScriptError::mismatch(op, "mapping", other.kind())),
    }
}

fn field<T: DeserializeOwned>(op: &str, map: &Map<String, Value>, key: &str, expected: &'static str) -> Result<T> {
    let value = map.get(key).unwrap_or(&Value::Null);
    serde_json::from_value(value.clone()).map_err(|e| {
        log::debug!("{}: field {:?} did not decode: {}", op, key, e);
        AirScriptError::DecodeMismatch {
            operation: format!("{}.{}", op, key),
            expected,
            actual: json_kind(value),
        }
    })
}

/// A 2D grid field. The script returns a bare scalar for one-cell ranges
/// and `null` for empty ones; both are normalised to a grid.
fn grid_field(op: &str, map: &Map<String, Value>, key: &str) -> Result<Vec<Vec<Value>>> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(rows)) if rows.iter().all(Value::is_array) => field(op, map, key, "sequence"),
        Some(Value::Array(cells)) => Ok(vec![cells.clone()]),
        Some(scalar) => Ok(vec![vec![scalar.clone()]]),
    }
}
