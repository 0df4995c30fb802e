//! Subcommand implementations. Each resolves the connection, makes one or
//! more client calls, and prints JSON on stdout.

use std::io::{self, Write};
use std::path::PathBuf;

use clap::{Args, ValueEnum};
use serde::Serialize;
use serde_json::{json, Map, Value};

use airsheet_client::{
    border, AirScriptClient, AlignOptions, BorderOptions, ClientConfig, FontOptions,
    HorizontalAlignment, SheetIdentifier, SortOptions, VerticalAlignment,
};

use crate::grid::{self, GridFormat};
use crate::{CliError, ColCommands, ConnectionArgs, RowCommands, SheetCommands};

fn connect(conn: &ConnectionArgs) -> Result<AirScriptClient, CliError> {
    let cfg = conn.resolve()?;
    Ok(AirScriptClient::new(cfg)?)
}

fn print_json(value: &impl Serialize) -> Result<(), CliError> {
    grid::write_json(value, io::stdout().lock())
}

// ============================================================================
// Connection
// ============================================================================

pub fn cmd_login(conn: &ConnectionArgs, no_verify: bool) -> Result<(), CliError> {
    // Login replaces a broken config file instead of failing on it.
    let base = match airsheet_client::load_config() {
        Ok(saved) => saved,
        Err(e) => {
            eprintln!("warning: ignoring saved config: {}", e);
            None
        }
    };
    let cfg = conn.merge_into(base.unwrap_or_else(|| ClientConfig::new("", "", "")));
    cfg.validate().map_err(|e| {
        CliError::from(e).with_hint("pass --file-id, --script-id and --token (or the AIRSCRIPT_* variables)")
    })?;

    if !no_verify {
        let client = AirScriptClient::new(cfg.clone())?;
        let count = client.get_worksheet_count()?;
        eprintln!("Connected: workbook has {} worksheet(s)", count);
    }

    let path = airsheet_client::save_config(&cfg)?;
    eprintln!("Saved config to {}", path.display());
    Ok(())
}

pub fn cmd_logout() -> Result<(), CliError> {
    airsheet_client::delete_config()?;
    eprintln!("Logged out");
    Ok(())
}

pub fn cmd_config(conn: &ConnectionArgs) -> Result<(), CliError> {
    let cfg = conn.resolve()?;
    print_json(&json!({
        "base_url": cfg.base_url,
        "file_id": cfg.file_id,
        "script_id": cfg.script_id,
        "token": mask_token(&cfg.token),
        "timeout_secs": cfg.timeout_secs,
        "endpoint": cfg.endpoint(),
    }))
}

fn mask_token(token: &str) -> String {
    let visible: String = token.chars().take(4).collect();
    if token.chars().count() <= 8 {
        "****".to_string()
    } else {
        format!("{}****", visible)
    }
}

// ============================================================================
// Cells and ranges
// ============================================================================

pub fn cmd_get(conn: &ConnectionArgs, address: &str, sheet: Option<&str>) -> Result<(), CliError> {
    let client = connect(conn)?;
    let value = client.get_cell_value(address, sheet)?;
    print_json(&value.into_json())
}

pub fn cmd_set(
    conn: &ConnectionArgs,
    address: &str,
    raw: &str,
    force_text: bool,
    sheet: Option<&str>,
) -> Result<(), CliError> {
    let client = connect(conn)?;
    let value = grid::parse_cli_value(raw, force_text);
    let ack = client.set_cell_value(address, &value, sheet)?;
    print_json(&ack)
}

pub fn cmd_read(conn: &ConnectionArgs, range: &str, to: GridFormat, sheet: Option<&str>) -> Result<(), CliError> {
    let client = connect(conn)?;
    let rows = client.get_range_values(range, sheet)?;
    grid::write_grid(&rows, to, io::stdout().lock())
}

pub fn cmd_write(
    conn: &ConnectionArgs,
    input: Option<PathBuf>,
    from: Option<GridFormat>,
    start: &str,
    all_text: bool,
    sheet: Option<&str>,
) -> Result<(), CliError> {
    let format = grid::resolve_format(input.as_deref(), from)?;
    let rows = grid::read_grid(input.as_ref(), format, all_text)?;
    let range = airsheet_client::range_for_block(start, &rows)?;
    let client = connect(conn)?;
    client.batch_write(&rows, start, sheet)?;
    print_json(&json!({
        "range": range.to_string(),
        "rows": range.rows(),
        "columns": range.columns(),
    }))
}

pub fn cmd_clear(conn: &ConnectionArgs, range: &str, contents_only: bool, sheet: Option<&str>) -> Result<(), CliError> {
    let client = connect(conn)?;
    let ack = if contents_only {
        client.clear_range_contents(range, sheet)?
    } else {
        client.clear_range(range, sheet)?
    };
    print_json(&ack)
}

pub fn cmd_formula(
    conn: &ConnectionArgs,
    address: &str,
    formula: Option<&str>,
    sheet: Option<&str>,
) -> Result<(), CliError> {
    let client = connect(conn)?;
    match formula {
        Some(f) => print_json(&client.set_cell_formula(address, f, sheet)?),
        None => print_json(&client.get_cell_formula(address, sheet)?),
    }
}

// ============================================================================
// Formatting
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AlignArg {
    General,
    Left,
    Center,
    Right,
    Fill,
    Justify,
    CenterAcross,
    Distributed,
}

impl From<AlignArg> for HorizontalAlignment {
    fn from(a: AlignArg) -> Self {
        match a {
            AlignArg::General => HorizontalAlignment::General,
            AlignArg::Left => HorizontalAlignment::Left,
            AlignArg::Center => HorizontalAlignment::Center,
            AlignArg::Right => HorizontalAlignment::Right,
            AlignArg::Fill => HorizontalAlignment::Fill,
            AlignArg::Justify => HorizontalAlignment::Justify,
            AlignArg::CenterAcross => HorizontalAlignment::CenterAcrossSelection,
            AlignArg::Distributed => HorizontalAlignment::Distributed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ValignArg {
    Top,
    Center,
    Bottom,
    Justify,
    Distributed,
}

impl From<ValignArg> for VerticalAlignment {
    fn from(a: ValignArg) -> Self {
        match a {
            ValignArg::Top => VerticalAlignment::Top,
            ValignArg::Center => VerticalAlignment::Center,
            ValignArg::Bottom => VerticalAlignment::Bottom,
            ValignArg::Justify => VerticalAlignment::Justify,
            ValignArg::Distributed => VerticalAlignment::Distributed,
        }
    }
}

/// Border presets: line style plus weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BorderArg {
    Hairline,
    Thin,
    Medium,
    Thick,
    Dash,
    Dot,
    Double,
    None,
}

impl BorderArg {
    fn options(self) -> BorderOptions {
        let (line_style, weight) = match self {
            BorderArg::Hairline => (border::CONTINUOUS, Some(border::HAIRLINE)),
            BorderArg::Thin => (border::CONTINUOUS, Some(border::THIN)),
            BorderArg::Medium => (border::CONTINUOUS, Some(border::MEDIUM)),
            BorderArg::Thick => (border::CONTINUOUS, Some(border::THICK)),
            BorderArg::Dash => (border::DASH, Some(border::THIN)),
            BorderArg::Dot => (border::DOT, Some(border::THIN)),
            BorderArg::Double => (border::DOUBLE, None),
            BorderArg::None => (border::NONE, None),
        };
        BorderOptions { line_style: Some(line_style), weight, color: None }
    }
}

#[derive(Args, Debug)]
pub struct FormatArgs {
    /// Range to format, e.g. A1:D1
    pub range: String,

    /// Number format code, e.g. "0.00" or "yyyy-mm-dd"
    #[arg(long)]
    pub number: Option<String>,

    /// Background color
    #[arg(long, value_name = "#RRGGBB")]
    pub bg: Option<String>,

    #[arg(long)]
    pub bold: bool,

    #[arg(long)]
    pub italic: bool,

    #[arg(long)]
    pub font_name: Option<String>,

    #[arg(long)]
    pub font_size: Option<f64>,

    #[arg(long, value_name = "#RRGGBB")]
    pub font_color: Option<String>,

    /// Horizontal alignment
    #[arg(long, value_enum)]
    pub align: Option<AlignArg>,

    /// Vertical alignment
    #[arg(long, value_enum)]
    pub valign: Option<ValignArg>,

    /// Border around every cell of the range
    #[arg(long, value_enum)]
    pub border: Option<BorderArg>,

    #[arg(long, value_name = "#RRGGBB", requires = "border")]
    pub border_color: Option<String>,

    /// Fit column widths to the contents
    #[arg(long)]
    pub autofit: bool,
}

impl FormatArgs {
    fn font(&self) -> Result<Option<FontOptions>, CliError> {
        let font = FontOptions {
            name: self.font_name.clone(),
            size: self.font_size,
            bold: self.bold.then_some(true),
            italic: self.italic.then_some(true),
            color: self.font_color.as_deref().map(grid::parse_hex_color).transpose()?,
        };
        Ok((font != FontOptions::default()).then_some(font))
    }

    fn alignment(&self) -> Option<AlignOptions> {
        let align = AlignOptions {
            horizontal: self.align.map(Into::into),
            vertical: self.valign.map(Into::into),
        };
        (align != AlignOptions::default()).then_some(align)
    }

    fn border(&self) -> Result<Option<BorderOptions>, CliError> {
        let Some(preset) = self.border else {
            return Ok(None);
        };
        let mut options = preset.options();
        options.color = self.border_color.as_deref().map(grid::parse_hex_color).transpose()?;
        Ok(Some(options))
    }
}

pub fn cmd_format(conn: &ConnectionArgs, args: &FormatArgs, sheet: Option<&str>) -> Result<(), CliError> {
    // All options are parsed before the first call.
    let font = args.font()?;
    let align = args.alignment();
    let border = args.border()?;
    let bg = args.bg.as_deref().map(grid::parse_hex_color).transpose()?;

    if font.is_none() && align.is_none() && border.is_none() && bg.is_none() && args.number.is_none() && !args.autofit {
        return Err(CliError::args("nothing to format")
            .with_hint("pass at least one of --number, --bg, --bold, --align, --border, --autofit"));
    }

    let client = connect(conn)?;
    let range = args.range.as_str();
    let mut applied = Vec::new();

    if let Some(format) = &args.number {
        client.set_number_format(range, format, sheet)?;
        applied.push("number");
    }
    if let Some(color) = bg {
        client.set_background_color(range, color, sheet)?;
        applied.push("background");
    }
    if let Some(font) = &font {
        client.set_font(range, font, sheet)?;
        applied.push("font");
    }
    if let Some(align) = &align {
        client.set_alignment(range, align, sheet)?;
        applied.push("alignment");
    }
    if let Some(border) = &border {
        client.set_border(range, border, sheet)?;
        applied.push("border");
    }
    if args.autofit {
        client.auto_fit_columns(range, sheet)?;
        applied.push("autofit");
    }

    print_json(&json!({ "range": range, "applied": applied }))
}

pub fn cmd_merge(conn: &ConnectionArgs, range: &str, undo: bool, sheet: Option<&str>) -> Result<(), CliError> {
    let client = connect(conn)?;
    let ack = if undo {
        client.unmerge_cells(range, sheet)?
    } else {
        client.merge_cells(range, sheet)?
    };
    print_json(&ack)
}

// ============================================================================
// Rows and columns
// ============================================================================

pub fn cmd_rows(conn: &ConnectionArgs, command: RowCommands, sheet: Option<&str>) -> Result<(), CliError> {
    let client = connect(conn)?;
    let ack = match command {
        RowCommands::Insert { row, count } => client.insert_rows(row, count, sheet)?,
        RowCommands::Delete { row, count } => client.delete_rows(row, count, sheet)?,
        RowCommands::Height { row, height } => client.set_row_height(row, height, sheet)?,
    };
    print_json(&ack)
}

pub fn cmd_cols(conn: &ConnectionArgs, command: ColCommands, sheet: Option<&str>) -> Result<(), CliError> {
    // Column arguments are checked before connecting.
    let column = match &command {
        ColCommands::Insert { column, .. } | ColCommands::Delete { column, .. } | ColCommands::Width { column, .. } => {
            Some(grid::parse_column(column)?)
        }
        ColCommands::Autofit { .. } => None,
    };
    let client = connect(conn)?;
    let ack = match (command, column) {
        (ColCommands::Insert { count, .. }, Some(col)) => client.insert_columns(col, count, sheet)?,
        (ColCommands::Delete { count, .. }, Some(col)) => client.delete_columns(col, count, sheet)?,
        (ColCommands::Width { width, .. }, Some(col)) => client.set_column_width(col, width, sheet)?,
        (ColCommands::Autofit { range }, _) => client.auto_fit_columns(&range, sheet)?,
        (_, None) => return Err(CliError::args("missing column")),
    };
    print_json(&ack)
}

// ============================================================================
// Search, sort, copy
// ============================================================================

pub fn cmd_find(
    conn: &ConnectionArgs,
    text: &str,
    range: &str,
    first: bool,
    sheet: Option<&str>,
) -> Result<(), CliError> {
    let client = connect(conn)?;
    if first {
        print_json(&client.find_cell(text, range, sheet)?)
    } else {
        let cells = client.find_all_cells(text, range, sheet)?;
        print_json(&json!({ "found": !cells.is_empty(), "cells": cells }))
    }
}

pub fn cmd_replace(
    conn: &ConnectionArgs,
    find: &str,
    replace: &str,
    range: &str,
    sheet: Option<&str>,
) -> Result<(), CliError> {
    let client = connect(conn)?;
    let count = client.replace_in_range(find, replace, range, sheet)?;
    print_json(&json!({ "count": count }))
}

pub fn cmd_sort(
    conn: &ConnectionArgs,
    range: &str,
    key: &str,
    desc: bool,
    header: bool,
    sheet: Option<&str>,
) -> Result<(), CliError> {
    let mut options = SortOptions::new(key).with_header(header);
    if desc {
        options = options.descending();
    }
    let client = connect(conn)?;
    print_json(&client.sort_range(range, &options, sheet)?)
}

pub fn cmd_copy(conn: &ConnectionArgs, source: &str, target: Option<&str>, sheet: Option<&str>) -> Result<(), CliError> {
    let client = connect(conn)?;
    let ack = match target {
        Some(target) => client.copy_paste_range(source, target, sheet)?,
        None => client.copy_range(source, sheet)?,
    };
    print_json(&ack)
}

pub fn cmd_paste(conn: &ConnectionArgs, target: &str, sheet: Option<&str>) -> Result<(), CliError> {
    let client = connect(conn)?;
    print_json(&client.paste_to_range(target, sheet)?)
}

// ============================================================================
// Worksheets
// ============================================================================

pub fn cmd_sheets(conn: &ConnectionArgs, command: SheetCommands) -> Result<(), CliError> {
    let client = connect(conn)?;
    match command {
        SheetCommands::List => print_json(&client.get_workbook_sheets()?),
        SheetCommands::Count => print_json(&client.get_worksheet_count()?),
        SheetCommands::Add { name } => {
            let name = client.add_worksheet(name.as_deref().filter(|n| !n.is_empty()))?;
            print_json(&json!({ "sheetName": name }))
        }
        SheetCommands::Delete { identifier } => {
            print_json(&client.delete_worksheet(sheet_identifier(&identifier))?)
        }
        SheetCommands::Exists { name } => print_json(&client.worksheet_exists(&name)?),
    }
}

/// All-digit identifiers are 1-based positions, anything else is a name.
fn sheet_identifier(raw: &str) -> SheetIdentifier {
    match raw.parse::<u32>() {
        Ok(index) if !raw.starts_with('+') => SheetIdentifier::Index(index),
        _ => SheetIdentifier::Name(raw.to_string()),
    }
}

pub fn cmd_used_range(conn: &ConnectionArgs, to: GridFormat, sheet: Option<&str>) -> Result<(), CliError> {
    let client = connect(conn)?;
    let rows = client.get_used_range_data(sheet)?;
    grid::write_grid(&rows, to, io::stdout().lock())
}

// ============================================================================
// Raw call
// ============================================================================

pub fn cmd_call(conn: &ConnectionArgs, function: &str, args: &[String], sheet: Option<&str>) -> Result<(), CliError> {
    let params = parse_call_args(args)?;
    let client = connect(conn)?;
    let out = client.invoke(function, sheet, params)?;
    let mut stdout = io::stdout().lock();
    grid::write_json(&out.into_json(), &mut stdout)?;
    stdout.flush().map_err(|e| CliError::io(e.to_string()))
}

fn parse_call_args(args: &[String]) -> Result<Map<String, Value>, CliError> {
    let mut params = Map::new();
    for arg in args {
        let Some((key, raw)) = arg.split_once('=') else {
            return Err(CliError::args(format!("invalid --arg {:?}, expected key=value", arg)));
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(CliError::args(format!("invalid --arg {:?}, empty key", arg)));
        }
        params.insert(key.to_string(), grid::parse_cli_value(raw, false));
    }
    Ok(params)
}
