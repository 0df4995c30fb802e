//! Grid input/output for `airsheet read` / `airsheet write`.
//!
//! Input grids come from CSV or JSON (array of row arrays). CSV fields in
//! plain decimal notation or spelled as booleans are sent as such; anything
//! that would not survive the conversion (leading zeros, exponents, too many
//! digits) stays text.
//! Ragged rows are padded with empty strings so the block stays rectangular.

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde_json::Value;

use airsheet_client::{column_letter_to_number, rgb_to_excel_color};

use crate::CliError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GridFormat {
    Csv,
    Tsv,
    Json,
}

impl GridFormat {
    fn delimiter(self) -> u8 {
        match self {
            GridFormat::Tsv => b'\t',
            _ => b',',
        }
    }
}

/// Pick the input format: explicit flag wins, then the file extension.
pub fn resolve_format(path: Option<&Path>, explicit: Option<GridFormat>) -> Result<GridFormat, CliError> {
    if let Some(fmt) = explicit {
        return Ok(fmt);
    }
    let Some(path) = path else {
        return Err(CliError::args("stdin requires --from to specify the input format")
            .with_hint("use --from csv, --from tsv or --from json"));
    };
    match path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase()).as_deref() {
        Some("csv") => Ok(GridFormat::Csv),
        Some("tsv") | Some("tab") => Ok(GridFormat::Tsv),
        Some("json") => Ok(GridFormat::Json),
        _ => Err(CliError::args(format!(
            "cannot infer format of {}; pass --from",
            path.display()
        ))),
    }
}

/// Read a grid from `path`, or stdin when `path` is None. With `all_text`,
/// CSV/TSV fields are never converted.
pub fn read_grid(path: Option<&PathBuf>, format: GridFormat, all_text: bool) -> Result<Vec<Vec<Value>>, CliError> {
    let text = match path {
        Some(p) => std::fs::read_to_string(p)
            .map_err(|e| CliError::args(format!("{}: {}", p.display(), e)))?,
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .map_err(|e| CliError::args(format!("cannot read stdin: {}", e)))?;
            buf
        }
    };
    parse_grid(&text, format, all_text)
}

pub fn parse_grid(text: &str, format: GridFormat, all_text: bool) -> Result<Vec<Vec<Value>>, CliError> {
    let rows = match format {
        GridFormat::Json => parse_json_grid(text)?,
        GridFormat::Csv | GridFormat::Tsv => parse_delimited_grid(text, format.delimiter(), all_text)?,
    };
    Ok(pad_rows(rows))
}

fn parse_json_grid(text: &str) -> Result<Vec<Vec<Value>>, CliError> {
    let value: Value = serde_json::from_str(text).map_err(|e| CliError::args(format!("invalid JSON: {}", e)))?;
    let Value::Array(rows) = value else {
        return Err(CliError::args("JSON input must be an array of row arrays"));
    };
    rows.into_iter()
        .enumerate()
        .map(|(i, row)| match row {
            Value::Array(cells) => Ok(cells),
            _ => Err(CliError::args(format!("JSON row {} is not an array", i + 1))),
        })
        .collect()
}

fn parse_delimited_grid(text: &str, delimiter: u8, all_text: bool) -> Result<Vec<Vec<Value>>, CliError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| CliError::args(format!("invalid CSV: {}", e)))?;
        rows.push(
            record
                .iter()
                .map(|field| if all_text { Value::String(field.to_string()) } else { parse_field(field) })
                .collect(),
        );
    }
    Ok(rows)
}

fn pad_rows(mut rows: Vec<Vec<Value>>) -> Vec<Vec<Value>> {
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    for row in &mut rows {
        row.resize(width, Value::String(String::new()));
    }
    rows
}

/// Interpret one CSV field.
fn parse_field(field: &str) -> Value {
    let trimmed = field.trim();
    if let Some(n) = parse_plain_number(trimmed) {
        return n;
    }
    match trimmed {
        "TRUE" | "true" => Value::Bool(true),
        "FALSE" | "false" => Value::Bool(false),
        _ => Value::String(field.to_string()),
    }
}

/// Number only if written as `-?(0|[1-9][0-9]*)(\.[0-9]+)?` and exactly
/// representable: integers within i64, decimals with at most 15 digits.
fn parse_plain_number(s: &str) -> Option<Value> {
    let unsigned = s.strip_prefix('-').unwrap_or(s);
    let (int, frac) = match unsigned.split_once('.') {
        Some((int, frac)) => (int, Some(frac)),
        None => (unsigned, None),
    };
    let all_digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(int) || (int.len() > 1 && int.starts_with('0')) {
        return None;
    }
    match frac {
        None => s.parse::<i64>().ok().map(Value::from),
        Some(frac) if all_digits(frac) && int.len() + frac.len() <= 15 => {
            s.parse::<f64>().ok().map(Value::from)
        }
        Some(_) => None,
    }
}

/// Value given on the command line: JSON if it parses, else plain text.
pub fn parse_cli_value(raw: &str, force_text: bool) -> Value {
    if force_text {
        return Value::String(raw.to_string());
    }
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Write a grid as pretty JSON or delimited text.
pub fn write_grid(grid: &[Vec<Value>], format: GridFormat, out: impl Write) -> Result<(), CliError> {
    match format {
        GridFormat::Json => write_json(&grid, out),
        GridFormat::Csv | GridFormat::Tsv => {
            let mut writer = csv::WriterBuilder::new()
                .delimiter(format.delimiter())
                .flexible(true)
                .from_writer(out);
            for row in grid {
                writer
                    .write_record(row.iter().map(display_value))
                    .map_err(|e| CliError::io(e.to_string()))?;
            }
            writer.flush().map_err(|e| CliError::io(e.to_string()))
        }
    }
}

pub fn write_json(value: &impl serde::Serialize, mut out: impl Write) -> Result<(), CliError> {
    let text = serde_json::to_string_pretty(value).map_err(|e| CliError::io(e.to_string()))?;
    writeln!(out, "{}", text).map_err(|e| CliError::io(e.to_string()))
}

/// Spreadsheet-style text for one value.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(true) => "TRUE".to_string(),
        Value::Bool(false) => "FALSE".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Column given as letters ("C") or a 1-based number ("3").
pub fn parse_column(s: &str) -> Result<u32, CliError> {
    if s.chars().all(|c| c.is_ascii_digit()) && !s.is_empty() {
        return s.parse().map_err(|_| CliError::args(format!("column {:?} is out of range", s)));
    }
    column_letter_to_number(s).map_err(CliError::from)
}

/// "#RRGGBB" / "RRGGBB" to the spreadsheet color integer.
pub fn parse_hex_color(s: &str) -> Result<u32, CliError> {
    let hex = s.strip_prefix('#').unwrap_or(s);
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(CliError::args(format!("invalid color {:?}, expected #RRGGBB", s)));
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).unwrap_or(0);
    Ok(rgb_to_excel_color(channel(0), channel(2), channel(4)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_csv_grid_types() {
        let grid = parse_grid("Name,Age,Active\nAlice,25,TRUE\nBob,30.5,false\n", GridFormat::Csv, false).unwrap();
        assert_eq!(grid[0], vec![json!("Name"), json!("Age"), json!("Active")]);
        assert_eq!(grid[1], vec![json!("Alice"), json!(25), json!(true)]);
        assert_eq!(grid[2], vec![json!("Bob"), json!(30.5), json!(false)]);
    }

    #[test]
    fn test_ragged_rows_are_padded() {
        let grid = parse_grid("a,b,c\nd\n", GridFormat::Csv, false).unwrap();
        assert_eq!(grid[1], vec![json!("d"), json!(""), json!("")]);
    }

    #[test]
    fn test_tsv_grid() {
        let grid = parse_grid("x\ty\n1\t2\n", GridFormat::Tsv, false).unwrap();
        assert_eq!(grid[1], vec![json!(1), json!(2)]);
    }

    #[test]
    fn test_lossy_numbers_stay_text() {
        let grid = parse_grid(
            "zip,code,big,long,neg\n007,1e3,12345678901234567890,0.1234567890123456,-0.5\n",
            GridFormat::Csv,
            false,
        )
        .unwrap();
        assert_eq!(
            grid[1],
            vec![
                json!("007"),
                json!("1e3"),
                json!("12345678901234567890"),
                json!("0.1234567890123456"),
                json!(-0.5),
            ]
        );

        let grid = parse_grid("0,0.25,-12,1.,.5,+3\n", GridFormat::Csv, false).unwrap();
        assert_eq!(
            grid[0],
            vec![json!(0), json!(0.25), json!(-12), json!("1."), json!(".5"), json!("+3")]
        );
    }

    #[test]
    fn test_all_text_keeps_every_field() {
        let grid = parse_grid("007,42,TRUE\n", GridFormat::Csv, true).unwrap();
        assert_eq!(grid[0], vec![json!("007"), json!("42"), json!("TRUE")]);
    }

    #[test]
    fn test_json_grid() {
        let grid = parse_grid(r#"[["a", 1], ["b", null]]"#, GridFormat::Json, false).unwrap();
        assert_eq!(grid[1], vec![json!("b"), Value::Null]);

        assert!(parse_grid(r#"{"a": 1}"#, GridFormat::Json, false).is_err());
        assert!(parse_grid(r#"[["a"], 3]"#, GridFormat::Json, false).is_err());
    }

    #[test]
    fn test_resolve_format() {
        assert_eq!(resolve_format(Some(Path::new("data.CSV")), None).unwrap(), GridFormat::Csv);
        assert_eq!(resolve_format(Some(Path::new("data.json")), None).unwrap(), GridFormat::Json);
        assert_eq!(
            resolve_format(Some(Path::new("data.txt")), Some(GridFormat::Tsv)).unwrap(),
            GridFormat::Tsv
        );
        assert!(resolve_format(None, None).is_err());
        assert!(resolve_format(Some(Path::new("data.txt")), None).is_err());
    }

    #[test]
    fn test_parse_cli_value() {
        assert_eq!(parse_cli_value("123", false), json!(123));
        assert_eq!(parse_cli_value("true", false), json!(true));
        assert_eq!(parse_cli_value("hello world", false), json!("hello world"));
        assert_eq!(parse_cli_value("123", true), json!("123"));
        assert_eq!(parse_cli_value("\"quoted\"", false), json!("quoted"));
    }

    #[test]
    fn test_write_csv() {
        let grid = vec![vec![json!("a"), json!(1), Value::Null, json!(true)]];
        let mut out = Vec::new();
        write_grid(&grid, GridFormat::Csv, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "a,1,,TRUE\n");
    }

    #[test]
    fn test_parse_column() {
        assert_eq!(parse_column("C").unwrap(), 3);
        assert_eq!(parse_column("aa").unwrap(), 27);
        assert_eq!(parse_column("12").unwrap(), 12);
        assert!(parse_column("C3").is_err());
        assert!(parse_column("").is_err());
    }

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#FFFF00").unwrap(), 65535);
        assert_eq!(parse_hex_color("0000ff").unwrap(), 16_711_680);
        assert!(parse_hex_color("#FFF").is_err());
        assert!(parse_hex_color("#GGGGGG").is_err());
    }
}
