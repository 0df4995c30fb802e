// airsheet - command-line access to a spreadsheet through its AirScript endpoint

mod commands;
mod exit_codes;
mod grid;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use airsheet_client::{AirScriptError, ClientConfig};

use exit_codes::{client_exit_code, EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE};
use grid::GridFormat;

#[derive(Parser)]
#[command(name = "airsheet")]
#[command(about = "Read and edit a KDocs/WPS spreadsheet through an AirScript endpoint")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// Worksheet to operate on (default: the active sheet)
    #[arg(long, short = 's', global = true)]
    sheet: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Connection settings. Each flag falls back to its environment variable,
/// then to the saved config.
#[derive(Args, Debug, Default)]
pub struct ConnectionArgs {
    /// Site root, e.g. https://www.kdocs.cn
    #[arg(long, global = true, env = "AIRSCRIPT_BASE_URL")]
    pub base_url: Option<String>,

    /// File ID from the spreadsheet URL
    #[arg(long, global = true, env = "AIRSCRIPT_FILE_ID")]
    pub file_id: Option<String>,

    /// Script ID inside the file
    #[arg(long, global = true, env = "AIRSCRIPT_SCRIPT_ID")]
    pub script_id: Option<String>,

    /// AirScript token
    #[arg(long, global = true, env = "AIRSCRIPT_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,
}

impl ConnectionArgs {
    /// Saved config (if any) with flags applied on top.
    pub fn merge_into(&self, base: ClientConfig) -> ClientConfig {
        let mut cfg = base;
        if let Some(v) = &self.base_url {
            cfg.base_url = v.clone();
        }
        if let Some(v) = &self.file_id {
            cfg.file_id = v.clone();
        }
        if let Some(v) = &self.script_id {
            cfg.script_id = v.clone();
        }
        if let Some(v) = &self.token {
            cfg.token = v.clone();
        }
        if let Some(v) = self.timeout {
            cfg.timeout_secs = v;
        }
        cfg
    }

    pub fn resolve(&self) -> Result<ClientConfig, CliError> {
        let base = airsheet_client::load_config()?.unwrap_or_else(|| ClientConfig::new("", "", ""));
        let cfg = self.merge_into(base);
        cfg.validate()?;
        Ok(cfg)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Save connection settings to the config file
    #[command(after_help = "\
Examples:
  airsheet login --file-id abc123 --script-id s1 --token $TOKEN
  airsheet login --file-id abc123 --script-id s1 --token $TOKEN --no-verify")]
    Login {
        /// Save without making a test call
        #[arg(long)]
        no_verify: bool,
    },

    /// Delete the saved config
    Logout,

    /// Show the effective connection settings (token masked)
    Config,

    /// Print the value of one cell
    Get {
        /// Cell address, e.g. B2
        address: String,
    },

    /// Write one cell. The value is parsed as JSON when possible.
    #[command(after_help = "\
Examples:
  airsheet set A1 'Hello'
  airsheet set B2 42
  airsheet set C3 007 --text")]
    Set {
        address: String,
        value: String,

        /// Always send the value as text
        #[arg(long)]
        text: bool,
    },

    /// Print the values of a range
    Read {
        /// Range address, e.g. A1:C10
        range: String,

        /// Output format
        #[arg(long, short = 't', value_enum, default_value = "json")]
        to: GridFormat,
    },

    /// Write a CSV/TSV/JSON grid starting at a cell
    #[command(after_help = "\
Examples:
  airsheet write data.csv --start B2
  airsheet write zipcodes.csv --text
  cat rows.json | airsheet write -f json")]
    Write {
        /// Input file (omit to read from stdin)
        input: Option<PathBuf>,

        /// Input format (required when reading from stdin)
        #[arg(long, short = 'f', value_enum)]
        from: Option<GridFormat>,

        /// Top-left cell of the block
        #[arg(long, default_value = "A1")]
        start: String,

        /// Send every CSV/TSV field as text
        #[arg(long)]
        text: bool,
    },

    /// Clear a range
    Clear {
        range: String,

        /// Keep formatting, remove values only
        #[arg(long)]
        contents_only: bool,
    },

    /// Print a cell's formula, or set it when FORMULA is given
    Formula {
        address: String,
        formula: Option<String>,
    },

    /// Format a range
    #[command(after_help = "\
Examples:
  airsheet format A1:D1 --bold --bg '#FFFF00'
  airsheet format B2:B20 --number '0.00%'
  airsheet format A1:C10 --border thin --align center")]
    Format(commands::FormatArgs),

    /// Merge a range into one cell
    Merge {
        range: String,

        /// Unmerge instead
        #[arg(long)]
        undo: bool,
    },

    /// Insert, delete or resize rows
    Rows {
        #[command(subcommand)]
        command: RowCommands,
    },

    /// Insert, delete or resize columns (letters or 1-based numbers)
    Cols {
        #[command(subcommand)]
        command: ColCommands,
    },

    /// Find cells containing text
    Find {
        text: String,

        /// Range to search
        #[arg(long, default_value = "A1:Z1000")]
        range: String,

        /// Stop at the first match
        #[arg(long)]
        first: bool,
    },

    /// Replace text within a range, printing the number of matches
    Replace {
        find: String,
        replace: String,

        #[arg(long, default_value = "A1:Z1000")]
        range: String,
    },

    /// Sort a range by one column
    Sort {
        range: String,

        /// A cell in the sort column, e.g. B1
        #[arg(long)]
        key: String,

        /// Sort descending
        #[arg(long)]
        desc: bool,

        /// First row is a header
        #[arg(long)]
        header: bool,
    },

    /// Copy a range, pasting to TARGET when given
    Copy {
        source: String,
        target: Option<String>,
    },

    /// Paste the clipboard at a range
    Paste { target: String },

    /// Worksheet operations
    Sheets {
        #[command(subcommand)]
        command: SheetCommands,
    },

    /// Print the used range of the sheet
    UsedRange {
        #[arg(long, short = 't', value_enum, default_value = "json")]
        to: GridFormat,
    },

    /// Call any script function directly
    #[command(after_help = "\
Examples:
  airsheet call getCellValue --arg address='\"A1\"'
  airsheet call setRangeValues --arg address='\"A1:B1\"' --arg 'values=[[1,2]]'")]
    Call {
        function: String,

        /// Argument as key=value, value parsed as JSON when possible. Repeatable.
        #[arg(long = "arg", value_name = "KEY=VALUE")]
        args: Vec<String>,
    },
}

#[derive(Subcommand, Clone)]
pub enum RowCommands {
    /// Insert rows before ROW
    Insert {
        row: u32,
        #[arg(default_value_t = 1)]
        count: u32,
    },
    /// Delete rows starting at ROW
    Delete {
        row: u32,
        #[arg(default_value_t = 1)]
        count: u32,
    },
    /// Set the height of a row
    Height { row: u32, height: f64 },
}

#[derive(Subcommand, Clone)]
pub enum ColCommands {
    /// Insert columns before COLUMN
    Insert {
        column: String,
        #[arg(default_value_t = 1)]
        count: u32,
    },
    /// Delete columns starting at COLUMN
    Delete {
        column: String,
        #[arg(default_value_t = 1)]
        count: u32,
    },
    /// Set the width of a column
    Width { column: String, width: f64 },
    /// Fit column widths to the contents of a range
    Autofit { range: String },
}

#[derive(Subcommand, Clone)]
pub enum SheetCommands {
    /// List worksheet names
    List,
    /// Print the number of worksheets
    Count,
    /// Add a worksheet
    Add { name: Option<String> },
    /// Delete a worksheet by name or 1-based position
    Delete { identifier: String },
    /// Check whether a worksheet exists
    Exists { name: String },
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\nclient:  airsheet-client ", env!("CARGO_PKG_VERSION"),
        "\ntarget:  ", env!("TARGET"),
    )
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let sheet = cli.sheet.as_deref().filter(|s| !s.is_empty());
    let conn = &cli.connection;

    let result = match cli.command {
        Commands::Login { no_verify } => commands::cmd_login(conn, no_verify),
        Commands::Logout => commands::cmd_logout(),
        Commands::Config => commands::cmd_config(conn),
        Commands::Get { address } => commands::cmd_get(conn, &address, sheet),
        Commands::Set { address, value, text } => commands::cmd_set(conn, &address, &value, text, sheet),
        Commands::Read { range, to } => commands::cmd_read(conn, &range, to, sheet),
        Commands::Write { input, from, start, text } => commands::cmd_write(conn, input, from, &start, text, sheet),
        Commands::Clear { range, contents_only } => commands::cmd_clear(conn, &range, contents_only, sheet),
        Commands::Formula { address, formula } => commands::cmd_formula(conn, &address, formula.as_deref(), sheet),
        Commands::Format(args) => commands::cmd_format(conn, &args, sheet),
        Commands::Merge { range, undo } => commands::cmd_merge(conn, &range, undo, sheet),
        Commands::Rows { command } => commands::cmd_rows(conn, command, sheet),
        Commands::Cols { command } => commands::cmd_cols(conn, command, sheet),
        Commands::Find { text, range, first } => commands::cmd_find(conn, &text, &range, first, sheet),
        Commands::Replace { find, replace, range } => commands::cmd_replace(conn, &find, &replace, &range, sheet),
        Commands::Sort { range, key, desc, header } => commands::cmd_sort(conn, &range, &key, desc, header, sheet),
        Commands::Copy { source, target } => commands::cmd_copy(conn, &source, target.as_deref(), sheet),
        Commands::Paste { target } => commands::cmd_paste(conn, &target, sheet),
        Commands::Sheets { command } => commands::cmd_sheets(conn, command),
        Commands::UsedRange { to } => commands::cmd_used_range(conn, to, sheet),
        Commands::Call { function, args } => commands::cmd_call(conn, &function, &args, sheet),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<AirScriptError> for CliError {
    fn from(err: AirScriptError) -> Self {
        let code = client_exit_code(&err);
        let hint = match &err {
            AirScriptError::NotConfigured(_) => {
                Some("run `airsheet login` or set AIRSCRIPT_FILE_ID, AIRSCRIPT_SCRIPT_ID and AIRSCRIPT_TOKEN".to_string())
            }
            AirScriptError::Transport { status: Some(401), .. }
            | AirScriptError::Transport { status: Some(403), .. } => {
                Some("check the AirScript token and that the script is shared with it".to_string())
            }
            AirScriptError::Transport { status: Some(_), body: Some(body), .. } if !body.trim().is_empty() => {
                Some(format!("server said: {}", truncate(body.trim(), 200)))
            }
            AirScriptError::Config(_) => {
                Some("run `airsheet login` to overwrite the config, or `airsheet logout` to remove it".to_string())
            }
            AirScriptError::Transport { status: None, .. } => {
                Some("check the network and --base-url".to_string())
            }
            _ => None,
        };
        Self { code, message: err.to_string(), hint }
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exit_codes::{EXIT_HTTP, EXIT_NOT_CONFIGURED};

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_flags_override_saved_config() {
        let saved = ClientConfig::new("saved-file", "saved-script", "saved-token");
        let conn = ConnectionArgs {
            token: Some("flag-token".into()),
            timeout: Some(5),
            ..Default::default()
        };
        let cfg = conn.merge_into(saved);
        assert_eq!(cfg.file_id, "saved-file");
        assert_eq!(cfg.token, "flag-token");
        assert_eq!(cfg.timeout_secs, 5);
    }

    #[test]
    fn test_error_hints() {
        let err = CliError::from(AirScriptError::NotConfigured("missing token".into()));
        assert_eq!(err.code, EXIT_NOT_CONFIGURED);
        assert!(err.hint.unwrap().contains("airsheet login"));

        let err = CliError::from(AirScriptError::Transport {
            cause: "getCellValue rejected by server".into(),
            status: Some(500),
            body: Some("boom".into()),
        });
        assert_eq!(err.code, EXIT_HTTP);
        assert_eq!(err.hint.as_deref(), Some("server said: boom"));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("abc", 10), "abc");
    }
}
