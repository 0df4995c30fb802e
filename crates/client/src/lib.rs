//! AirScript client: typed spreadsheet calls over one remote procedure endpoint.
//!
//! Every operation becomes a single POST to the file's `sync_task` URL with
//! a call context naming the script function and its arguments. The
//! response carries the return value as a second, JSON-encoded string,
//! which is decoded in two stages and reduced to the logical value.
//!
//! No retries. No caching. No batching across calls.

mod address;
mod client;
mod config;
mod envelope;
mod error;
mod ops;
mod transport;
mod value;

pub use address::{
    column_letter_to_number, column_number_to_letter, compute_range, range_for_block,
    CellAddress, RangeAddress,
};
pub use client::{params, AirScriptClient, CallContext};
pub use config::{
    config_file_path, delete_config, load_config, load_config_from, load_config_if_exists,
    save_config, save_config_to,
    ClientConfig, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS,
    ENV_BASE_URL, ENV_FILE_ID, ENV_SCRIPT_ID, ENV_TOKEN,
};
pub use envelope::{
    decode_envelope, decode_inner_payload, unwrap_envelope, unwrap_singleton,
    Envelope, Unwrapped, UNDEFINED_SENTINEL,
};
pub use error::{AirScriptError, Result};
pub use ops::{
    border, rgb_to_excel_color,
    Ack, AlignOptions, BorderOptions, FindResult, FontOptions, FoundCell,
    HorizontalAlignment, SheetIdentifier, SortOptions, SortOrder, VerticalAlignment,
};
pub use transport::{HttpTransport, Transport, TransportRequest, TransportResponse, TOKEN_HEADER};
pub use value::{RemoteValue, Scalar};
