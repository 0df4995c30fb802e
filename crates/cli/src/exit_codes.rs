//! CLI Exit Code Registry
//!
//! This is the single source of truth for all `airsheet` exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! | Code | Meaning                                              |
//! |------|------------------------------------------------------|
//! | 0    | Success                                              |
//! | 1    | General error (config file I/O, output write)        |
//! | 2    | Usage error (bad args, unreadable input)             |
//! | 3    | Invalid cell / column / range address                |
//! | 4    | Empty data block                                     |
//! | 5    | Response did not have the expected shape             |
//! | 6    | The script ran and reported failure                  |
//! | 10   | Not configured (no file id / script id / token)      |
//! | 11   | Network failure (connect, timeout)                   |
//! | 12   | Server answered with a non-2xx status                |

use airsheet_client::AirScriptError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options, unreadable input.
pub const EXIT_USAGE: u8 = 2;

/// Malformed address, caught before any request was sent.
pub const EXIT_INVALID_ADDRESS: u8 = 3;

/// Zero-row or zero-column data block.
pub const EXIT_EMPTY_DATA: u8 = 4;

/// Decoded result (or envelope) had the wrong shape.
pub const EXIT_DECODE: u8 = 5;

/// Script returned `success: false`.
pub const EXIT_REMOTE: u8 = 6;

/// Missing file id, script id or token.
pub const EXIT_NOT_CONFIGURED: u8 = 10;

/// No HTTP response (connection refused, DNS, timeout).
pub const EXIT_NETWORK: u8 = 11;

/// HTTP response with a non-2xx status.
pub const EXIT_HTTP: u8 = 12;

/// Map a client error to its exit code.
pub fn client_exit_code(err: &AirScriptError) -> u8 {
    match err {
        AirScriptError::Transport { status: Some(_), .. } => EXIT_HTTP,
        AirScriptError::Transport { status: None, .. } => EXIT_NETWORK,
        AirScriptError::InvalidAddress(_) => EXIT_INVALID_ADDRESS,
        AirScriptError::EmptyData(_) => EXIT_EMPTY_DATA,
        AirScriptError::InvalidArgument(_) => EXIT_USAGE,
        AirScriptError::DecodeMismatch { .. } | AirScriptError::Envelope(_) => EXIT_DECODE,
        AirScriptError::Remote { .. } => EXIT_REMOTE,
        AirScriptError::NotConfigured(_) => EXIT_NOT_CONFIGURED,
        AirScriptError::Config(_) => EXIT_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_codes_split_on_status() {
        let http = AirScriptError::Transport { cause: "x".into(), status: Some(500), body: None };
        let net = AirScriptError::Transport { cause: "x".into(), status: None, body: None };
        assert_eq!(client_exit_code(&http), EXIT_HTTP);
        assert_eq!(client_exit_code(&net), EXIT_NETWORK);
    }

    #[test]
    fn test_codes_are_distinct() {
        let codes = [
            EXIT_SUCCESS, EXIT_ERROR, EXIT_USAGE, EXIT_INVALID_ADDRESS, EXIT_EMPTY_DATA,
            EXIT_DECODE, EXIT_REMOTE, EXIT_NOT_CONFIGURED, EXIT_NETWORK, EXIT_HTTP,
        ];
        let mut sorted = codes.to_vec();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), codes.len());
    }
}
