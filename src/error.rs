use thiserror::Error;

/// Errors that can occur while driving the dissection engine.
///
/// Only the two runtime-fault categories from the design (a bounded-read
/// fault during dissection, and a malformed demo/dump config) show up here.
/// Registrar misuse and other programming errors are not representable as
/// `DissectError` variants: they `assert!`/`panic!` at the call site instead
/// (see `registry` and `builder`).
#[derive(Error, Debug)]
pub enum DissectError {
    #[error(
        "bounded read out of range: offset {offset} len {len} exceeds buffer of {buf_len} bytes"
    )]
    BoundsRead {
        offset: usize,
        len: usize,
        buf_len: usize,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, DissectError>;
