use std::{error, fmt};

/// A value that did not fit the declared bit width of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueOutOfRange {
    pub value: i64,
    pub bits: u8,
}

/// Every error the codec core can surface.
///
/// Construction-time errors (`DuplicateKey`, `AmbiguousMask`) are fatal and
/// only ever occur while building a [`crate::trie::LookupTrie`], a
/// [`crate::masked::MaskedByteTrie`] or a [`crate::database::CommandDatabase`].
/// Everything else is a per-call error: the codec leaves its cursor at the
/// failing position so the caller can skip or retry.
#[derive(Debug, Clone)]
pub enum Error {
    /// Byte buffer shorter than declared, or a malformed container header
    /// (LZ77 magic, GSM header fields, archive pointer table).
    InvalidInput(String),
    /// The decoder could not map bytes to a character and the fallback
    /// policy is `error`.
    DecodeError { bytes: Vec<u8>, offset: usize },
    /// The encoder could not map a character to bytes and the fallback
    /// failed.
    EncodeError { ch: char, offset: usize },
    /// A key was already present in a trie.
    DuplicateKey,
    /// Two masked-byte keys at the same trie node are common-bits-equal.
    AmbiguousMask,
    /// A parameter's integer value does not fit its declared bit width.
    ValueOutOfRange(ValueOutOfRange),
    /// A script referenced a command name absent from the active database.
    UnknownCommand(String),
    /// The LZ77 container was malformed.
    InvalidLz77(&'static str),
    /// The encoder's branch-exploration path cap was exceeded. Non-fatal:
    /// the oldest non-critical path is dismissed and exploration continues
    /// with whatever survives, so `encode` still returns its best output.
    /// Reported through a [`Diagnostics`] sink rather than returned from
    /// `encode`.
    PathExhausted { cap: usize },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            Self::DecodeError { bytes, offset } => {
                write!(f, "could not decode {bytes:02x?} at offset {offset}")
            }
            Self::EncodeError { ch, offset } => {
                write!(f, "could not encode {ch:?} at char offset {offset}")
            }
            Self::DuplicateKey => f.write_str("duplicate key in trie"),
            Self::AmbiguousMask => f.write_str("ambiguous mask at trie node"),
            Self::ValueOutOfRange(v) => {
                write!(f, "value {} does not fit in {} bits", v.value, v.bits)
            }
            Self::UnknownCommand(name) => write!(f, "unknown command `{name}`"),
            Self::InvalidLz77(msg) => write!(f, "invalid lz77 container: {msg}"),
            Self::PathExhausted { cap } => {
                write!(f, "branch-exploration path cap ({cap}) exceeded, dismissing oldest path")
            }
        }
    }
}

impl error::Error for Error {}

/// Result alias used throughout the crate.
pub type CoreResult<T> = Result<T, Error>;

/// Sink for non-fatal advisory events the codec wants surfaced without
/// failing the call that triggered them — currently only
/// [`Error::PathExhausted`]. Passed to (or defaulted by) a codec at
/// construction so a caller with its own logging stack can plug in instead
/// of going through the `log` facade.
pub trait Diagnostics {
    fn warn(&self, err: &Error);
}

/// Forwards every event to `log::warn!`. The default sink a codec uses
/// when none is supplied.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogDiagnostics;

impl Diagnostics for LogDiagnostics {
    fn warn(&self, err: &Error) {
        log::warn!("{err}");
    }
}
