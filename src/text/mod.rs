//! Byte <-> string text codec: a pair of independent tries (bytes -> string,
//! string -> bytes) built from the same dictionary of code points, plus the
//! streaming decoder and branch-exploring encoder that walk them.
//!
//! Grounded on the teacher's bit-level `Cursor` in spirit (a small stateful
//! walker callers drive one element at a time) but built on
//! [`crate::trie::LookupTrie`] rather than a flat bit cursor, since a code
//! point can span a variable number of bytes or characters.

mod decoder;
mod encoder;

pub use decoder::{DecodeUnit, Decoder};
pub use encoder::Encoder;

use crate::error::{Diagnostics, Error, LogDiagnostics};
use crate::trie::LookupTrie;

/// How a codec falls back when no code point matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackPolicy {
    /// Drop the offending byte or character silently.
    Ignore,
    /// Substitute a configured placeholder.
    Replace,
    /// Surface [`Error::DecodeError`] or [`Error::EncodeError`].
    Error,
}

/// One entry of the dictionary: a byte sequence and the string it stands
/// for. Either side may hold more than one element (`spec.md` calls this a
/// "code point" regardless of which side is longer).
#[derive(Debug, Clone)]
pub struct CodePoint {
    pub bytes: Vec<u8>,
    pub text: String,
}

impl CodePoint {
    #[must_use]
    pub fn new(bytes: impl Into<Vec<u8>>, text: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            text: text.into(),
        }
    }
}

/// A built dictionary: a byte trie for decoding and a char trie for
/// encoding, populated from the same [`CodePoint`] list.
pub struct TextCodec {
    byte_trie: LookupTrie<u8, String>,
    char_trie: LookupTrie<char, Vec<u8>>,
    diagnostics: Box<dyn Diagnostics>,
}

impl TextCodec {
    /// Builds both tries from `code_points`. Fails with
    /// [`Error::DuplicateKey`] if two entries share a byte sequence or share
    /// a character sequence.
    pub fn build(code_points: &[CodePoint]) -> Result<Self, Error> {
        let mut byte_trie = LookupTrie::new();
        let mut char_trie = LookupTrie::new();
        for cp in code_points {
            byte_trie.add(&cp.bytes, cp.text.clone())?;
            let chars: Vec<char> = cp.text.chars().collect();
            char_trie.add(&chars, cp.bytes.clone())?;
        }
        Ok(Self {
            byte_trie,
            char_trie,
            diagnostics: Box::new(LogDiagnostics),
        })
    }

    /// Overrides the sink that receives non-fatal advisory events (for now,
    /// only the encoder's path-cap eviction notices). Defaults to
    /// forwarding through the `log` crate.
    #[must_use]
    pub fn with_diagnostics(mut self, sink: impl Diagnostics + 'static) -> Self {
        self.diagnostics = Box::new(sink);
        self
    }

    /// A streaming decoder over this dictionary's byte trie.
    #[must_use]
    pub fn decoder(&self, fallback: FallbackPolicy) -> Decoder<'_> {
        Decoder::new(&self.byte_trie, fallback)
    }

    /// A branch-exploring encoder over this dictionary's char trie.
    #[must_use]
    pub fn encoder(&self, fallback: FallbackPolicy) -> Encoder<'_> {
        Encoder::new(&self.char_trie, fallback, self.diagnostics.as_ref())
    }
}
