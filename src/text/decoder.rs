//! Bytes -> text: a maximal-munch walk over the byte trie, one code point
//! at a time.

use crate::error::Error;
use crate::trie::LookupTrie;

use super::FallbackPolicy;

/// One decoded unit: either a dictionary code point's text, or a single
/// byte that matched nothing and was handled per the configured
/// [`FallbackPolicy`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeUnit {
    Text(String),
    RawByte(u8),
}

/// A decoder bound to one byte trie and fallback policy. Stateless between
/// calls to [`Decoder::next`]; callers that need true streaming can drive it
/// themselves, and [`Decoder::decode_all`] drives it to completion.
pub struct Decoder<'t> {
    trie: &'t LookupTrie<u8, String>,
    fallback: FallbackPolicy,
    replacement: char,
    /// `true`: emit at the first code point found along the walk. `false`
    /// (default): keep walking for a longer match, emitting only once the
    /// walk can go no further (maximal munch).
    greedy: bool,
}

impl<'t> Decoder<'t> {
    pub(super) fn new(trie: &'t LookupTrie<u8, String>, fallback: FallbackPolicy) -> Self {
        Self {
            trie,
            fallback,
            replacement: '\u{FFFD}',
            greedy: false,
        }
    }

    /// Overrides the placeholder character used under
    /// [`FallbackPolicy::Replace`]. Default is U+FFFD.
    #[must_use]
    pub fn with_replacement(mut self, ch: char) -> Self {
        self.replacement = ch;
        self
    }

    /// Emit at the first code point found along a walk rather than the
    /// longest. Off by default.
    #[must_use]
    pub fn with_greedy(mut self, greedy: bool) -> Self {
        self.greedy = greedy;
        self
    }

    /// Decodes the single next unit starting at `buf[0]`. `buf` must be
    /// non-empty. Returns the unit and how many bytes of `buf` it consumed.
    pub fn next(&self, buf: &[u8], base_offset: usize) -> Result<(DecodeUnit, usize), Error> {
        debug_assert!(!buf.is_empty());
        let mut cursor = self.trie.begin_path();
        let mut remembered: Option<(&'t String, usize)> = None;
        let mut i = 0;
        while i < buf.len() {
            if !cursor.step(&buf[i]) {
                break;
            }
            i += 1;
            if let Some(value) = cursor.value() {
                remembered = Some((value, i));
                if self.greedy || cursor.is_leaf() {
                    break;
                }
            }
        }
        if let Some((text, len)) = remembered {
            return Ok((DecodeUnit::Text(text.clone()), len));
        }
        match self.fallback {
            FallbackPolicy::Ignore => Ok((DecodeUnit::RawByte(buf[0]), 1)),
            FallbackPolicy::Replace => Ok((DecodeUnit::Text(self.replacement.to_string()), 1)),
            FallbackPolicy::Error => Err(Error::DecodeError {
                bytes: vec![buf[0]],
                offset: base_offset,
            }),
        }
    }

    /// Decodes the whole of `buf`, rendering any [`DecodeUnit::RawByte`] as
    /// the `[$XX]` escape so the result round-trips through
    /// [`super::Encoder::encode`].
    pub fn decode_all(&self, buf: &[u8]) -> Result<String, Error> {
        let mut out = String::new();
        let mut pos = 0;
        while pos < buf.len() {
            let (unit, len) = self.next(&buf[pos..], pos)?;
            match unit {
                DecodeUnit::Text(s) => out.push_str(&s),
                DecodeUnit::RawByte(b) => out.push_str(&format!("[${b:02X}]")),
            }
            pos += len;
        }
        Ok(out)
    }
}
