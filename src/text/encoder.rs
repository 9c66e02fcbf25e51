//! Text -> bytes: branch-exploring walk over the char trie.
//!
//! Several alternative paths are kept alive at once because a short match
//! found while walking might be a prefix of a longer, cheaper one (`spec.md`
//! example: "ABC" tokenizes as a single two-character code point plus "C"
//! raw, not three single-character ones, once the two-character code point
//! produces fewer bytes). Each time the walk lands on a value, the path
//! forks: one copy commits the value and restarts from the root, the other
//! keeps walking in case a longer code point is still reachable. When no
//! live path can advance any further, every survivor is fully resolved and
//! the one with the shortest byte output wins, ties broken by creation
//! order.

use crate::error::{Diagnostics, Error};
use crate::trie::LookupTrie;

use super::FallbackPolicy;

const DEFAULT_PATH_CAP: usize = 256;

#[derive(Clone)]
struct Path<'t> {
    id: usize,
    output: Vec<u8>,
    /// Index into the shared `chars` array marking the end of this path's
    /// committed output; `chars[consumed..]` is still pending.
    consumed: usize,
    /// Chars of the pending window already stepped into `cursor`.
    walked: usize,
    cursor: crate::trie::Cursor<'t, char, Vec<u8>>,
    /// A value found earlier in the current walk, kept in case the walk
    /// cannot be extended any further.
    remembered: Option<(Vec<u8>, usize)>,
    /// Set once this path has committed a real code point or an escape;
    /// non-critical paths are dismissed first when the path cap is
    /// exceeded.
    critical: bool,
}

/// A branch-exploring encoder bound to one char trie and fallback policy.
pub struct Encoder<'t> {
    trie: &'t LookupTrie<char, Vec<u8>>,
    fallback: FallbackPolicy,
    replacement: Vec<u8>,
    path_cap: usize,
    greedy: bool,
    diagnostics: &'t dyn Diagnostics,
}

impl<'t> Encoder<'t> {
    pub(super) fn new(
        trie: &'t LookupTrie<char, Vec<u8>>,
        fallback: FallbackPolicy,
        diagnostics: &'t dyn Diagnostics,
    ) -> Self {
        Self {
            trie,
            fallback,
            replacement: vec![0x00],
            path_cap: DEFAULT_PATH_CAP,
            greedy: false,
            diagnostics,
        }
    }

    /// Overrides the bytes written under [`FallbackPolicy::Replace`].
    /// Default is a single `0x00` byte.
    #[must_use]
    pub fn with_replacement(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.replacement = bytes.into();
        self
    }

    /// Caps the number of live alternative paths kept during exploration.
    /// Default 256.
    #[must_use]
    pub fn with_path_cap(mut self, cap: usize) -> Self {
        self.path_cap = cap.max(1);
        self
    }

    /// Commits the first code point found along a walk rather than
    /// exploring for a shorter byte output. Off by default, and disables
    /// branch exploration entirely.
    #[must_use]
    pub fn with_greedy(mut self, greedy: bool) -> Self {
        self.greedy = greedy;
        self
    }

    /// Encodes `text` to bytes. Fails with [`Error::EncodeError`] under
    /// [`FallbackPolicy::Error`] if no path survives to the end.
    pub fn encode(&self, text: &str) -> Result<Vec<u8>, Error> {
        let chars: Vec<char> = text.chars().collect();
        if chars.is_empty() {
            return Ok(Vec::new());
        }

        let mut finished: Vec<Path<'t>> = Vec::new();
        let mut live: Vec<Path<'t>> = vec![Path {
            id: 0,
            output: Vec::new(),
            consumed: 0,
            walked: 0,
            cursor: self.trie.begin_path(),
            remembered: None,
            critical: false,
        }];
        let mut next_id = 1usize;
        let mut first_error: Option<(char, usize)> = None;

        while let Some(mut path) = live.pop() {
            loop {
                if path.consumed >= chars.len() && path.walked == 0 {
                    finished.push(path);
                    break;
                }
                let next_idx = path.consumed + path.walked;
                let stepped = next_idx < chars.len() && path.cursor.step(&chars[next_idx]);
                if stepped {
                    path.walked += 1;
                    if let Some(bytes) = path.cursor.value() {
                        let bytes = bytes.clone();
                        if !self.greedy && !path.cursor.is_leaf() {
                            let mut exploring = path.clone();
                            exploring.remembered = Some((bytes.clone(), path.walked));
                            exploring.id = next_id;
                            next_id += 1;
                            live.push(exploring);
                            dismiss_oldest_noncritical_if_over_cap(
                                &mut live,
                                self.path_cap,
                                self.diagnostics,
                            );
                        }
                        path.output.extend_from_slice(&bytes);
                        path.consumed += path.walked;
                        path.walked = 0;
                        path.remembered = None;
                        path.cursor = self.trie.begin_path();
                        path.critical = true;
                    }
                    continue;
                }
                if let Some((bytes, len)) = path.remembered.take() {
                    path.output.extend_from_slice(&bytes);
                    path.consumed += len;
                    path.walked = 0;
                    path.cursor = self.trie.begin_path();
                    path.critical = true;
                    continue;
                }
                if let Some(byte) = try_escape(&chars, path.consumed) {
                    path.output.push(byte);
                    path.consumed += 5;
                    path.walked = 0;
                    path.cursor = self.trie.begin_path();
                    path.critical = true;
                    continue;
                }
                let offending = chars.get(path.consumed).copied().unwrap_or('\u{0}');
                match self.fallback {
                    FallbackPolicy::Ignore => {
                        path.consumed += 1;
                        path.walked = 0;
                        path.cursor = self.trie.begin_path();
                        continue;
                    }
                    FallbackPolicy::Replace => {
                        path.output.extend_from_slice(&self.replacement);
                        path.consumed += 1;
                        path.walked = 0;
                        path.cursor = self.trie.begin_path();
                        continue;
                    }
                    FallbackPolicy::Error => {
                        if first_error.is_none() {
                            first_error = Some((offending, path.consumed));
                        }
                        // this path cannot proceed past an unmapped
                        // character under a strict fallback; it dies and
                        // another live path (if any) may still succeed.
                        break;
                    }
                }
            }
        }

        if finished.is_empty() {
            let (ch, offset) = first_error.unwrap_or(('\u{0}', 0));
            return Err(Error::EncodeError { ch, offset });
        }
        let best = finished
            .iter()
            .min_by_key(|p| (p.output.len(), p.id))
            .expect("finished is non-empty");
        Ok(best.output.clone())
    }
}

/// Recognizes the raw-byte escape `[$XX]` at `chars[pos..]`: a literal two
/// hex digit byte value wrapped in `[$` and `]`.
fn try_escape(chars: &[char], pos: usize) -> Option<u8> {
    if pos + 5 > chars.len() {
        return None;
    }
    if chars[pos] != '[' || chars[pos + 1] != '$' || chars[pos + 4] != ']' {
        return None;
    }
    let hi = chars[pos + 2].to_digit(16)?;
    let lo = chars[pos + 3].to_digit(16)?;
    Some(((hi << 4) | lo) as u8)
}

fn dismiss_oldest_noncritical_if_over_cap<'t>(
    live: &mut Vec<Path<'t>>,
    cap: usize,
    diagnostics: &dyn Diagnostics,
) {
    if live.len() <= cap {
        return;
    }
    while live.len() > cap {
        let victim = live
            .iter()
            .enumerate()
            .filter(|(_, p)| !p.critical)
            .min_by_key(|(_, p)| p.id)
            .map(|(i, _)| i);
        match victim {
            Some(i) => {
                diagnostics.warn(&Error::PathExhausted { cap });
                live.remove(i);
            }
            None => break,
        }
    }
}
