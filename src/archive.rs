//! Text archive container: a pointer table of (offset, size) entries
//! followed by script payloads, plus the encrypted ` GSM` variant used by
//! some games.
//!
//! Grounded on the teacher's `bitstream::Cursor` header-then-body reading
//! shape (`BLOCKINFO`/`ENTER_SUBBLOCK` headers precede their payload the
//! same way a pointer entry precedes its script bytes) and, for the XOR
//! shell, on the masked/literal byte handling already built in
//! `crate::masked`.

use crate::database::CommandDatabase;
use crate::error::Error;
use crate::script::{Assembler, Disassembler, Script};
use crate::text::{FallbackPolicy, TextCodec};

/// What a pointer entry's offset is measured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerBase {
    /// Offset is relative to the start of the archive buffer.
    AbsoluteFromStart,
    /// Offset is relative to the end of the pointer table. Requires the
    /// table's entry count to be supplied externally (e.g. by a ROM
    /// table-of-contents reader), since the table's own size cannot be
    /// derived from an offset measured relative to it.
    RelativeToPointerTableEnd,
}

/// Per-game layout configuration for the default pointer-table archive
/// format.
#[derive(Debug, Clone)]
pub struct ArchiveLayout {
    pub pointer_base: PointerBase,
    /// Required when `pointer_base` is
    /// [`PointerBase::RelativeToPointerTableEnd`]. Ignored for
    /// [`PointerBase::AbsoluteFromStart`], where the table self-terminates
    /// by the validity heuristic below.
    pub entry_count: Option<usize>,
}

impl ArchiveLayout {
    #[must_use]
    pub fn archive_relative() -> Self {
        Self {
            pointer_base: PointerBase::AbsoluteFromStart,
            entry_count: None,
        }
    }

    #[must_use]
    pub fn table_end_relative(entry_count: usize) -> Self {
        Self {
            pointer_base: PointerBase::RelativeToPointerTableEnd,
            entry_count: Some(entry_count),
        }
    }

    /// Guesses the layout by first trying [`PointerBase::AbsoluteFromStart`];
    /// if that heuristic rejects the very first entry (it would point back
    /// into the table itself), retries assuming offsets are relative to the
    /// end of the pointer table instead, growing the assumed entry count
    /// until one more entry fails validity.
    #[must_use]
    pub fn detect(buf: &[u8]) -> Self {
        let probe = Self::archive_relative();
        if !resolve_entries(buf, &probe).is_empty() {
            return probe;
        }
        let mut count = 0usize;
        loop {
            let candidate = Self::table_end_relative(count + 1);
            if resolve_entries(buf, &candidate).len() == count + 1 {
                count += 1;
            } else {
                break;
            }
        }
        Self::table_end_relative(count)
    }
}

const ENTRY_SIZE: usize = 8;

struct RawEntry {
    offset: u32,
    size: u32,
}

fn read_entry(buf: &[u8], pos: usize) -> Option<RawEntry> {
    let bytes = buf.get(pos..pos + ENTRY_SIZE)?;
    Some(RawEntry {
        offset: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        size: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
    })
}

/// One resolved pointer-table entry: absolute byte range within the
/// archive buffer.
#[derive(Debug, Clone, Copy)]
struct ResolvedEntry {
    start: usize,
    end: usize,
}

fn resolve_entries(buf: &[u8], layout: &ArchiveLayout) -> Vec<ResolvedEntry> {
    match layout.pointer_base {
        PointerBase::AbsoluteFromStart => {
            let mut entries = Vec::new();
            let mut pos = 0;
            loop {
                let Some(raw) = read_entry(buf, pos) else {
                    break;
                };
                if raw.size == 0 {
                    break;
                }
                let start = raw.offset as usize;
                let end = start.saturating_add(raw.size as usize);
                // an entry can't point back into the table slot it (or an
                // earlier sibling) occupies; real script data always
                // follows the whole table.
                if end > buf.len() || start > end || start < pos + ENTRY_SIZE {
                    break;
                }
                entries.push(ResolvedEntry { start, end });
                pos += ENTRY_SIZE;
            }
            entries
        }
        PointerBase::RelativeToPointerTableEnd => {
            let Some(n) = layout.entry_count else {
                return Vec::new();
            };
            let table_end = n * ENTRY_SIZE;
            let mut entries = Vec::with_capacity(n);
            for i in 0..n {
                let Some(raw) = read_entry(buf, i * ENTRY_SIZE) else {
                    break;
                };
                if raw.size == 0 {
                    break;
                }
                let start = table_end.saturating_add(raw.offset as usize);
                let end = start.saturating_add(raw.size as usize);
                if end > buf.len() || start > end {
                    break;
                }
                entries.push(ResolvedEntry { start, end });
            }
            entries
        }
    }
}

/// An ordered collection of scripts plus an optional identifier (typically
/// a ROM offset string supplied by the caller).
#[derive(Debug, Clone)]
pub struct TextArchive {
    pub identifier: Option<String>,
    pub scripts: Vec<Script>,
}

/// Reads the default pointer-table archive format from `buf`.
pub fn read_archive(
    buf: &[u8],
    layout: &ArchiveLayout,
    database: &CommandDatabase,
    text_codec: &TextCodec,
    fallback: FallbackPolicy,
    identifier: Option<String>,
) -> Result<TextArchive, Error> {
    let entries = resolve_entries(buf, layout);
    let dis = Disassembler::new(database, text_codec, fallback);
    let mut scripts = Vec::with_capacity(entries.len());
    for entry in entries {
        let elements = dis.disassemble(&buf[entry.start..entry.end])?;
        scripts.push(Script {
            database_name: database.name.clone(),
            elements,
        });
    }
    Ok(TextArchive { identifier, scripts })
}

/// Writes `archive` back to the default pointer-table format. Scripts are
/// laid out in order immediately after the pointer table; entry sizes
/// reflect each assembled script's actual byte length.
pub fn write_archive(
    archive: &TextArchive,
    layout: &ArchiveLayout,
    text_codec: &TextCodec,
    fallback: FallbackPolicy,
) -> Result<Vec<u8>, Error> {
    let asm = Assembler::new(text_codec, fallback);
    let bodies: Vec<Vec<u8>> = archive
        .scripts
        .iter()
        .map(|s| asm.assemble(&s.elements))
        .collect::<Result<_, _>>()?;

    let table_len = bodies.len() * ENTRY_SIZE;
    let mut out = vec![0u8; table_len];
    let mut cursor = table_len;
    for (i, body) in bodies.iter().enumerate() {
        let start = out.len();
        out.extend_from_slice(body);
        let offset = match layout.pointer_base {
            PointerBase::AbsoluteFromStart => start as u32,
            PointerBase::RelativeToPointerTableEnd => (start - table_len) as u32,
        };
        let entry = &mut out[i * ENTRY_SIZE..i * ENTRY_SIZE + ENTRY_SIZE];
        entry[0..4].copy_from_slice(&offset.to_le_bytes());
        entry[4..8].copy_from_slice(&(body.len() as u32).to_le_bytes());
        cursor = start + body.len();
    }
    debug_assert_eq!(cursor, out.len());
    Ok(out)
}

const GSM_MAGIC: &[u8; 4] = b" GSM";

/// Reads the encrypted ` GSM` variant (exact header per `spec.md` §6): a
/// fixed 12-byte header, a per-script (offset, size-words-minus-one) table,
/// and a payload XORed with 0x55 in one pass over the whole scripts region
/// (scripts may overlap, so decryption cannot be done script-by-script).
pub fn read_gsm(
    buf: &[u8],
    database: &CommandDatabase,
    text_codec: &TextCodec,
    fallback: FallbackPolicy,
    identifier: Option<String>,
    strict: bool,
) -> Result<TextArchive, Error> {
    if buf.len() < 12 || &buf[0..4] != GSM_MAGIC {
        return Err(Error::InvalidInput("GSM magic missing".into()));
    }
    if strict && (buf[4..6] != [0x00, 0x01] || buf[10..12] != [0xFF, 0xFF]) {
        return Err(Error::InvalidInput("GSM fixed header fields mismatched".into()));
    }
    let count = u16::from_le_bytes([buf[6], buf[7]]) as usize;
    let table_start = 12usize;
    let table_len = count * 4;
    let table_end = table_start
        .checked_add(table_len)
        .ok_or_else(|| Error::InvalidInput("GSM pointer table overflow".into()))?;
    if buf.len() < table_end {
        return Err(Error::InvalidInput("GSM pointer table truncated".into()));
    }

    let mut ranges = Vec::with_capacity(count);
    let mut region_end = table_end;
    for i in 0..count {
        let entry = &buf[table_start + i * 4..table_start + i * 4 + 4];
        let offset = u16::from_le_bytes([entry[0], entry[1]]) as usize;
        let size_words_minus_one = u16::from_le_bytes([entry[2], entry[3]]) as usize;
        let size = (size_words_minus_one + 1) * 2;
        let start = table_end
            .checked_add(offset)
            .ok_or_else(|| Error::InvalidInput("GSM script offset overflow".into()))?;
        let end = start
            .checked_add(size)
            .ok_or_else(|| Error::InvalidInput("GSM script size overflow".into()))?;
        if end > buf.len() {
            return Err(Error::InvalidInput("GSM script entry out of bounds".into()));
        }
        region_end = region_end.max(end);
        ranges.push((start, end));
    }

    let mut decrypted = buf[table_end..region_end].to_vec();
    for b in &mut decrypted {
        *b ^= 0x55;
    }

    let dis = Disassembler::new(database, text_codec, fallback);
    let mut scripts = Vec::with_capacity(count);
    for (start, end) in ranges {
        let slice = &decrypted[start - table_end..end - table_end];
        let elements = dis.disassemble(slice)?;
        scripts.push(Script {
            database_name: database.name.clone(),
            elements,
        });
    }
    Ok(TextArchive { identifier, scripts })
}

/// Writes the encrypted ` GSM` variant. Single-byte scripts are padded to
/// size 2 before XORing, per `spec.md` §4.7.
pub fn write_gsm(archive: &TextArchive, text_codec: &TextCodec, fallback: FallbackPolicy) -> Result<Vec<u8>, Error> {
    let asm = Assembler::new(text_codec, fallback);
    let mut bodies: Vec<Vec<u8>> = archive
        .scripts
        .iter()
        .map(|s| asm.assemble(&s.elements))
        .collect::<Result<_, _>>()?;
    for body in &mut bodies {
        if body.len() == 1 {
            body.push(0x00);
        }
    }

    let mut out = Vec::new();
    out.extend_from_slice(GSM_MAGIC);
    out.extend_from_slice(&[0x00, 0x01]);
    out.extend_from_slice(&(bodies.len() as u16).to_le_bytes());
    let max_size_words = bodies.iter().map(|b| b.len() / 2).max().unwrap_or(0);
    out.extend_from_slice(&(max_size_words.saturating_sub(1) as u16).to_le_bytes());
    out.extend_from_slice(&[0xFF, 0xFF]);

    let table_end = out.len() + bodies.len() * 4;
    let mut payload = Vec::new();
    let mut table = Vec::with_capacity(bodies.len() * 4);
    for body in &bodies {
        let offset = payload.len() as u16;
        let size_words_minus_one = (body.len() / 2).saturating_sub(1) as u16;
        table.extend_from_slice(&offset.to_le_bytes());
        table.extend_from_slice(&size_words_minus_one.to_le_bytes());
        payload.extend_from_slice(body);
    }
    debug_assert_eq!(out.len() + table.len(), table_end);
    out.extend_from_slice(&table);
    for b in &mut payload {
        *b ^= 0x55;
    }
    out.extend_from_slice(&payload);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::EndType;
    use crate::database::CommandSpec;
    use crate::text::CodePoint;

    fn empty_db() -> CommandDatabase {
        CommandDatabase::build(
            "test",
            vec![CommandSpec {
                name: "end".into(),
                description: String::new(),
                base: vec![0x00],
                mask: vec![0xFF],
                end_type: EndType::Always,
                prints: false,
                mugshot_param_name: None,
                priority_length: 0,
                rewind_count: 0,
                elements: Vec::new(),
                extends: None,
            }],
        )
        .unwrap()
    }

    fn codec() -> TextCodec {
        TextCodec::build(&[CodePoint::new(vec![0x41], "A")]).unwrap()
    }

    #[test]
    fn gsm_header_roundtrip() {
        // Two empty (all-zero, two-byte) scripts, built per spec.md's
        // literal GSM scenario: header + two pointer entries + four
        // 0x55 payload bytes that decrypt to zero.
        let mut input = Vec::new();
        input.extend_from_slice(b" GSM");
        input.extend_from_slice(&[0x00, 0x01]);
        input.extend_from_slice(&[0x02, 0x00]); // 2 scripts
        input.extend_from_slice(&[0x00, 0x00]); // max-size hint
        input.extend_from_slice(&[0xFF, 0xFF]);
        input.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]); // entry 0: offset 0, size 2
        input.extend_from_slice(&[0x02, 0x00, 0x00, 0x00]); // entry 1: offset 2, size 2
        input.extend_from_slice(&[0x55, 0x55, 0x55, 0x55]);

        let db = empty_db();
        let codec = codec();
        let archive = read_gsm(&input, &db, &codec, FallbackPolicy::Error, None, true).unwrap();
        assert_eq!(archive.scripts.len(), 2);
        for script in &archive.scripts {
            assert_eq!(script.elements.len(), 1);
        }

        let archive = TextArchive {
            identifier: None,
            scripts: archive.scripts,
        };
        let reencoded = write_gsm(&archive, &codec, FallbackPolicy::Error).unwrap();
        assert_eq!(reencoded, input);
    }

    #[test]
    fn detect_layout_picks_archive_start_when_valid() {
        let script_bytes: Vec<u8> = vec![0x41, 0x00];
        let mut buf = vec![0u8; 8];
        let offset = buf.len() as u32;
        buf.extend_from_slice(&script_bytes);
        buf[0..4].copy_from_slice(&offset.to_le_bytes());
        buf[4..8].copy_from_slice(&(script_bytes.len() as u32).to_le_bytes());

        let layout = ArchiveLayout::detect(&buf);
        assert_eq!(layout.pointer_base, PointerBase::AbsoluteFromStart);
    }

    #[test]
    fn detect_layout_falls_back_to_table_end_relative() {
        // One entry whose offset (0) is relative to the table's own end,
        // not the archive start, so archive-start addressing would resolve
        // it to overlapping the table itself and reject it.
        let script_bytes: Vec<u8> = vec![0x41, 0x00];
        let mut buf = vec![0u8; 8];
        buf[0..4].copy_from_slice(&0u32.to_le_bytes());
        buf[4..8].copy_from_slice(&(script_bytes.len() as u32).to_le_bytes());
        buf.extend_from_slice(&script_bytes);

        let layout = ArchiveLayout::detect(&buf);
        assert_eq!(layout.pointer_base, PointerBase::RelativeToPointerTableEnd);
        assert_eq!(layout.entry_count, Some(1));
    }

    #[test]
    fn pointer_table_archive_start_roundtrip() {
        let db = empty_db();
        let codec = codec();
        let layout = ArchiveLayout::archive_relative();

        let script_bytes: Vec<u8> = vec![0x41, 0x00];
        let mut buf = Vec::new();
        buf.extend_from_slice(&[0u8; 8]); // one entry, filled below
        let offset = buf.len() as u32;
        buf.extend_from_slice(&script_bytes);
        buf[0..4].copy_from_slice(&offset.to_le_bytes());
        buf[4..8].copy_from_slice(&(script_bytes.len() as u32).to_le_bytes());

        let archive = read_archive(&buf, &layout, &db, &codec, FallbackPolicy::Error, None).unwrap();
        assert_eq!(archive.scripts.len(), 1);
        assert_eq!(archive.scripts[0].elements.len(), 2);

        let rewritten = write_archive(&archive, &layout, &codec, FallbackPolicy::Error).unwrap();
        let reread = read_archive(&rewritten, &layout, &db, &codec, FallbackPolicy::Error, None).unwrap();
        assert_eq!(reread.scripts[0].elements.len(), 2);
    }
}
