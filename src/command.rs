//! Command definitions, masked-byte matching, and bit-packed parameter
//! extraction/assembly for a single command instance.
//!
//! Grounded on the teacher's abbreviation model (`bitstream::Abbreviation`,
//! `bitcode::RecordIter`): a definition describes a sequence of typed
//! fields, an instance is read by walking that sequence against a cursor
//! into the buffer, and a trailing "array"/"blob" payload (here: the
//! repeated data block) is handled as a distinct, variable-length tail.

use std::collections::HashMap;
use std::sync::Arc;

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::error::Error;
use crate::masked::{MaskedByte, MaskedByteTrie};
use crate::param::ParameterDef;

/// Whether a command unconditionally, conditionally, or never terminates
/// the script it appears in. Database definition files store this as a
/// single byte value, hence the explicit repr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum EndType {
    /// Terminates iff the command's base has any non-zero bit, or the
    /// buffer head has reached the script's allotted end.
    Default = 0,
    /// Always terminates the script.
    Always = 1,
    /// Never terminates the script.
    Never = 2,
}

/// A repeated data block: a length parameter followed by `N` fixed-stride
/// rows, each row's field offsets relative to the row's own start.
#[derive(Debug, Clone)]
pub struct DataElementDef {
    /// Name this element's rows are stored under in [`Command::values`].
    pub name: String,
    /// Yields `N`, the row count.
    pub length: ParameterDef,
    /// Byte offset (from the start of the command) where row 0 begins.
    pub data_block_offset: usize,
    /// Per-row field templates; `offset` is relative to the row start.
    pub data_params: Vec<ParameterDef>,
}

impl DataElementDef {
    /// `data_params != ∅`, i.e. whether rows carry more than just a count.
    #[must_use]
    pub fn has_multiple_data_entries(&self) -> bool {
        !self.data_params.is_empty()
    }

    /// Row stride: the smallest byte count covering the highest
    /// referenced bit across the row's data parameters.
    #[must_use]
    pub fn row_stride(&self) -> usize {
        self.data_params
            .iter()
            .map(|p| (p.offset * 8 + p.shift as usize + p.bits as usize).div_ceil(8))
            .max()
            .unwrap_or(0)
    }
}

/// Either a single bit-packed field, or a data block.
#[derive(Debug, Clone)]
pub enum CommandElementDef {
    Scalar(ParameterDef),
    Data(DataElementDef),
}

impl CommandElementDef {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Scalar(p) => &p.name,
            Self::Data(d) => &d.name,
        }
    }
}

/// A named, bit-pattern-matched opcode with structured parameter fields
/// and an optional trailing data block.
#[derive(Debug, Clone)]
pub struct CommandDef {
    pub name: String,
    pub description: String,
    /// Raw opcode bytes (masked positions still carry whatever bit pattern
    /// the database author wrote; only the mask determines what's don't-care).
    pub base: Vec<u8>,
    /// Same length as `base`.
    pub mask: Vec<u8>,
    pub end_type: EndType,
    pub prints: bool,
    pub mugshot_param_name: Option<String>,
    pub priority_length: usize,
    /// Bytes to unconsume after this command, enabling intentional opcode
    /// overlap with a following command.
    pub rewind_count: usize,
    pub elements: Vec<CommandElementDef>,
    /// Assigned by [`crate::database::CommandDatabase`] at load time;
    /// breaks matcher ties in insertion order.
    pub(crate) insertion_order: usize,
}

impl CommandDef {
    /// Whether `buf[pos..]` matches this command's base/mask pattern.
    #[must_use]
    pub fn matches_at(&self, buf: &[u8], pos: usize) -> bool {
        if pos + self.base.len() > buf.len() {
            return false;
        }
        self.base
            .iter()
            .zip(&self.mask)
            .enumerate()
            .all(|(i, (&b, &m))| (buf[pos + i] & m) == (b & m))
    }

    /// As masked-byte keys, for trie insertion.
    #[must_use]
    pub fn masked_key(&self) -> Vec<MaskedByte> {
        self.base
            .iter()
            .zip(&self.mask)
            .map(|(&byte, &mask)| MaskedByte { byte, mask })
            .collect()
    }

    /// §4.5 end-of-script rule.
    #[must_use]
    pub fn terminates_script(&self, at_script_end: bool) -> bool {
        match self.end_type {
            EndType::Always => true,
            EndType::Never => false,
            EndType::Default => at_script_end || self.base.iter().any(|&b| b != 0),
        }
    }

    /// Reads this command's element values out of `buf[pos..]`.
    ///
    /// Returns the populated value map and the total number of bytes this
    /// command instance occupies (base plus any scalar fields and data
    /// block rows), *before* `rewind_count` is applied.
    pub fn extract(&self, buf: &[u8], pos: usize) -> Result<(Values, usize), Error> {
        let slice = buf
            .get(pos..)
            .ok_or_else(|| Error::InvalidInput("command read past end of buffer".into()))?;
        let mut consumed = self.base.len();
        let mut values = Values::new();
        for el in &self.elements {
            match el {
                CommandElementDef::Scalar(p) => {
                    let value = p.read(slice)?;
                    values.0.insert(p.name.clone(), vec![vec![value]]);
                    consumed = consumed.max(field_end(p));
                }
                CommandElementDef::Data(d) => {
                    let n = d.length.read(slice)?;
                    if n < 0 {
                        return Err(Error::InvalidInput("negative data row count".into()));
                    }
                    let n = n as usize;
                    let stride = d.row_stride();
                    let mut rows = Vec::with_capacity(n);
                    let mut end = d.data_block_offset;
                    for row in 0..n {
                        let row_start = d.data_block_offset + row * stride;
                        let mut cols = Vec::with_capacity(d.data_params.len());
                        for dp in &d.data_params {
                            cols.push(read_relative(dp, slice, row_start)?);
                        }
                        rows.push(cols);
                        end = row_start + stride;
                    }
                    values.0.insert(d.name.clone(), rows);
                    consumed = consumed.max(end);
                }
            }
        }
        Ok((values, consumed))
    }

    /// Inverse of [`Self::extract`]: writes `values` into a freshly
    /// allocated buffer holding this command's base bytes plus every
    /// element field.
    pub fn assemble(&self, values: &Values) -> Result<Vec<u8>, Error> {
        let mut len = self.base.len();
        for el in &self.elements {
            len = len.max(match el {
                CommandElementDef::Scalar(p) => field_end(p),
                CommandElementDef::Data(d) => {
                    let rows = values.rows(&d.name).map(Vec::len).unwrap_or(0);
                    d.data_block_offset + rows * d.row_stride()
                }
            });
        }
        let mut buf = vec![0u8; len];
        buf[..self.base.len()].copy_from_slice(&self.base);
        for el in &self.elements {
            match el {
                CommandElementDef::Scalar(p) => {
                    let value = values.scalar(&p.name).unwrap_or(0);
                    p.write(&mut buf, value)?;
                }
                CommandElementDef::Data(d) => {
                    let rows = values.rows(&d.name).cloned().unwrap_or_default();
                    d.length.write(&mut buf, rows.len() as i64)?;
                    let stride = d.row_stride();
                    for (row, cols) in rows.iter().enumerate() {
                        let row_start = d.data_block_offset + row * stride;
                        for (dp, &value) in d.data_params.iter().zip(cols) {
                            write_relative(dp, &mut buf, row_start, value)?;
                        }
                    }
                }
            }
        }
        Ok(buf)
    }
}

fn field_end(p: &ParameterDef) -> usize {
    (p.offset * 8 + p.shift as usize + p.bits as usize).div_ceil(8)
}

fn read_relative(dp: &ParameterDef, buf: &[u8], row_start: usize) -> Result<i64, Error> {
    let mut shifted = dp.clone();
    shifted.offset += row_start;
    shifted.read(buf)
}

fn write_relative(dp: &ParameterDef, buf: &mut [u8], row_start: usize, value: i64) -> Result<(), Error> {
    let mut shifted = dp.clone();
    shifted.offset += row_start;
    shifted.write(buf, value)
}

/// A command instance's extracted field values: element name → rows →
/// scalar values. Scalars are a single row with a single column.
#[derive(Debug, Clone, Default)]
pub struct Values(pub HashMap<String, Vec<Vec<i64>>>);

impl Values {
    #[must_use]
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    #[must_use]
    pub fn scalar(&self, name: &str) -> Option<i64> {
        self.0.get(name)?.first()?.first().copied()
    }

    #[must_use]
    pub fn rows(&self, name: &str) -> Option<&Vec<Vec<i64>>> {
        self.0.get(name)
    }

    pub fn set_scalar(&mut self, name: impl Into<String>, value: i64) {
        self.0.insert(name.into(), vec![vec![value]]);
    }

    pub fn set_rows(&mut self, name: impl Into<String>, rows: Vec<Vec<i64>>) {
        self.0.insert(name.into(), rows);
    }
}

/// An instance of a [`CommandDef`] plus its extracted values.
#[derive(Debug, Clone)]
pub struct Command {
    pub def: Arc<CommandDef>,
    pub values: Values,
}

/// Masked-byte trie over a set of command definitions, implementing the
/// first-byte-bypass dispatch and priority-based disambiguation of §4.5.
pub struct CommandMatcher {
    trie: MaskedByteTrie<Arc<CommandDef>>,
}

impl CommandMatcher {
    pub fn build(defs: &[Arc<CommandDef>]) -> Result<Self, Error> {
        let mut trie = MaskedByteTrie::new();
        for def in defs {
            trie.add(&def.masked_key(), Arc::clone(def))?;
        }
        Ok(Self { trie })
    }

    /// Identifies the command at `buf[pos..]`, if any, per the two-level
    /// preference of §4.5: greatest `priority_length` wins; tie → longest
    /// base wins; tie → first-inserted wins.
    #[must_use]
    pub fn match_at(&self, buf: &[u8], pos: usize) -> Option<Arc<CommandDef>> {
        let mut cursor = self.trie.begin_path();
        let mut best: Option<(&Arc<CommandDef>, usize)> = None;
        for &byte in buf.get(pos..)? {
            if !cursor.step(byte) {
                break;
            }
            if let Some(def) = cursor.value() {
                let depth = cursor.depth();
                best = Some(match best {
                    None => (def, depth),
                    Some((bdef, bdepth)) => pick_better(def, depth, bdef, bdepth),
                });
            }
        }
        best.map(|(def, _)| Arc::clone(def))
    }
}

fn pick_better<'a>(
    def: &'a Arc<CommandDef>,
    depth: usize,
    bdef: &'a Arc<CommandDef>,
    bdepth: usize,
) -> (&'a Arc<CommandDef>, usize) {
    use std::cmp::Ordering;
    match def.priority_length.cmp(&bdef.priority_length) {
        Ordering::Greater => (def, depth),
        Ordering::Less => (bdef, bdepth),
        Ordering::Equal => match depth.cmp(&bdepth) {
            Ordering::Greater => (def, depth),
            Ordering::Less => (bdef, bdepth),
            Ordering::Equal => {
                if def.insertion_order <= bdef.insertion_order {
                    (def, depth)
                } else {
                    (bdef, bdepth)
                }
            }
        },
    }
}
