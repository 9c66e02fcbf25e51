//! Script model plus the disassembler/assembler pair that converts between
//! it and a byte buffer, driving the command matcher and text codec from
//! `command.rs`/`database.rs`/`text`.
//!
//! Grounded on the teacher's `read::BitStreamReader`/`bitcode` split: a
//! reader drives a single forward pass producing a flat record sequence,
//! and a symmetrical writer consumes that sequence to reproduce bytes. Here
//! the "records" are richer (commands, text runs, raw bytes, directives)
//! but the forward-pass/no-backtracking shape is the same, aside from the
//! explicit rewind a command may request.

use std::sync::Arc;

use crate::command::{Command, CommandDef};
use crate::database::CommandDatabase;
use crate::error::Error;
use crate::text::{FallbackPolicy, TextCodec};

/// A presentation-only out-of-band marker. Never affects assembled bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveKind {
    TextArchive,
    Script,
    Mugshot,
    TextBoxSeparator,
    TextBoxSplit,
    Command,
}

/// One unit of a [`Script`].
#[derive(Debug, Clone)]
pub enum ScriptElement {
    Command(Command),
    Text(String),
    Byte(u8),
    Directive(DirectiveKind, Option<String>),
}

/// An ordered sequence of script elements, tagged with the name of the
/// command database it was read against.
#[derive(Debug, Clone)]
pub struct Script {
    pub database_name: String,
    pub elements: Vec<ScriptElement>,
}

impl Script {
    #[must_use]
    pub fn new(database_name: impl Into<String>) -> Self {
        Self {
            database_name: database_name.into(),
            elements: Vec::new(),
        }
    }
}

/// Drives a [`CommandDatabase`] and a [`TextCodec`] over a byte buffer to
/// produce a [`Script`].
pub struct Disassembler<'d, 't> {
    database: &'d CommandDatabase,
    text_codec: &'t TextCodec,
    fallback: FallbackPolicy,
}

impl<'d, 't> Disassembler<'d, 't> {
    #[must_use]
    pub fn new(database: &'d CommandDatabase, text_codec: &'t TextCodec, fallback: FallbackPolicy) -> Self {
        Self {
            database,
            text_codec,
            fallback,
        }
    }

    /// Disassembles the whole of `buf` (one script's allotted byte range).
    pub fn disassemble(&self, buf: &[u8]) -> Result<Vec<ScriptElement>, Error> {
        let decoder = self.text_codec.decoder(self.fallback);
        let mut elements = Vec::new();
        let mut text_run = String::new();
        let mut pos = 0usize;

        while pos < buf.len() {
            if let Some(def) = self.database.match_at(buf, pos) {
                flush_text_run(&mut text_run, &mut elements);
                let (values, consumed) = def.extract(buf, pos)?;
                let next = pos + consumed;
                let at_end = next >= buf.len();
                let terminates = def.terminates_script(at_end);
                elements.push(ScriptElement::Command(Command {
                    def: Arc::clone(&def),
                    values,
                }));
                pos = next.saturating_sub(def.rewind_count);
                if terminates {
                    return Ok(elements);
                }
                continue;
            }

            let (unit, consumed) = decoder.next(&buf[pos..], pos)?;
            match unit {
                crate::text::DecodeUnit::Text(s) => text_run.push_str(&s),
                crate::text::DecodeUnit::RawByte(b) => {
                    flush_text_run(&mut text_run, &mut elements);
                    elements.push(ScriptElement::Byte(b));
                }
            }
            pos += consumed;
        }
        flush_text_run(&mut text_run, &mut elements);
        Ok(elements)
    }

    /// Convenience over [`Self::disassemble`] that wraps the result in a
    /// named [`Script`].
    pub fn disassemble_script(&self, buf: &[u8], database_name: impl Into<String>) -> Result<Script, Error> {
        Ok(Script {
            database_name: database_name.into(),
            elements: self.disassemble(buf)?,
        })
    }
}

fn flush_text_run(text_run: &mut String, elements: &mut Vec<ScriptElement>) {
    if !text_run.is_empty() {
        elements.push(ScriptElement::Text(std::mem::take(text_run)));
    }
}

/// Inverse of [`Disassembler`]: walks a [`Script`]'s elements and writes
/// their byte representation.
pub struct Assembler<'t> {
    text_codec: &'t TextCodec,
    fallback: FallbackPolicy,
}

impl<'t> Assembler<'t> {
    #[must_use]
    pub fn new(text_codec: &'t TextCodec, fallback: FallbackPolicy) -> Self {
        Self {
            text_codec,
            fallback,
        }
    }

    /// Assembles `elements` to bytes. `Directive` elements are
    /// presentation-only and contribute nothing.
    pub fn assemble(&self, elements: &[ScriptElement]) -> Result<Vec<u8>, Error> {
        let encoder = self.text_codec.encoder(self.fallback);
        let mut out = Vec::new();
        for el in elements {
            match el {
                ScriptElement::Command(cmd) => out.extend(cmd.def.assemble(&cmd.values)?),
                ScriptElement::Text(s) => out.extend(encoder.encode(s)?),
                ScriptElement::Byte(b) => out.push(*b),
                ScriptElement::Directive(..) => {}
            }
        }
        Ok(out)
    }

    /// Convenience over [`Self::assemble`] for a full [`Script`].
    pub fn assemble_script(&self, script: &Script) -> Result<Vec<u8>, Error> {
        self.assemble(&script.elements)
    }
}

/// Looks up the command a set of elements was read against, for callers
/// that only have a [`ScriptElement`] and want its owning definition.
#[must_use]
pub fn command_def(el: &ScriptElement) -> Option<&Arc<CommandDef>> {
    match el {
        ScriptElement::Command(cmd) => Some(&cmd.def),
        _ => None,
    }
}
