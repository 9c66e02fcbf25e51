//! Text archive codec for GBA/NDS-era dialogue scripts: a byte <-> string
//! text trie, a masked-byte command matcher, and the pointer-table/LZ77
//! container formats scripts are packed into.

pub mod archive;
pub mod command;
pub mod database;
pub mod error;
pub mod lz77;
pub mod masked;
pub mod param;
pub mod script;
pub mod text;
pub mod trie;

pub use self::archive::{ArchiveLayout, PointerBase, TextArchive};
pub use self::command::{Command, CommandDef, CommandElementDef, DataElementDef, EndType, Values};
pub use self::database::{CommandDatabase, CommandSpec, DatabaseSet};
pub use self::error::{CoreResult, Diagnostics, Error, LogDiagnostics};
pub use self::param::ParameterDef;
pub use self::script::{Assembler, Disassembler, DirectiveKind, Script, ScriptElement};
pub use self::text::{CodePoint, Decoder, Encoder, FallbackPolicy, TextCodec};
