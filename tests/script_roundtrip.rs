//! Full disassemble/assemble pipeline through the public API, exercising a
//! command with a data block (not covered by `script.rs`'s own inline
//! tests, which only cover scalar parameters) alongside text runs.

use textpet_codec::command::{CommandElementDef, DataElementDef, EndType};
use textpet_codec::param::ParameterDef;
use textpet_codec::{Assembler, CodePoint, CommandDatabase, CommandSpec, Disassembler, FallbackPolicy, ScriptElement, TextCodec};

fn choice_count_param() -> ParameterDef {
    ParameterDef {
        name: "count".into(),
        description: String::new(),
        offset: 1,
        shift: 0,
        bits: 8,
        addend: 0,
        is_jump: false,
        jump_continue_values: Vec::new(),
        value_encoding: None,
    }
}

fn build_db() -> CommandDatabase {
    let choices = CommandSpec {
        name: "choices".into(),
        description: String::new(),
        base: vec![0x30],
        mask: vec![0xFF],
        end_type: EndType::Never,
        prints: false,
        mugshot_param_name: None,
        priority_length: 0,
        rewind_count: 0,
        elements: vec![CommandElementDef::Data(DataElementDef {
            name: "entries".into(),
            length: choice_count_param(),
            data_block_offset: 2,
            data_params: vec![ParameterDef {
                name: "target".into(),
                description: String::new(),
                offset: 0,
                shift: 0,
                bits: 8,
                addend: 0,
                is_jump: true,
                jump_continue_values: Vec::new(),
                value_encoding: None,
            }],
        })],
        extends: None,
    };
    let end = CommandSpec {
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
    };
    CommandDatabase::build("dialogue", vec![choices, end]).unwrap()
}

fn build_codec() -> TextCodec {
    TextCodec::build(&[
        CodePoint::new(vec![0x41], "A"),
        CodePoint::new(vec![0x42], "B"),
    ])
    .unwrap()
}

#[test]
fn text_run_data_block_command_and_terminator_round_trip() {
    let db = build_db();
    let codec = build_codec();
    // "AB" + choices(2 entries: targets 0x05, 0x09) + end
    let buf = [0x41, 0x42, 0x30, 0x02, 0x05, 0x09, 0x00];

    let dis = Disassembler::new(&db, &codec, FallbackPolicy::Error);
    let elements = dis.disassemble(&buf).unwrap();
    assert_eq!(elements.len(), 3);
    assert!(matches!(&elements[0], ScriptElement::Text(s) if s == "AB"));
    let ScriptElement::Command(choices_cmd) = &elements[1] else {
        panic!("expected the choices command");
    };
    assert_eq!(choices_cmd.def.name, "choices");
    assert_eq!(
        choices_cmd.values.rows("entries"),
        Some(&vec![vec![5], vec![9]])
    );
    assert!(matches!(&elements[2], ScriptElement::Command(c) if c.def.name == "end"));

    let asm = Assembler::new(&codec, FallbackPolicy::Error);
    let reassembled = asm.assemble(&elements).unwrap();
    assert_eq!(reassembled, buf);
}

#[test]
fn disassemble_script_tags_the_database_name() {
    let db = build_db();
    let codec = build_codec();
    let dis = Disassembler::new(&db, &codec, FallbackPolicy::Error);
    let script = dis.disassemble_script(&[0x00], "dialogue").unwrap();
    assert_eq!(script.database_name, "dialogue");
    assert_eq!(script.elements.len(), 1);
}
