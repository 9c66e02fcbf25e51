//! Command lookup through `CommandDatabase`/`DatabaseSet`, covering
//! extension-aware matching and explicit-order database chaining — the
//! pieces that only come together above the bare `CommandMatcher`.

use textpet_codec::command::{CommandElementDef, EndType};
use textpet_codec::param::ParameterDef;
use textpet_codec::{CommandDatabase, CommandSpec, DatabaseSet};

fn scalar(name: &str, offset: usize, bits: u8) -> ParameterDef {
    ParameterDef {
        name: name.into(),
        description: String::new(),
        offset,
        shift: 0,
        bits,
        addend: 0,
        is_jump: false,
        jump_continue_values: Vec::new(),
        value_encoding: None,
    }
}

fn spec(name: &str, base: &[u8], priority_length: usize, extends: Option<&str>) -> CommandSpec {
    CommandSpec {
        name: name.into(),
        description: String::new(),
        base: base.to_vec(),
        mask: vec![0xFF; base.len()],
        end_type: EndType::Never,
        prints: false,
        mugshot_param_name: None,
        priority_length,
        rewind_count: 0,
        elements: Vec::new(),
        extends: extends.map(String::from),
    }
}

#[test]
fn extended_command_matches_with_inherited_elements_and_its_own_opcode() {
    let mut base = spec("wait-base", &[0x10], 0, None);
    base.elements = vec![CommandElementDef::Scalar(scalar("frames", 1, 8))];
    let derived = spec("wait-long", &[0x11], 0, Some("wait-base"));

    let db = CommandDatabase::build("dialogue", vec![base, derived]).unwrap();
    let matched = db.match_at(&[0x11, 0x2A], 0).unwrap();
    assert_eq!(matched.name, "wait-long");
    let (values, consumed) = matched.extract(&[0x11, 0x2A], 0).unwrap();
    assert_eq!(consumed, 2);
    assert_eq!(values.scalar("frames"), Some(0x2A));
}

#[test]
fn database_set_consults_databases_in_explicit_order() {
    let common = CommandDatabase::build("common", vec![spec("pause", &[0x01], 0, None)]).unwrap();
    let override_db = CommandDatabase::build("override", vec![spec("pause-v2", &[0x01], 0, None)]).unwrap();

    // "override" listed first: its definition for opcode 0x01 wins even
    // though "common" also has a match.
    let set = DatabaseSet::new(vec![override_db, common]);
    let (_, def) = set.match_at(&[0x01], 0).unwrap();
    assert_eq!(def.name, "pause-v2");
}

#[test]
fn database_set_falls_through_to_a_later_database_on_miss() {
    let first = CommandDatabase::build("first", vec![spec("a", &[0x01], 0, None)]).unwrap();
    let second = CommandDatabase::build("second", vec![spec("b", &[0x02], 0, None)]).unwrap();
    let set = DatabaseSet::new(vec![first, second]);
    let (db, def) = set.match_at(&[0x02], 0).unwrap();
    assert_eq!(db.name, "second");
    assert_eq!(def.name, "b");
}
