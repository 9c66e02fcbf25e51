//! `LookupTrie` exercised with a byte-keyed dictionary shaped like a real
//! game's multi-byte opcode prefix set, rather than the small char-keyed
//! fixtures used in the unit tests.

use textpet_codec::trie::LookupTrie;

#[test]
fn byte_keyed_trie_resolves_shared_prefixes() {
    let mut trie: LookupTrie<u8, &'static str> = LookupTrie::new();
    trie.add(&[0xF0], "menu").unwrap();
    trie.add(&[0xF0, 0x01], "menu-open").unwrap();
    trie.add(&[0xF0, 0x02], "menu-close").unwrap();
    trie.add(&[0xF1], "wait").unwrap();

    assert_eq!(
        trie.try_match_last([0xF0, 0x01]),
        Some(&"menu-open")
    );
    assert_eq!(trie.try_match_first([0xF0, 0x01]), Some(&"menu"));
    assert_eq!(trie.try_match_last([0xF0, 0x03]), Some(&"menu"));
    assert_eq!(trie.try_match_last([0xF2]), None);
}

#[test]
fn cursor_forks_independently_after_clone() {
    let mut trie: LookupTrie<u8, u8> = LookupTrie::new();
    trie.add(&[0x01, 0x02], 12).unwrap();
    trie.add(&[0x01, 0x03], 13).unwrap();

    let mut base = trie.begin_path();
    assert!(base.step(&0x01));
    let mut branch_a = base.clone();
    let mut branch_b = base.clone();
    assert!(branch_a.step(&0x02));
    assert!(branch_b.step(&0x03));
    assert_eq!(branch_a.value(), Some(&12));
    assert_eq!(branch_b.value(), Some(&13));
}
