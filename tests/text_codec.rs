//! Text codec exercised through the public crate surface across a
//! dictionary with overlapping prefixes of varying length, the shape a
//! real game's glyph table takes (single letters plus a handful of
//! multi-character abbreviations).

use textpet_codec::{CodePoint, FallbackPolicy, TextCodec};

fn dictionary() -> TextCodec {
    TextCodec::build(&[
        CodePoint::new(vec![0x01], "\n"),
        CodePoint::new(vec![0x10], "A"),
        CodePoint::new(vec![0x11], "B"),
        CodePoint::new(vec![0x12], "C"),
        CodePoint::new(vec![0x20, 0x00], "the"),
        CodePoint::new(vec![0x20, 0x01], "there"),
    ])
    .unwrap()
}

#[test]
fn maximal_munch_prefers_the_abbreviation_over_letters() {
    let codec = dictionary();
    let text = codec
        .decoder(FallbackPolicy::Error)
        .decode_all(&[0x20, 0x01])
        .unwrap();
    assert_eq!(text, "there");
}

#[test]
fn mixed_dictionary_and_raw_bytes_round_trip() {
    let codec = dictionary();
    let bytes = [0x10, 0x11, 0xFE, 0x20, 0x00];
    let text = codec
        .decoder(FallbackPolicy::Ignore)
        .decode_all(&bytes)
        .unwrap();
    assert_eq!(text, "AB[$FE]the");

    let reencoded = codec.encoder(FallbackPolicy::Error).encode(&text).unwrap();
    assert_eq!(reencoded, bytes);
}

#[test]
fn encoder_picks_the_longer_abbreviation_when_it_is_cheaper() {
    let codec = dictionary();
    // "there" (1 code point, 2 bytes) beats "the" + "r" + "e" (unmapped
    // tail chars would error, but even with a mapping the abbreviation is
    // strictly fewer bytes than any decomposition reachable through "the").
    let bytes = codec.encoder(FallbackPolicy::Error).encode("there").unwrap();
    assert_eq!(bytes, vec![0x20, 0x01]);
}
