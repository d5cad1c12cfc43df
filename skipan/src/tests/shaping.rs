//! End-to-end shaping tests over synthetic fonts.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use types::Tag;

use super::builders::*;
use super::test_helpers::{glyph_ids, shape, TestFont};
use crate::album::Point;
use crate::{Album, Artist, Font, Scheme, TextDirection, TextMode};

fn gsub_font(mappings: &[(char, u16)], features: &[(&[u8; 4], &[u16])], lookups: &[Vec<u8>]) -> TestFont {
    TestFont::new()
        .map_chars(mappings)
        .with_gsub(layout_table(b"latn", features, lookups))
}

#[test]
fn single_subst_format1_applies_delta() {
    let font = gsub_font(
        &[('a', 1)],
        &[(b"ccmp", &[0])],
        &[lookup(1, 0, &[single_subst_format1(&[1], -1)])],
    );
    let album = shape(font, b"latn", "a", TextDirection::LeftToRight, &[]);
    assert_eq!(glyph_ids(&album), vec![0]);
}

#[test]
fn single_subst_format2_replaces_from_array() {
    let font = gsub_font(
        &[('a', 1)],
        &[(b"ccmp", &[0])],
        &[lookup(1, 0, &[single_subst_format2(&[(1, 7)])])],
    );
    let album = shape(font, b"latn", "a", TextDirection::LeftToRight, &[]);
    assert_eq!(glyph_ids(&album), vec![7]);
}

#[test]
fn lookups_apply_in_ascending_index_order() {
    // the feature lists its lookups out of order; ascending application
    // chains 1 -> 2 -> 3, anything else stops at 2
    let font = gsub_font(
        &[('a', 1)],
        &[(b"ccmp", &[1, 0])],
        &[
            lookup(1, 0, &[single_subst_format2(&[(1, 2)])]),
            lookup(1, 0, &[single_subst_format2(&[(2, 3)])]),
        ],
    );
    let album = shape(font, b"latn", "a", TextDirection::LeftToRight, &[]);
    assert_eq!(glyph_ids(&album), vec![3]);
}

#[test]
fn first_matching_subtable_wins() {
    let font = gsub_font(
        &[('a', 1)],
        &[(b"ccmp", &[0])],
        &[lookup(
            1,
            0,
            &[
                // misses, so the next subtable gets its chance
                single_subst_format2(&[(5, 6)]),
                single_subst_format2(&[(1, 7)]),
                // would hit, but a prior subtable already applied
                single_subst_format2(&[(1, 8)]),
            ],
        )],
    );
    let album = shape(font, b"latn", "a", TextDirection::LeftToRight, &[]);
    assert_eq!(glyph_ids(&album), vec![7]);
}

#[test]
fn multiple_subst_expands_with_shared_association() {
    let font = gsub_font(
        &[('a', 1)],
        &[(b"ccmp", &[0])],
        &[lookup(2, 0, &[multiple_subst(&[(1, &[4, 5, 6])])])],
    );
    let album = shape(font, b"latn", "a", TextDirection::LeftToRight, &[]);
    assert_eq!(glyph_ids(&album), vec![4, 5, 6]);
    // every expanded glyph maps back to the same code unit; the first
    // takes priority in the map
    assert_eq!(album.codeunit_to_glyph_map(), &[0]);
    assert_eq!(album.association(1), 0);
    assert_eq!(album.association(2), 0);
}

#[test]
fn empty_sequence_does_not_delete() {
    let font = gsub_font(
        &[('a', 1)],
        &[(b"ccmp", &[0])],
        &[lookup(2, 0, &[multiple_subst(&[(1, &[])])])],
    );
    let album = shape(font, b"latn", "a", TextDirection::LeftToRight, &[]);
    assert_eq!(glyph_ids(&album), vec![1]);
}

#[test]
fn alternate_subst_picks_by_feature_value() {
    let lookups = vec![lookup(3, 0, &[alternate_subst(&[(1, &[7, 8])])])];
    let features: &[(&[u8; 4], &[u16])] = &[(b"salt", &[0])];

    // 'salt' is unknown to the script knowledge, so it only applies when
    // the user enables it; its value selects the alternate
    let font = gsub_font(&[('a', 1)], features, &lookups);
    let album = shape(font, b"latn", "a", TextDirection::LeftToRight, &[]);
    assert_eq!(glyph_ids(&album), vec![1]);

    let font = gsub_font(&[('a', 1)], features, &lookups);
    let album = shape(
        font,
        b"latn",
        "a",
        TextDirection::LeftToRight,
        &[(Tag::new(b"salt"), 2)],
    );
    assert_eq!(glyph_ids(&album), vec![8]);
}

#[test]
fn ligature_subst_consumes_whole_run() {
    let font = gsub_font(
        &[('a', 1), ('b', 2), ('c', 3), ('d', 4), ('e', 5)],
        &[(b"liga", &[0])],
        &[lookup(4, 0, &[ligature_subst(&[(1, &[(&[2, 3, 4, 5], 10)])])])],
    );
    let album = shape(font, b"latn", "abcde", TextDirection::LeftToRight, &[]);
    assert_eq!(glyph_ids(&album), vec![10]);
    // the surviving glyph keeps the association of the original first glyph
    assert_eq!(album.association(0), 0);
    assert_eq!(album.codeunit_to_glyph_map(), &[0, 0, 0, 0, 0]);
}

#[test]
fn ligature_matches_across_ignored_marks() {
    let font = TestFont::new()
        .map_chars(&[('a', 1), ('m', 9), ('b', 2)])
        .with_gdef(gdef_with_classes(&[(1, 1), (2, 1), (9, 3)]))
        .with_gsub(layout_table(
            b"latn",
            &[(b"liga", &[0])],
            // IgnoreMarks, so the mark between the components is skipped
            &[lookup(4, 0x0008, &[ligature_subst(&[(1, &[(&[2], 10)])])])],
        ));
    let album = shape(font, b"latn", "amb", TextDirection::LeftToRight, &[]);
    // the component becomes a placeholder and is removed at wrap-up; the
    // mark survives
    assert_eq!(glyph_ids(&album), vec![10, 9]);
    assert_eq!(album.codeunit_to_glyph_map(), &[0, 0, 0]);
}

#[test]
fn chained_context_applies_nested_lookup() {
    let font = gsub_font(
        &[('a', 1), ('b', 2), ('c', 3)],
        &[(b"ccmp", &[0])],
        &[
            lookup(
                6,
                0,
                &[chain_context_format3(&[&[1]], &[&[2]], &[&[3]], &[(0, 1)])],
            ),
            lookup(1, 0, &[single_subst_format2(&[(2, 9)])]),
        ],
    );
    let album = shape(font, b"latn", "abc", TextDirection::LeftToRight, &[]);
    assert_eq!(glyph_ids(&album), vec![1, 9, 3]);
}

#[test]
fn chained_context_requires_backtrack_and_lookahead() {
    let lookups = vec![
        lookup(
            6,
            0,
            &[chain_context_format3(&[&[1]], &[&[2]], &[&[3]], &[(0, 1)])],
        ),
        lookup(1, 0, &[single_subst_format2(&[(2, 9)])]),
    ];
    // same rule, but the lookahead glyph is absent
    let font = gsub_font(&[('a', 1), ('b', 2), ('x', 8)], &[(b"ccmp", &[0])], &lookups);
    let album = shape(font, b"latn", "abx", TextDirection::LeftToRight, &[]);
    assert_eq!(glyph_ids(&album), vec![1, 2, 8]);
}

#[test]
fn extension_unwraps_to_inner_type() {
    let font = gsub_font(
        &[('a', 1)],
        &[(b"ccmp", &[0])],
        &[lookup(
            7,
            0,
            &[extension(1, &single_subst_format2(&[(1, 7)]))],
        )],
    );
    let album = shape(font, b"latn", "a", TextDirection::LeftToRight, &[]);
    assert_eq!(glyph_ids(&album), vec![7]);
}

#[test]
fn single_pos_adjusts_covered_glyph() {
    let font = TestFont::new()
        .map_chars(&[('a', 1)])
        .with_advance(1, 1000)
        .with_gpos(layout_table(
            b"latn",
            &[(b"kern", &[0])],
            &[lookup(1, 0, &[single_pos_format1(&[1], (5, -5, 50, 0))])],
        ));
    let album = shape(font, b"latn", "a", TextDirection::LeftToRight, &[]);
    assert_eq!(album.glyph_offsets(), &[Point { x: 5, y: -5 }]);
    // the x advance adjustment lands on top of the font advance
    assert_eq!(album.glyph_advances(), &[1050]);
}

#[test]
fn pair_pos_format1_applies_both_value_records() {
    let font = TestFont::new()
        .map_chars(&[('a', 1), ('b', 2)])
        .with_gpos(layout_table(
            b"latn",
            &[(b"kern", &[0])],
            &[lookup(
                2,
                0,
                &[pair_pos_format1(&[(
                    1,
                    &[(2, (100, 200, 300, 400), (600, 700, 800, 900))],
                )])],
            )],
        ));
    let album = shape(font, b"latn", "ab", TextDirection::LeftToRight, &[]);
    assert_eq!(
        album.glyph_offsets(),
        &[Point { x: 100, y: 200 }, Point { x: 600, y: 700 }]
    );
    // y advances are ignored (no vertical layout)
    assert_eq!(album.glyph_advances(), &[300, 800]);
}

#[test]
fn pair_rules_chain_when_second_value_is_absent() {
    // with no value2 the cursor is not advanced past the second glyph, so
    // overlapping pairs both apply
    let font = TestFont::new()
        .map_chars(&[('a', 1), ('b', 2), ('c', 3)])
        .with_gpos(layout_table(
            b"latn",
            &[(b"kern", &[0])],
            &[lookup(
                2,
                0,
                &[pair_pos_format1_first_only(&[
                    (1, &[(2, 10)]),
                    (2, &[(3, 20)]),
                ])],
            )],
        ));
    let album = shape(font, b"latn", "abc", TextDirection::LeftToRight, &[]);
    assert_eq!(album.glyph_advances(), &[10, 20, 0]);
}

#[test]
fn cursive_chain_resolves_left_to_right() {
    let font = TestFont::new()
        .map_chars(&[('a', 1), ('b', 2), ('c', 3), ('d', 4), ('e', 5)])
        .with_gpos(layout_table(
            b"arab",
            &[(b"curs", &[0])],
            &[lookup(
                3,
                0,
                &[cursive_pos(&[
                    (1, None, Some((-800, -700))),
                    (2, Some((-600, -500)), Some((-400, -300))),
                    (3, Some((-200, -100)), Some((0, 100))),
                    (4, Some((200, 300)), Some((400, 500))),
                    (5, Some((600, 700)), None),
                ])],
            )],
        ));
    let album = shape(font, b"arab", "abcde", TextDirection::LeftToRight, &[]);

    assert_eq!(album.glyph_advances(), &[-800, 200, 200, 200, -600]);
    let y_offsets: Vec<i32> = album.glyph_offsets().iter().map(|point| point.y).collect();
    assert_eq!(y_offsets, vec![0, -200, -400, -600, -800]);
    let x_offsets: Vec<i32> = album.glyph_offsets().iter().map(|point| point.x).collect();
    assert_eq!(x_offsets, vec![0, 600, 200, -200, -600]);
}

#[test]
fn mark_attaches_to_preceding_base() {
    let font = TestFont::new()
        .map_chars(&[('a', 1), ('m', 2)])
        .with_gdef(gdef_with_classes(&[(1, 1), (2, 3)]))
        .with_gpos(layout_table(
            b"latn",
            &[(b"mark", &[0])],
            &[lookup(
                4,
                0,
                &[mark_base_pos(&[(2, 0, (50, -50))], &[(1, &[(-50, 50)])], 1)],
            )],
        ));
    let album = shape(font, b"latn", "am", TextDirection::LeftToRight, &[]);

    assert_eq!(album.glyph_offsets()[1], Point { x: -100, y: 100 });
    assert_eq!(album.attachment_offset(1), 1);
}

#[test]
fn mark_gap_subtracts_intervening_advances() {
    // the base carries an advance, which the mark's absolute x must undo
    let font = TestFont::new()
        .map_chars(&[('a', 1), ('m', 2)])
        .with_gdef(gdef_with_classes(&[(1, 1), (2, 3)]))
        .with_advance(1, 600)
        .with_gpos(layout_table(
            b"latn",
            &[(b"mark", &[0])],
            &[lookup(
                4,
                0,
                &[mark_base_pos(&[(2, 0, (0, 0))], &[(1, &[(250, 0)])], 1)],
            )],
        ));
    let album = shape(font, b"latn", "am", TextDirection::LeftToRight, &[]);

    // anchor x (250) minus the base's advance (600)
    assert_eq!(album.glyph_offsets()[1], Point { x: -350, y: 0 });
}

#[test]
fn mark_attaches_to_preceding_mark() {
    let font = TestFont::new()
        .map_chars(&[('a', 1), ('m', 2), ('n', 3)])
        .with_gdef(gdef_with_classes(&[(1, 1), (2, 3), (3, 3)]))
        .with_gpos(layout_table(
            b"latn",
            &[(b"mkmk", &[0])],
            &[lookup(
                6,
                0,
                &[mark_mark_pos(&[(3, 0, (10, 10))], &[(2, &[(30, 40)])], 1)],
            )],
        ));
    let album = shape(font, b"latn", "amn", TextDirection::LeftToRight, &[]);

    assert_eq!(album.glyph_offsets()[2], Point { x: 20, y: 30 });
    assert_eq!(album.attachment_offset(2), 1);
}

#[test]
fn arabic_positional_forms_follow_joining_masks() {
    let font = TestFont::new()
        .map_chars(&[('\u{0628}', 1), ('\u{0631}', 2), ('\u{0627}', 3)])
        .with_gsub(layout_table(
            b"arab",
            &[
                (b"isol", &[0]),
                (b"fina", &[1]),
                (b"medi", &[2]),
                (b"init", &[3]),
            ],
            &[
                lookup(1, 0, &[single_subst_format2(&[(1, 11), (2, 12), (3, 13)])]),
                lookup(1, 0, &[single_subst_format2(&[(1, 41), (2, 42), (3, 43)])]),
                lookup(1, 0, &[single_subst_format2(&[(1, 31), (2, 32), (3, 33)])]),
                lookup(1, 0, &[single_subst_format2(&[(1, 21), (2, 22), (3, 23)])]),
            ],
        ));
    // BA RA ALEF: initial, final, isolated
    let album = shape(
        font,
        b"arab",
        "\u{0628}\u{0631}\u{0627}",
        TextDirection::RightToLeft,
        &[],
    );
    assert_eq!(glyph_ids(&album), vec![21, 42, 13]);
}

#[test]
fn off_feature_enabled_by_override() {
    let lookups = vec![lookup(1, 0, &[single_subst_format2(&[(1, 2)])])];
    let features: &[(&[u8; 4], &[u16])] = &[(b"dlig", &[0])];

    let font = TestFont::new()
        .map_chars(&[('a', 1)])
        .with_gsub(layout_table(b"arab", features, &lookups));
    let album = shape(font, b"arab", "a", TextDirection::LeftToRight, &[]);
    assert_eq!(glyph_ids(&album), vec![1]);

    let font = TestFont::new()
        .map_chars(&[('a', 1)])
        .with_gsub(layout_table(b"arab", features, &lookups));
    let album = shape(
        font,
        b"arab",
        "a",
        TextDirection::LeftToRight,
        &[(Tag::new(b"dlig"), 1)],
    );
    assert_eq!(glyph_ids(&album), vec![2]);
}

#[test]
fn on_feature_disabled_by_override() {
    let font = TestFont::new()
        .map_chars(&[('a', 1), ('b', 2)])
        .with_gpos(layout_table(
            b"latn",
            &[(b"kern", &[0])],
            &[lookup(2, 0, &[pair_pos_format1_first_only(&[(1, &[(2, 10)])])])],
        ));
    let album = shape(
        font,
        b"latn",
        "ab",
        TextDirection::LeftToRight,
        &[(Tag::new(b"kern"), 0)],
    );
    assert_eq!(album.glyph_advances(), &[0, 0]);
}

#[test]
fn unsupported_script_produces_no_pattern() {
    let font = TestFont::new()
        .map_chars(&[('a', 1)])
        .with_gsub(layout_table(b"latn", &[], &[]));
    let font = Arc::new(Font::new(font));

    let mut scheme = Scheme::new();
    scheme.set_font(font).set_script_tag(Tag::new(b"zzzz"));
    assert!(scheme.build_pattern().is_none());
}

#[test]
fn tableless_font_produces_no_pattern() {
    let font = Arc::new(Font::new(TestFont::new()));
    let mut scheme = Scheme::new();
    scheme.set_font(font).set_script_tag(Tag::new(b"latn"));
    assert!(scheme.build_pattern().is_none());
}

#[test]
fn shaping_without_pattern_still_yields_glyphs_and_advances() {
    let font = Arc::new(Font::new(
        TestFont::new().map_chars(&[('a', 7)]).with_advance(7, 500),
    ));

    let mut album = Album::new();
    let mut artist = Artist::new();
    artist
        .set_text("a")
        .set_font(font)
        .set_text_direction(TextDirection::LeftToRight);
    artist.fill_album(&mut album);

    assert_eq!(glyph_ids(&album), vec![7]);
    assert_eq!(album.glyph_advances(), &[500]);
    assert_eq!(album.codeunit_to_glyph_map(), &[0]);
}

#[test]
fn rtl_shaping_substitutes_mirror_characters() {
    let font = Arc::new(Font::new(
        TestFont::new().map_chars(&[('(', 5), (')', 6)]),
    ));

    let mut album = Album::new();
    let mut artist = Artist::new();
    artist
        .set_text("(")
        .set_font(font)
        .set_text_direction(TextDirection::RightToLeft);
    artist.fill_album(&mut album);

    assert_eq!(glyph_ids(&album), vec![6]);
}

#[test]
fn zero_width_codepoints_lose_their_advance() {
    let font = Arc::new(Font::new(
        TestFont::new()
            .map_chars(&[('\u{200B}', 15)])
            .with_advance(15, 500),
    ));

    let mut album = Album::new();
    let mut artist = Artist::new();
    artist.set_text("\u{200B}").set_font(font);
    artist.fill_album(&mut album);

    assert_eq!(album.glyph_advances(), &[0]);
}

#[test]
fn backward_mode_reverses_consumption_order() {
    let font = Arc::new(Font::new(
        TestFont::new().map_chars(&[('a', 1), ('b', 2)]),
    ));

    let mut album = Album::new();
    let mut artist = Artist::new();
    artist
        .set_text("ab")
        .set_font(font)
        .set_text_mode(TextMode::Backward);
    artist.fill_album(&mut album);

    assert_eq!(glyph_ids(&album), vec![2, 1]);
    assert_eq!(album.codeunit_to_glyph_map(), &[1, 0]);
}
