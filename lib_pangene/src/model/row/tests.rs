use crate::model::{AlignmentRow, RowKind};

fn both_kinds(alignment_string: &[u8]) -> [AlignmentRow; 2] {
    [
        AlignmentRow::from_alignment_string(RowKind::Map, alignment_string),
        AlignmentRow::from_alignment_string(RowKind::Compact, alignment_string),
    ]
}

#[test]
fn grow_binds_letters_and_skips_gaps() {
    for row in both_kinds(b"AT--GC-") {
        assert_eq!(row.length(), 7);
        assert_eq!(row.bound(), 4);
        assert_eq!(row.map_to_fragment(0), Some(0));
        assert_eq!(row.map_to_fragment(1), Some(1));
        assert_eq!(row.map_to_fragment(2), None);
        assert_eq!(row.map_to_fragment(3), None);
        assert_eq!(row.map_to_fragment(4), Some(2));
        assert_eq!(row.map_to_fragment(5), Some(3));
        assert_eq!(row.map_to_fragment(6), None);
    }
}

#[test]
fn maps_are_mutually_inverse() {
    for row in both_kinds(b"A--TG---CCA-T") {
        for fragment_pos in 0..row.bound() {
            let align_pos = row.map_to_alignment(fragment_pos).unwrap();
            assert_eq!(row.map_to_fragment(align_pos), Some(fragment_pos));
        }
        for align_pos in 0..row.length() {
            if let Some(fragment_pos) = row.map_to_fragment(align_pos) {
                assert_eq!(row.map_to_alignment(fragment_pos), Some(align_pos));
            }
        }
    }
}

#[test]
fn compact_rows_span_many_chunks() {
    let mut alignment_string = vec![b'-'; 400];
    for i in [0usize, 63, 64, 65, 199, 256, 399] {
        alignment_string[i] = b'A';
    }
    let row = AlignmentRow::from_alignment_string(RowKind::Compact, &alignment_string);
    assert_eq!(row.length(), 400);
    assert_eq!(row.bound(), 7);
    assert_eq!(row.map_to_fragment(64), Some(2));
    assert_eq!(row.map_to_alignment(4), Some(199));
    assert_eq!(row.map_to_alignment(6), Some(399));
    assert_eq!(row.map_to_fragment(398), None);
}

#[test]
fn nearest_in_fragment_prefers_the_left() {
    for row in both_kinds(b"A---T") {
        assert_eq!(row.nearest_in_fragment(0), Some(0));
        assert_eq!(row.nearest_in_fragment(2), Some(0));
        assert_eq!(row.nearest_in_fragment(3), Some(1));
        assert_eq!(row.nearest_in_fragment(4), Some(1));
    }
    let gap_only = AlignmentRow::from_alignment_string(RowKind::Map, b"----");
    assert_eq!(gap_only.nearest_in_fragment(2), None);
}

#[test]
fn inverse_mirrors_columns_and_positions() {
    for mut row in both_kinds(b"AT--G") {
        row.inverse();
        assert_eq!(row.length(), 5);
        assert_eq!(row.bound(), 3);
        // Original: 0->0, 1->1, 2->4. Mirrored: 0->0, 1->3, 2->4.
        assert_eq!(row.map_to_alignment(0), Some(0));
        assert_eq!(row.map_to_alignment(1), Some(3));
        assert_eq!(row.map_to_alignment(2), Some(4));
    }
}

#[test]
fn double_inverse_is_identity() {
    for mut row in both_kinds(b"-AT--GC-A") {
        let pairs: Vec<_> = (0..row.length()).map(|ac| row.map_to_fragment(ac)).collect();
        row.inverse();
        row.inverse();
        let again: Vec<_> = (0..row.length()).map(|ac| row.map_to_fragment(ac)).collect();
        assert_eq!(pairs, again);
    }
}

#[test]
fn slice_rebases_columns_and_positions() {
    for row in both_kinds(b"AT--GC-") {
        let (sliced, min_fp, max_fp) = row.slice(1, 5).unwrap();
        assert_eq!((min_fp, max_fp), (1, 3));
        assert_eq!(sliced.length(), 5);
        assert_eq!(sliced.map_to_fragment(0), Some(0));
        assert_eq!(sliced.map_to_fragment(3), Some(1));
        assert_eq!(sliced.map_to_fragment(4), Some(2));
        assert!(row.slice(2, 3).is_none());
    }
}
