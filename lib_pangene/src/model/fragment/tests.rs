use std::sync::Arc;

use crate::model::{AlignmentRow, Fragment, Ori, RowKind, Sequence, SequenceKind};

fn seq(letters: &[u8]) -> Arc<Sequence> {
    Arc::new(Sequence::from_letters(SequenceKind::AsIs, "s", letters))
}

#[test]
fn reading_direction_and_derived_positions() {
    let sequence = seq(b"ATGCATTG");
    let forward = Fragment::new(sequence.clone(), 2, 5, Ori::Forward);
    assert_eq!(forward.length(), 4);
    assert_eq!(forward.begin_pos(), 2);
    assert_eq!(forward.last_pos(), 5);
    assert_eq!(forward.end_pos(), 6);
    assert_eq!(forward.letters(), b"GCAT");
    assert_eq!(forward.id(), "s_2_5");

    let reverse = Fragment::new(sequence, 2, 5, Ori::Reverse);
    assert_eq!(reverse.begin_pos(), 5);
    assert_eq!(reverse.last_pos(), 2);
    assert_eq!(reverse.end_pos(), 1);
    assert_eq!(reverse.letters(), b"ATGC");
    assert_eq!(reverse.id(), "s_5_2");
}

#[test]
fn at_accepts_negative_positions() {
    let fragment = Fragment::new(seq(b"ATGCATTG"), 0, 3, Ori::Forward);
    assert_eq!(fragment.at(0), b'A');
    assert_eq!(fragment.at(-1), b'C');
    assert_eq!(fragment.substr(1, 2), b"TG");
    assert_eq!(fragment.substr(-2, -1), b"GC");
}

#[test]
fn seq_name_from_id_parses_fragment_ids() {
    assert_eq!(Fragment::seq_name_from_id("s_2_5"), Some("s"));
    assert_eq!(Fragment::seq_name_from_id("g&c&l_10_2"), Some("g&c&l"));
    assert_eq!(Fragment::seq_name_from_id("plain"), None);
    assert_eq!(Fragment::seq_name_from_id("s_x_5"), None);
}

#[test]
fn common_positions_is_interval_intersection() {
    let sequence = seq(b"ATGCATTGAT");
    let a = Fragment::new(sequence.clone(), 2, 6, Ori::Forward);
    let b = Fragment::new(sequence.clone(), 4, 9, Ori::Reverse);
    assert_eq!(a.common_positions(&b), 3);
    let c = a.common_fragment(&b).unwrap();
    assert_eq!((c.min_pos(), c.max_pos(), c.ori()), (4, 6, Ori::Forward));
    let far = Fragment::new(sequence.clone(), 8, 9, Ori::Forward);
    assert_eq!(a.common_positions(&far), 0);
    assert!(a.common_fragment(&far).is_none());
    assert_eq!(a.dist_to(&far), 1);

    let other_seq = Fragment::new(seq(b"ATGC"), 2, 6, Ori::Forward);
    assert_eq!(a.common_positions(&other_seq), 3);
}

#[test]
fn subfragment_inverts_when_reversed() {
    let fragment = Fragment::new(seq(b"ATGCATTG"), 1, 6, Ori::Forward);
    let sub = fragment.subfragment(1, 3);
    assert_eq!((sub.min_pos(), sub.max_pos(), sub.ori()), (2, 4, Ori::Forward));
    let inverted = fragment.subfragment(3, 1);
    assert_eq!(
        (inverted.min_pos(), inverted.max_pos(), inverted.ori()),
        (2, 4, Ori::Reverse)
    );
}

#[test]
fn diff_and_patch_round_trip() {
    let sequence = seq(b"ATGCATTGAT");
    let a = Fragment::new(sequence.clone(), 2, 6, Ori::Forward);
    let b = Fragment::new(sequence.clone(), 3, 8, Ori::Reverse);
    let diff = a.diff_to(&b);
    let mut patched = a.clone();
    patched.patch(&diff);
    assert_eq!(patched, b);
}

#[test]
fn exclude_keeps_a_flank() {
    let sequence = seq(b"ATGCATTGAT");
    let mut left = Fragment::new(sequence.clone(), 2, 6, Ori::Forward);
    left.exclude(&Fragment::new(sequence.clone(), 5, 8, Ori::Forward));
    assert_eq!((left.min_pos(), left.max_pos()), (2, 4));

    let mut inner = Fragment::new(sequence.clone(), 2, 6, Ori::Forward);
    inner.exclude(&Fragment::new(sequence.clone(), 4, 4, Ori::Forward));
    assert_eq!((inner.min_pos(), inner.max_pos()), (2, 3));

    let mut swallowed = Fragment::new(sequence.clone(), 2, 6, Ori::Forward);
    swallowed.exclude(&Fragment::new(sequence.clone(), 0, 9, Ori::Forward));
    assert!(!swallowed.valid());

    let mut untouched = Fragment::new(sequence.clone(), 2, 6, Ori::Forward);
    untouched.exclude(&Fragment::new(sequence, 8, 9, Ori::Forward));
    assert_eq!((untouched.min_pos(), untouched.max_pos()), (2, 6));
}

#[test]
fn split_keeps_the_prefix() {
    let sequence = seq(b"ATGCATTGAT");
    let mut forward = Fragment::new(sequence.clone(), 2, 6, Ori::Forward);
    let rest = forward.split(2).unwrap();
    assert_eq!((forward.min_pos(), forward.max_pos()), (2, 3));
    assert_eq!((rest.min_pos(), rest.max_pos()), (4, 6));
    assert_eq!(rest.ori(), Ori::Forward);

    let mut reverse = Fragment::new(sequence, 2, 6, Ori::Reverse);
    let rest = reverse.split(2).unwrap();
    assert_eq!((reverse.min_pos(), reverse.max_pos()), (5, 6));
    assert_eq!((rest.min_pos(), rest.max_pos()), (2, 4));
    assert!(reverse.split(2).is_none());
}

#[test]
fn inverse_flips_the_row_too() {
    let sequence = seq(b"TAGTCCGA");
    let mut fragment = Fragment::new(sequence, 0, 3, Ori::Forward);
    fragment.set_row(AlignmentRow::from_alignment_string(RowKind::Map, b"TA-GT-"));
    assert_eq!(fragment.alignment_string(), b"TA-GT-");
    fragment.inverse();
    assert_eq!(fragment.alignment_string(), b"-AC-TA");
    fragment.inverse();
    assert_eq!(fragment.alignment_string(), b"TA-GT-");
}

#[test]
fn max_shift_end_respects_sequence_and_neighbour() {
    let sequence = seq(b"ATGCATTGAT");
    let fragment = Fragment::new(sequence.clone(), 2, 4, Ori::Forward);
    assert_eq!(fragment.max_shift_end(0, None), 5);
    let neighbor = Fragment::new(sequence.clone(), 7, 9, Ori::Forward);
    assert_eq!(fragment.max_shift_end(0, Some(&neighbor)), 2);
    assert_eq!(fragment.max_shift_end(1, Some(&neighbor)), 3);
    assert_eq!(fragment.max_shift_end(-1, Some(&neighbor)), 5);

    let reverse = Fragment::new(sequence.clone(), 5, 7, Ori::Reverse);
    assert_eq!(reverse.max_shift_end(0, None), 5);
    let left = Fragment::new(sequence, 0, 2, Ori::Reverse);
    assert_eq!(reverse.max_shift_end(0, Some(&left)), 2);
}
