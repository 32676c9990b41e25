use crate::hash::{make_hash, reuse_hash};
use crate::model::{Ori, Sequence, SequenceKind};
use crate::nucleotide::{reverse_complement, to_atgcn};

#[test]
fn substr_round_trips_both_orientations() {
    let letters = b"ATGCATTGCC";
    for kind in [SequenceKind::AsIs, SequenceKind::Compact] {
        let sequence = Sequence::from_letters(kind, "s", letters);
        assert_eq!(sequence.size(), letters.len());
        assert_eq!(sequence.substr(0, sequence.size(), Ori::Forward), letters);
        assert_eq!(
            sequence.substr(0, sequence.size(), Ori::Reverse),
            reverse_complement(letters)
        );
    }
}

#[test]
fn compact_storage_collapses_n() {
    let sequence = Sequence::from_letters(SequenceKind::Compact, "s", b"ANTNG");
    assert_eq!(sequence.contents(), b"AATAG");
    let asis = Sequence::from_letters(SequenceKind::AsIs, "s", b"ANTNG");
    assert_eq!(asis.contents(), b"ANTNG");
}

#[test]
fn to_atgcn_maps_foreign_letters() {
    assert_eq!(to_atgcn(b"atg-c xyzN"), b"ATGNCNNNNN");
}

#[test]
fn rolling_hash_reuse_matches_recomputation() {
    let sequence = Sequence::from_letters(SequenceKind::AsIs, "s", b"ATGCATTGCCGATTACA");
    for len in [1usize, 2, 5, 16] {
        for start in 0..sequence.size() - len {
            let old = sequence.hash(start, len, Ori::Forward);
            let slid = reuse_hash(
                old,
                len,
                sequence.char_at(start),
                sequence.char_at(start + len),
                true,
            );
            assert_eq!(slid, sequence.hash(start + 1, len, Ori::Forward));
            let back = reuse_hash(
                slid,
                len,
                sequence.char_at(start + len),
                sequence.char_at(start),
                false,
            );
            assert_eq!(back, old);
        }
    }
}

#[test]
fn hash_of_reverse_window_is_hash_of_reverse_complement() {
    let sequence = Sequence::from_letters(SequenceKind::AsIs, "s", b"ATGCATTGCC");
    let window = sequence.substr(2, 5, Ori::Reverse);
    assert_eq!(
        sequence.hash(2, 5, Ori::Reverse),
        make_hash(window.iter().copied())
    );
}

#[test]
fn name_encodes_genome_chromosome_circularity() {
    let mut sequence = Sequence::new(SequenceKind::AsIs);
    sequence.set_name("BRUAB&chr1&c");
    assert_eq!(sequence.genome(), Some("BRUAB"));
    assert_eq!(sequence.chromosome(), Some("chr1"));
    assert!(sequence.circular().unwrap());

    sequence.set_name("BRUAB&chr2&l");
    assert!(!sequence.circular().unwrap());

    sequence.set_name("plain");
    assert_eq!(sequence.genome(), None);
    assert!(sequence.circular().is_err());
}

#[test]
fn map_from_slice_fills_gaps_with_unknown_letters() {
    let mut sequence = Sequence::new(SequenceKind::AsIs);
    sequence.set_name("s");
    sequence.map_from_slice(4, b"GGCC");
    sequence.map_from_slice(0, b"AT");
    assert_eq!(sequence.size(), 8);
    assert_eq!(sequence.contents(), b"ATNNGGCC");
}
