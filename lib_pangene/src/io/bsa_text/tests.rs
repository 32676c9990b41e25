use std::sync::Arc;

use crate::algo::bsa_algo::bsa_make_rows;
use crate::io::{bsa_input, bsa_print, bsa_print_conservative};
use crate::model::{bsa_length, Block, BlockSet, Bsa, Fragment, Ori, Sequence, SequenceKind};

fn fixture(circular: bool) -> BlockSet {
    let marker = if circular { 'c' } else { 'l' };
    let s1 = Arc::new(Sequence::from_letters(
        SequenceKind::AsIs,
        format!("g1&chr1&{marker}"),
        &vec![b'A'; 10],
    ));
    let s2 = Arc::new(Sequence::from_letters(
        SequenceKind::AsIs,
        format!("g2&chr1&{marker}"),
        &vec![b'A'; 10],
    ));
    let mut block_set = BlockSet::new();
    block_set.add_sequence(s1.clone());
    block_set.add_sequence(s2.clone());
    let mut b1 = Block::with_name("b1");
    b1.insert(Fragment::new(s1.clone(), 0, 4, Ori::Forward));
    b1.insert(Fragment::new(s2.clone(), 0, 4, Ori::Forward));
    block_set.insert(b1);
    let mut b2 = Block::with_name("b2");
    b2.insert(Fragment::new(s1, 5, 9, Ori::Forward));
    b2.insert(Fragment::new(s2, 5, 9, Ori::Reverse));
    block_set.insert(b2);
    block_set
}

fn trivial(block_set: &BlockSet) -> Bsa {
    let mut rows = Bsa::new();
    bsa_make_rows(&mut rows, block_set);
    rows
}

#[test]
fn print_emits_one_line_per_row() {
    let block_set = fixture(false);
    let aln = trivial(&block_set);
    let mut out = Vec::new();
    bsa_print(&mut out, &aln, &block_set, "chr1", false, true).unwrap();
    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(
        lines[0],
        "chr1\t+g1&chr1&l\tg1&chr1&l_0_4 >\tg1&chr1&l_5_9 >"
    );
    assert_eq!(
        lines[1],
        "chr1\t+g2&chr1&l\tg2&chr1&l_0_4 >\tg2&chr1&l_9_5 <"
    );
}

#[test]
fn print_blocks_mode_uses_block_names() {
    let block_set = fixture(false);
    let aln = trivial(&block_set);
    let mut out = Vec::new();
    bsa_print(&mut out, &aln, &block_set, "chr1", true, false).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("\tb1\tb2"));
}

#[test]
fn conservative_row_reports_shared_columns() {
    let block_set = fixture(false);
    let aln = trivial(&block_set);
    let mut out = Vec::new();
    bsa_print_conservative(&mut out, &aln, &block_set, "chr1").unwrap();
    let text = String::from_utf8(out).unwrap();
    // Column 0 is b1 everywhere in one orientation; column 1 differs in
    // orientation between the rows.
    assert_eq!(text, "#chr1\tconservative\tb1 >\t-\n");
}

#[test]
fn input_round_trips_printed_output() {
    let mut block_set = fixture(false);
    let aln = trivial(&block_set);
    let mut out = Vec::new();
    bsa_print(&mut out, &aln, &block_set, "chr1", false, true).unwrap();
    bsa_input(&mut block_set, out.as_slice()).unwrap();
    let read_back = block_set.bsa("chr1").unwrap();
    assert_eq!(read_back.size(), 2);
    assert_eq!(bsa_length(read_back), 2);
    assert_eq!(read_back, &aln);
}

#[test]
fn input_accepts_block_names_and_gaps() {
    let mut block_set = fixture(false);
    let input = "\
# a comment line\n\
chr1\t+g1&chr1&l\tb1\t-\tb2\n\
chr1\t+g2&chr1&l\tb1\tb2\t-\n";
    bsa_input(&mut block_set, input.as_bytes()).unwrap();
    let aln = block_set.bsa("chr1").unwrap();
    assert_eq!(bsa_length(aln), 3);
    let row1 = aln.row("g1&chr1&l").unwrap();
    assert!(row1.fragments[1].is_none());
}

#[test]
fn circular_input_matches_any_rotation() {
    let mut block_set = fixture(true);
    // The row starts from b2: valid for a circular chromosome only.
    let input = "chr1\t+g1&chr1&c\tb2\tb1\nchr1\t+g2&chr1&c\tb2\tb1\n";
    bsa_input(&mut block_set, input.as_bytes()).unwrap();
    let aln = block_set.bsa("chr1").unwrap();
    let row = aln.row("g1&chr1&c").unwrap();
    let first = row.fragments[0].unwrap();
    assert_eq!(block_set.block(first.block).name(), "b2");
}

#[test]
fn mismatching_rows_are_rejected() {
    let mut block_set = fixture(false);
    // b2 before b1 cannot match a linear chromosome.
    let input = "chr1\t+g1&chr1&l\tb2\tb1\n";
    assert!(bsa_input(&mut block_set, input.as_bytes()).is_err());
    // Unknown sequence.
    let input = "chr1\t+mystery\tb1\tb2\n";
    assert!(bsa_input(&mut block_set, input.as_bytes()).is_err());
}
