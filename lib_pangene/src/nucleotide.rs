//! The `{A, T, G, C, N}` alphabet and its two-bit codes.

/// Number of letters of the alphabet, `N` included.
pub const LETTERS_NUMBER: usize = 5;

/// The gap character used by alignment output.
pub const GAP: u8 = b'-';

/// Converts a letter into its numeric code: `A=0, T=1, G=2, C=3, N=4`.
#[inline]
pub fn char_to_size(c: u8) -> usize {
    match c {
        b'A' => 0,
        b'T' => 1,
        b'G' => 2,
        b'C' => 3,
        _ => 4,
    }
}

/// Inverse of [`char_to_size`].
#[inline]
pub fn size_to_char(s: usize) -> u8 {
    match s {
        0 => b'A',
        1 => b'T',
        2 => b'G',
        3 => b'C',
        _ => b'N',
    }
}

/// Returns the complementary nucleotide, or the input letter if it is not
/// one of `ATGC`.
#[inline]
pub fn complement(c: u8) -> u8 {
    match c {
        b'A' => b'T',
        b'T' => b'A',
        b'G' => b'C',
        b'C' => b'G',
        other => other,
    }
}

/// Reverse-complements `letters` in place.
pub fn complement_in_place(letters: &mut [u8]) {
    for letter in letters.iter_mut() {
        *letter = complement(*letter);
    }
    letters.reverse();
}

/// Returns the reverse complement of `letters`.
pub fn reverse_complement(letters: &[u8]) -> Vec<u8> {
    let mut result = letters.to_vec();
    complement_in_place(&mut result);
    result
}

/// Upper-cases `letters` and maps everything outside `ATGC` to `N`.
pub fn to_atgcn(letters: &[u8]) -> Vec<u8> {
    letters
        .iter()
        .map(|c| match c.to_ascii_uppercase() {
            c @ (b'A' | b'T' | b'G' | b'C') => c,
            _ => b'N',
        })
        .collect()
}

/// Returns if every letter is one of `ATGCN`.
pub fn is_atgcn(letters: &[u8]) -> bool {
    letters
        .iter()
        .all(|c| matches!(c, b'A' | b'T' | b'G' | b'C' | b'N'))
}
