//! Rolling two-bit hash of sequence windows.
//!
//! The code of the letter at window position `pos` is xor-ed into the hash
//! at bit `(2 * pos) % 64`. Sliding the window by one position therefore
//! reduces to removing one code, rotating the occupied bits by two, and
//! xor-ing in the incoming code, which is what makes fragment indexing over
//! long sequences cheap.

use crate::nucleotide::char_to_size;

const POS_BITS: u32 = 2;
const HASH_BITS: usize = u64::BITS as usize;
const LAST_TWO_BITS: u64 = 0b11;

#[inline]
fn shift_in_hash(pos: usize) -> u32 {
    ((pos * POS_BITS as usize) % HASH_BITS) as u32
}

/// Hashes a window of letters, leftmost first.
pub fn make_hash(letters: impl IntoIterator<Item = u8>) -> u64 {
    let mut result = 0;
    for (pos, letter) in letters.into_iter().enumerate() {
        result ^= (char_to_size(letter) as u64) << shift_in_hash(pos);
    }
    result
}

/// Slides a window hash by one position.
///
/// `remove_char` is the letter leaving the window, `add_char` the letter
/// entering it. `forward` slides towards greater positions.
///
/// `make_hash` of the slid window equals `reuse_hash` of the original
/// window's hash.
pub fn reuse_hash(old_hash: u64, length: usize, remove_char: u8, add_char: u8, forward: bool) -> u64 {
    let mut hash = old_hash;
    let remove = char_to_size(remove_char) as u64;
    hash ^= remove << shift_in_hash(if forward { 0 } else { length - 1 });
    let occupied = (POS_BITS as usize * length).min(HASH_BITS) as u32;
    if forward {
        hash = (hash >> POS_BITS) | ((hash & LAST_TWO_BITS) << (occupied - POS_BITS));
    } else {
        hash = (hash << POS_BITS) | ((hash >> (occupied - POS_BITS)) & LAST_TWO_BITS);
        if occupied < HASH_BITS as u32 {
            hash &= (1u64 << occupied) - 1;
        }
    }
    let add = char_to_size(add_char) as u64;
    hash ^ (add << shift_in_hash(if forward { length - 1 } else { 0 }))
}
