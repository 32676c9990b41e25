//! External text formats: fasta, block-set fasta, and the block-set
//! alignment table.

mod block_set_fasta;
mod bsa_text;
mod fasta;

pub use block_set_fasta::{write_block_set_fasta, write_fasta, BlockSetFastaReader};
pub use bsa_text::{bsa_input, bsa_print, bsa_print_conservative};
pub use fasta::{FastaReader, FastaSink, SequenceSink};

/// Extracts `<value>` of the first space-separated `key=value` pair of
/// `values`.
pub fn extract_value<'a>(values: &'a str, key: &str) -> Option<&'a str> {
    for pair in values.split_whitespace() {
        if let Some((pair_key, value)) = pair.split_once('=') {
            if pair_key == key {
                return Some(value);
            }
        }
    }
    None
}
