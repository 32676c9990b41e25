//! Algorithms over the model: block-set alignments, distance trees and
//! fragment distances.

pub mod bsa_algo;
pub mod fragment_distance;
pub mod tree;
