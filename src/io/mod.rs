//! Raw file input: transparent decompression and the ARFF text format.

pub mod arff;
pub mod compression;
