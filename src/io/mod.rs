//! Readers and writers for the two encoding families: octet oriented tag-length-value encodings
//! (BER) and bit oriented packed encodings (PER).

pub mod ber;
pub mod per;
