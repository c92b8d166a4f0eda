#![deny(rustdoc::broken_intra_doc_links)]
#![warn(unused_extern_crates)]

//! Schema driven decoding of BER and UNALIGNED PER encodings into an annotated parse tree.
//!
//! A [`model::Schema`] describes the ASN.1 types, a [`registry::TypeRegistry`] resolves open
//! types by their discriminator and a [`decode::Decoder`] walks the encoding, producing a
//! [`tree::ParseNode`] for every decoded value.

pub mod decode;
pub mod err;
pub mod format;
pub mod io;
pub mod model;
pub mod prelude;
pub mod registry;
pub mod tree;
