//! Serialization and key encoding for storage.
//!
//! # Encoding Traits
//!
//! - [`Encoder`] - Serialize types to bytes
//! - [`Decoder`] - Deserialize types from bytes
//!
//! # Row Bodies
//!
//! The [`value`] module provides the compact tagged format used for stored
//! row bodies ([`encode_row`] / [`decode_row`]).
//!
//! # Ordered Keys
//!
//! The [`sortable`] module provides an order-preserving, prefix-free value
//! encoding. It is the building block of both [`HKey`](crate::HKey) segments
//! and secondary index keys: comparing encoded bytes gives the same answer as
//! comparing the values, and no encoding is a strict prefix of another.

pub mod sortable;
mod traits;
pub mod value;

#[cfg(test)]
mod proptest_tests;

pub use sortable::{
    decode_sortable, decode_sortable_prefix, encode_sortable, encode_sortable_to,
    prefix_successor,
};
pub use traits::{Decoder, Encoder, FORMAT_VERSION};
pub use value::{decode_row, encode_row};
