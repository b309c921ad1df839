//! Property-based tests for the value and sortable encodings.

#![allow(clippy::expect_used, clippy::float_cmp)]

use std::cmp::Ordering;

use proptest::prelude::*;

use crate::encoding::sortable::{decode_sortable_prefix, encode_sortable, prefix_successor};
use crate::encoding::value::{decode_row, encode_row};
use crate::encoding::{Decoder, Encoder};
use crate::types::Value;

/// Strategy for generating arbitrary non-NaN `Value` instances.
pub(crate) fn arb_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        any::<f64>().prop_filter("not NaN", |f| !f.is_nan()).prop_map(Value::Float),
        ".*".prop_map(Value::String),
        prop::collection::vec(any::<u8>(), 0..64).prop_map(Value::Bytes),
    ]
}

proptest! {
    #[test]
    fn value_roundtrip(value in arb_value()) {
        let bytes = value.encode().expect("encode");
        prop_assert_eq!(Value::decode(&bytes).expect("decode"), value);
    }

    #[test]
    fn row_roundtrip(values in prop::collection::vec(arb_value(), 0..12)) {
        let bytes = encode_row(&values).expect("encode");
        prop_assert_eq!(decode_row(&bytes).expect("decode"), values);
    }

    #[test]
    fn sortable_int_order_matches_value_order(a in any::<i64>(), b in any::<i64>()) {
        let ea = encode_sortable(&Value::Int(a));
        let eb = encode_sortable(&Value::Int(b));
        prop_assert_eq!(ea.cmp(&eb), a.cmp(&b));
    }

    #[test]
    fn sortable_float_order_matches_value_order(
        a in any::<f64>().prop_filter("not NaN", |f| !f.is_nan()),
        b in any::<f64>().prop_filter("not NaN", |f| !f.is_nan()),
    ) {
        let ea = encode_sortable(&Value::Float(a));
        let eb = encode_sortable(&Value::Float(b));
        // -0.0 and 0.0 compare equal as floats but encode distinctly
        if a.partial_cmp(&b) != Some(Ordering::Equal) {
            prop_assert_eq!(Some(ea.cmp(&eb)), a.partial_cmp(&b));
        }
    }

    #[test]
    fn sortable_string_order_matches_value_order(a in ".*", b in ".*") {
        let ea = encode_sortable(&Value::from(a.as_str()));
        let eb = encode_sortable(&Value::from(b.as_str()));
        prop_assert_eq!(ea.cmp(&eb), a.as_bytes().cmp(b.as_bytes()));
    }

    #[test]
    fn sortable_is_prefix_free(a in arb_value(), b in arb_value()) {
        let ea = encode_sortable(&a);
        let eb = encode_sortable(&b);
        if ea != eb {
            prop_assert!(!eb.starts_with(&ea));
            prop_assert!(!ea.starts_with(&eb));
        }
    }

    #[test]
    fn sortable_concatenation_decodes_in_order(values in prop::collection::vec(arb_value(), 1..6)) {
        let mut buf = Vec::new();
        for v in &values {
            buf.extend_from_slice(&encode_sortable(v));
        }
        let mut offset = 0;
        let mut decoded = Vec::new();
        while offset < buf.len() {
            let (v, used) = decode_sortable_prefix(&buf[offset..]).expect("decode");
            decoded.push(v);
            offset += used;
        }
        prop_assert_eq!(decoded, values);
    }

    #[test]
    fn successor_is_strict_upper_bound(
        prefix in prop::collection::vec(any::<u8>(), 1..16),
        suffix in prop::collection::vec(any::<u8>(), 0..16),
    ) {
        if let Some(succ) = prefix_successor(&prefix) {
            let mut extended = prefix.clone();
            extended.extend_from_slice(&suffix);
            prop_assert!(extended < succ);
            prop_assert!(prefix < succ);
        } else {
            prop_assert!(prefix.iter().all(|&b| b == u8::MAX));
        }
    }
}
