//! Redb table definitions and key encoding utilities.
//!
//! Redb tables are declared statically, so every logical table lives inside
//! one physical table with its name prefixed to each key. Logical keys keep
//! their relative byte order under the prefix.

use std::ops::Bound;

use redb::TableDefinition;

/// The physical table that stores all key-value pairs.
pub const DATA_TABLE: TableDefinition<'static, &[u8], &[u8]> = TableDefinition::new("arbor_data");

/// Separator byte between table name and key in the encoded key.
pub const KEY_SEPARATOR: u8 = 0x00;

/// Encode a logical table name and key into a physical key:
/// `<table_name><separator><key>`.
#[must_use]
pub fn encode_key(table: &str, key: &[u8]) -> Vec<u8> {
    let mut encoded = Vec::with_capacity(table.len() + 1 + key.len());
    encoded.extend_from_slice(table.as_bytes());
    encoded.push(KEY_SEPARATOR);
    encoded.extend_from_slice(key);
    encoded
}

/// Decode a physical key into its logical table name and original key.
///
/// Returns `None` if the key is malformed (missing separator).
#[must_use]
pub fn decode_key(encoded: &[u8]) -> Option<(&str, &[u8])> {
    let sep_pos = encoded.iter().position(|&b| b == KEY_SEPARATOR)?;
    let table = std::str::from_utf8(&encoded[..sep_pos]).ok()?;
    Some((table, &encoded[sep_pos + 1..]))
}

/// First physical key of a logical table.
#[must_use]
pub fn table_start_key(table: &str) -> Vec<u8> {
    encode_key(table, &[])
}

/// First physical key past the end of a logical table.
#[must_use]
pub fn table_end_key(table: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(table.len() + 1);
    key.extend_from_slice(table.as_bytes());
    key.push(KEY_SEPARATOR + 1);
    key
}

/// Translate logical bounds into physical bounds confined to `table`.
#[must_use]
pub fn physical_bounds(
    table: &str,
    start: Bound<&[u8]>,
    end: Bound<&[u8]>,
) -> (Bound<Vec<u8>>, Bound<Vec<u8>>) {
    let start = match start {
        Bound::Included(k) => Bound::Included(encode_key(table, k)),
        Bound::Excluded(k) => Bound::Excluded(encode_key(table, k)),
        Bound::Unbounded => Bound::Included(table_start_key(table)),
    };
    let end = match end {
        Bound::Included(k) => Bound::Included(encode_key(table, k)),
        Bound::Excluded(k) => Bound::Excluded(encode_key(table, k)),
        Bound::Unbounded => Bound::Excluded(table_end_key(table)),
    };
    (start, end)
}

/// Returns true if no key can satisfy both bounds.
#[must_use]
pub fn is_empty_range(start: &Bound<Vec<u8>>, end: &Bound<Vec<u8>>) -> bool {
    match (start, end) {
        (Bound::Included(s), Bound::Included(e)) => s > e,
        (Bound::Included(s) | Bound::Excluded(s), Bound::Excluded(e))
        | (Bound::Excluded(s), Bound::Included(e)) => s >= e,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_key() {
        let encoded = encode_key("group.coi", b"\x00\x01\x02");
        let (table, key) = decode_key(&encoded).unwrap();
        assert_eq!(table, "group.coi");
        assert_eq!(key, b"\x00\x01\x02");
    }

    #[test]
    fn test_encode_decode_empty_key() {
        let encoded = encode_key("config", b"");
        let (table, key) = decode_key(&encoded).unwrap();
        assert_eq!(table, "config");
        assert!(key.is_empty());
    }

    #[test]
    fn test_key_ordering_within_table() {
        let a = encode_key("index.x", b"a");
        let b = encode_key("index.x", b"b");
        let other = encode_key("index.y", b"a");
        assert!(a < b);
        assert!(b < other);
    }

    #[test]
    fn test_table_range_excludes_longer_names() {
        let end = table_end_key("group.coi");
        let longer = encode_key("group.coi2", b"");
        assert!(table_start_key("group.coi") < encode_key("group.coi", b"\xff"));
        assert!(encode_key("group.coi", b"\xff\xff") < end);
        assert!(longer > end);
    }

    #[test]
    fn test_physical_bounds() {
        let (start, end) = physical_bounds("t", Bound::Excluded(b"a"), Bound::Unbounded);
        assert_eq!(start, Bound::Excluded(encode_key("t", b"a")));
        assert_eq!(end, Bound::Excluded(table_end_key("t")));
        assert!(!is_empty_range(&start, &end));

        let (start, end) = physical_bounds("t", Bound::Included(b"b"), Bound::Excluded(b"b"));
        assert!(is_empty_range(&start, &end));
        let (start, end) = physical_bounds("t", Bound::Included(b"b"), Bound::Included(b"b"));
        assert!(!is_empty_range(&start, &end));
    }
}
