//! Redb transaction and cursor implementation.
//!
//! Cursors stream a range in batches instead of materializing it: each batch
//! holds at most the configured number of entries and the next batch resumes
//! strictly after the last key of the previous one.

use std::ops::Bound;

use redb::{ReadTransaction, ReadableTable, WriteTransaction};

use crate::engine::{Cursor, CursorResult, KeyValue, StorageError, StorageResult, Transaction};

use super::tables::{decode_key, encode_key, is_empty_range, physical_bounds, DATA_TABLE};

fn internal(e: impl std::fmt::Display) -> StorageError {
    StorageError::Internal(e.to_string())
}

fn as_slice_bound(bound: &Bound<Vec<u8>>) -> Bound<&[u8]> {
    bound.as_ref().map(Vec::as_slice)
}

fn to_owned_bound(bound: Bound<&[u8]>) -> Bound<Vec<u8>> {
    bound.map(<[u8]>::to_vec)
}

/// Reads up to `limit` logical entries from an open data table.
fn collect_range<T>(
    table: &T,
    start: &Bound<Vec<u8>>,
    end: &Bound<Vec<u8>>,
    limit: usize,
) -> StorageResult<Vec<KeyValue>>
where
    T: ReadableTable<&'static [u8], &'static [u8]>,
{
    let bounds: (Bound<&[u8]>, Bound<&[u8]>) = (as_slice_bound(start), as_slice_bound(end));
    let range = table.range::<&[u8]>(bounds).map_err(internal)?;
    let mut entries = Vec::with_capacity(limit.min(1024));
    for entry in range {
        if entries.len() >= limit {
            break;
        }
        let (k, v) = entry.map_err(internal)?;
        if let Some((_, key)) = decode_key(k.value()) {
            entries.push((key.to_vec(), v.value().to_vec()));
        }
    }
    Ok(entries)
}

#[allow(clippy::large_enum_variant)]
enum TxKind {
    Read(ReadTransaction),
    Write(WriteTransaction),
}

/// A read-only or read-write transaction on a [`RedbEngine`](super::RedbEngine).
pub struct RedbTransaction {
    tx: TxKind,
    cursor_batch: usize,
}

impl RedbTransaction {
    /// Wrap a read-only transaction.
    pub(crate) const fn new_read(tx: ReadTransaction, cursor_batch: usize) -> Self {
        Self { tx: TxKind::Read(tx), cursor_batch }
    }

    /// Wrap a read-write transaction.
    pub(crate) const fn new_write(tx: WriteTransaction, cursor_batch: usize) -> Self {
        Self { tx: TxKind::Write(tx), cursor_batch }
    }

    /// Fetch up to `limit` entries of `table` within the logical bounds.
    fn fetch_batch(
        &self,
        table: &str,
        start: Bound<&[u8]>,
        end: Bound<&[u8]>,
        limit: usize,
    ) -> StorageResult<Vec<KeyValue>> {
        let (start, end) = physical_bounds(table, start, end);
        if is_empty_range(&start, &end) {
            return Ok(Vec::new());
        }
        let entries = match &self.tx {
            TxKind::Read(tx) => match tx.open_table(DATA_TABLE) {
                Ok(t) => collect_range(&t, &start, &end, limit)?,
                // nothing written yet
                Err(redb::TableError::TableDoesNotExist(_)) => Vec::new(),
                Err(e) => return Err(internal(e)),
            },
            TxKind::Write(tx) => {
                let t = tx.open_table(DATA_TABLE).map_err(internal)?;
                collect_range(&t, &start, &end, limit)?
            }
        };
        tracing::trace!(table, entries = entries.len(), "fetched cursor batch");
        Ok(entries)
    }
}

impl Transaction for RedbTransaction {
    type Cursor<'a>
        = RedbCursor<'a>
    where
        Self: 'a;

    fn get(&self, table: &str, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        let encoded_key = encode_key(table, key);
        match &self.tx {
            TxKind::Read(tx) => match tx.open_table(DATA_TABLE) {
                Ok(t) => Ok(t.get(encoded_key.as_slice()).map_err(internal)?.map(|v| v.value().to_vec())),
                Err(redb::TableError::TableDoesNotExist(_)) => Ok(None),
                Err(e) => Err(internal(e)),
            },
            TxKind::Write(tx) => {
                let t = tx.open_table(DATA_TABLE).map_err(internal)?;
                let value = t.get(encoded_key.as_slice()).map_err(internal)?;
                Ok(value.map(|v| v.value().to_vec()))
            }
        }
    }

    fn put(&mut self, table: &str, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        match &self.tx {
            TxKind::Read(_) => Err(StorageError::ReadOnly),
            TxKind::Write(tx) => {
                let encoded_key = encode_key(table, key);
                let mut t = tx.open_table(DATA_TABLE).map_err(internal)?;
                t.insert(encoded_key.as_slice(), value).map_err(internal)?;
                Ok(())
            }
        }
    }

    fn delete(&mut self, table: &str, key: &[u8]) -> Result<bool, StorageError> {
        match &self.tx {
            TxKind::Read(_) => Err(StorageError::ReadOnly),
            TxKind::Write(tx) => {
                let encoded_key = encode_key(table, key);
                let mut t = tx.open_table(DATA_TABLE).map_err(internal)?;
                let removed = t.remove(encoded_key.as_slice()).map_err(internal)?;
                Ok(removed.is_some())
            }
        }
    }

    fn cursor(&self, table: &str) -> Result<Self::Cursor<'_>, StorageError> {
        Ok(RedbCursor::new(self, table, Bound::Unbounded, Bound::Unbounded))
    }

    fn range(
        &self,
        table: &str,
        start: Bound<&[u8]>,
        end: Bound<&[u8]>,
    ) -> Result<Self::Cursor<'_>, StorageError> {
        Ok(RedbCursor::new(self, table, to_owned_bound(start), to_owned_bound(end)))
    }

    fn commit(self) -> Result<(), StorageError> {
        match self.tx {
            TxKind::Read(_) => Ok(()),
            TxKind::Write(tx) => tx.commit().map_err(|e| StorageError::Transaction(e.to_string())),
        }
    }

    fn rollback(self) -> Result<(), StorageError> {
        match self.tx {
            TxKind::Read(_) => Ok(()),
            TxKind::Write(tx) => tx.abort().map_err(|e| StorageError::Transaction(e.to_string())),
        }
    }

    fn is_read_only(&self) -> bool {
        matches!(self.tx, TxKind::Read(_))
    }
}

/// A batched forward cursor over one logical table.
///
/// At any time the cursor holds at most one batch of entries.
pub struct RedbCursor<'a> {
    tx: &'a RedbTransaction,
    table: String,
    start: Bound<Vec<u8>>,
    end: Bound<Vec<u8>>,
    batch: Vec<KeyValue>,
    position: Option<usize>,
    /// The last batch was full, so more entries may follow it.
    has_more: bool,
    started: bool,
}

impl<'a> RedbCursor<'a> {
    fn new(tx: &'a RedbTransaction, table: &str, start: Bound<Vec<u8>>, end: Bound<Vec<u8>>) -> Self {
        Self {
            tx,
            table: table.to_owned(),
            start,
            end,
            batch: Vec::new(),
            position: None,
            has_more: false,
            started: false,
        }
    }

    fn load_from(&mut self, start: Bound<&[u8]>) -> CursorResult {
        self.started = true;
        self.batch = self.tx.fetch_batch(&self.table, start, as_slice_bound(&self.end), self.tx.cursor_batch)?;
        self.has_more = self.batch.len() >= self.tx.cursor_batch;
        self.position = if self.batch.is_empty() { None } else { Some(0) };
        Ok(self.current_owned())
    }

    fn current_owned(&self) -> Option<KeyValue> {
        self.position.and_then(|p| self.batch.get(p).cloned())
    }
}

impl Cursor for RedbCursor<'_> {
    fn seek(&mut self, key: &[u8]) -> CursorResult {
        let start_is_tighter = match &self.start {
            Bound::Included(s) => s.as_slice() > key,
            Bound::Excluded(s) => s.as_slice() >= key,
            Bound::Unbounded => false,
        };
        if start_is_tighter {
            let start = self.start.clone();
            self.load_from(as_slice_bound(&start))
        } else {
            self.load_from(Bound::Included(key))
        }
    }

    fn seek_first(&mut self) -> CursorResult {
        let start = self.start.clone();
        self.load_from(as_slice_bound(&start))
    }

    fn next(&mut self) -> CursorResult {
        if !self.started {
            return self.seek_first();
        }
        let Some(pos) = self.position else {
            return Ok(None);
        };
        if pos + 1 < self.batch.len() {
            self.position = Some(pos + 1);
            return Ok(self.current_owned());
        }
        if !self.has_more {
            self.position = None;
            return Ok(None);
        }
        let last = self.batch[pos].0.clone();
        self.load_from(Bound::Excluded(&last))
    }

    fn current(&self) -> Option<(&[u8], &[u8])> {
        self.position.and_then(|p| self.batch.get(p)).map(|(k, v)| (k.as_slice(), v.as_slice()))
    }
}
