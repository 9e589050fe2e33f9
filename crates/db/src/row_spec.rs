//! Typed access to entities stored in a [`KvStore`].
//!
//! A [`RowSpec`] names a key space and fixes the key and value types stored in it. Values are
//! encoded with `bincode`; keys are laid out as `PREFIX/encoded-key` so that prefix scans of one
//! row spec never see another's rows.

use serde::{de::DeserializeOwned, Serialize};

use crate::{errors::DbResult, kv::KvStore};

/// Separator between a row spec's prefix and the encoded key.
const SEPARATOR: u8 = b'/';

/// Type specification for one kind of row.
pub trait RowSpec {
    /// Unique prefix of the key space.
    const PREFIX: &'static [u8];

    /// Type of the key.
    type Key: ?Sized;

    /// Type of the value.
    type Value: Serialize + DeserializeOwned;

    /// Encodes the key. Encodings must sort in the order rows should be iterated in.
    fn encode_key(key: &Self::Key) -> Vec<u8>;

    /// Full store key of the row for `key`.
    fn key(key: &Self::Key) -> Vec<u8> {
        let mut full = Self::prefix();
        full.extend(Self::encode_key(key));
        full
    }

    /// Prefix shared by every row of this spec.
    fn prefix() -> Vec<u8> {
        let mut prefix = Self::PREFIX.to_vec();
        prefix.push(SEPARATOR);
        prefix
    }
}

/// Encodes a height so that byte order matches numeric order.
pub fn encode_height(height: u64) -> Vec<u8> {
    height.to_be_bytes().to_vec()
}

/// Typed operations available on every [`KvStore`].
pub trait TypedStore: KvStore {
    /// Gets the row for `key`.
    fn get_row<R: RowSpec>(&self, key: &R::Key) -> DbResult<Option<R::Value>> {
        match self.get(&R::key(key))? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Stores the row for `key`.
    fn put_row<R: RowSpec>(&mut self, key: &R::Key, value: &R::Value) -> DbResult<()> {
        let bytes = bincode::serialize(value)?;
        self.put(R::key(key), bytes)
    }

    /// Deletes the row for `key`.
    fn delete_row<R: RowSpec>(&mut self, key: &R::Key) -> DbResult<()> {
        self.delete(&R::key(key))
    }

    /// Returns every row of `R` in key order.
    fn scan_rows<R: RowSpec>(&self) -> DbResult<Vec<R::Value>> {
        self.scan_rows_with_prefix::<R>(&[])
    }

    /// Returns every row of `R` with a key in `from..=to`, in key order.
    ///
    /// Only meaningful for row specs whose keys encode to a fixed width.
    fn scan_rows_between<R: RowSpec>(&self, from: &R::Key, to: &R::Key) -> DbResult<Vec<R::Value>> {
        let start = R::key(from);
        let mut end = R::key(to);
        // smallest key strictly greater than every key starting with `end`
        end.push(u8::MAX);

        self.scan_range(&start, &end)?
            .into_iter()
            .filter(|(k, _)| k.len() == start.len())
            .map(|(_, v)| Ok(bincode::deserialize(&v)?))
            .collect()
    }

    /// Returns every row of `R` whose encoded key starts with `key_prefix`, in key order.
    fn scan_rows_with_prefix<R: RowSpec>(&self, key_prefix: &[u8]) -> DbResult<Vec<R::Value>> {
        let mut prefix = R::prefix();
        prefix.extend_from_slice(key_prefix);

        self.scan_prefix(&prefix)?
            .into_iter()
            .map(|(_, v)| Ok(bincode::deserialize(&v)?))
            .collect()
    }
}

impl<T: KvStore + ?Sized> TypedStore for T {}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;
    use crate::inmemory::InMemoryStore;

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    struct Bucket {
        height: u64,
        items: Vec<String>,
    }

    struct BucketRow;

    impl RowSpec for BucketRow {
        const PREFIX: &'static [u8] = b"bucket";
        type Key = u64;
        type Value = Bucket;

        fn encode_key(key: &Self::Key) -> Vec<u8> {
            encode_height(*key)
        }
    }

    struct OtherRow;

    impl RowSpec for OtherRow {
        const PREFIX: &'static [u8] = b"bucketx";
        type Key = str;
        type Value = u64;

        fn encode_key(key: &Self::Key) -> Vec<u8> {
            key.as_bytes().to_vec()
        }
    }

    #[test]
    fn test_rows_round_trip_in_height_order() {
        let mut store = InMemoryStore::new();
        for height in [300u64, 2, 70] {
            let bucket = Bucket {
                height,
                items: vec![format!("item-{height}")],
            };
            store.put_row::<BucketRow>(&height, &bucket).unwrap();
        }
        store.put_row::<OtherRow>("noise", &1).unwrap();

        let heights: Vec<u64> = store
            .scan_rows::<BucketRow>()
            .unwrap()
            .into_iter()
            .map(|b| b.height)
            .collect();
        assert_eq!(heights, vec![2, 70, 300]);

        let between: Vec<u64> = store
            .scan_rows_between::<BucketRow>(&2, &70)
            .unwrap()
            .into_iter()
            .map(|b| b.height)
            .collect();
        assert_eq!(between, vec![2, 70]);

        store.delete_row::<BucketRow>(&70).unwrap();
        assert_eq!(store.get_row::<BucketRow>(&70).unwrap(), None);
        assert_eq!(store.get_row::<OtherRow>("noise").unwrap(), Some(1));
    }

    #[test]
    fn test_typed_access_through_trait_object() {
        let mut store = InMemoryStore::new();
        let dyn_store: &mut dyn KvStore = &mut store;
        dyn_store.put_row::<OtherRow>("a", &5).unwrap();

        assert_eq!(dyn_store.get_row::<OtherRow>("a").unwrap(), Some(5));
    }
}
