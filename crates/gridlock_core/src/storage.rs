//! Key-value persistence for simulation rows.
//!
//! The engine never owns its state directly: every entity is a fixed-width
//! row addressed by a small composite key inside a [`Datastore`]. Rows are
//! encoded with bincode's fixed-int little-endian layout, so each table has
//! an exact value size ([`Row::SIZE`]). A key that was never written reads
//! back as the row's all-zero default.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};

/// The tables the simulation reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TableId {
    /// Singleton game metadata.
    Meta,
    /// One row per player.
    Players,
    /// One row per board tile.
    Board,
    /// One row per (player, unit).
    Units,
    /// One row per (player, building).
    Buildings,
    /// One row per unit type.
    UnitPrototypes,
    /// One row per building type.
    BuildingPrototypes,
}

/// Storage backend the simulation runs against.
///
/// Implementations only need to be byte-exact: the engine performs all
/// encoding and validation itself.
pub trait Datastore {
    /// Read the raw value stored under `key`, if any.
    fn get(&self, table: TableId, key: &[u8]) -> Option<Vec<u8>>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&mut self, table: TableId, key: &[u8], value: Vec<u8>);
}

/// Ordered in-memory [`Datastore`].
///
/// Ordered iteration makes hashing and snapshots independent of insertion
/// order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemoryStore {
    rows: BTreeMap<(TableId, Vec<u8>), Vec<u8>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True if nothing has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterate rows in key order.
    pub fn iter(&self) -> impl Iterator<Item = (TableId, &[u8], &[u8])> {
        self.rows
            .iter()
            .map(|((table, key), value)| (*table, key.as_slice(), value.as_slice()))
    }
}

impl Datastore for MemoryStore {
    fn get(&self, table: TableId, key: &[u8]) -> Option<Vec<u8>> {
        self.rows.get(&(table, key.to_vec())).cloned()
    }

    fn set(&mut self, table: TableId, key: &[u8], value: Vec<u8>) {
        self.rows.insert((table, key.to_vec()), value);
    }
}

/// A fixed-width table row.
pub trait Row: Serialize + DeserializeOwned + Default {
    /// Table this row lives in.
    const TABLE: TableId;
    /// Exact encoded size in bytes.
    const SIZE: usize;

    /// Encode to the table's fixed-width layout.
    fn encode(&self) -> Result<Vec<u8>> {
        let bytes = bincode::serialize(self).map_err(|e| GameError::CorruptRow {
            table: Self::TABLE,
            message: e.to_string(),
        })?;
        if bytes.len() != Self::SIZE {
            return Err(GameError::CorruptRow {
                table: Self::TABLE,
                message: format!("encoded {} bytes, expected {}", bytes.len(), Self::SIZE),
            });
        }
        Ok(bytes)
    }

    /// Decode from the table's fixed-width layout.
    fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != Self::SIZE {
            return Err(GameError::CorruptRow {
                table: Self::TABLE,
                message: format!("found {} bytes, expected {}", bytes.len(), Self::SIZE),
            });
        }
        bincode::deserialize(bytes).map_err(|e| GameError::CorruptRow {
            table: Self::TABLE,
            message: e.to_string(),
        })
    }
}

/// Read a row, falling back to its default when the key is absent.
pub fn read_row<R: Row, S: Datastore + ?Sized>(store: &S, key: &[u8]) -> Result<R> {
    match store.get(R::TABLE, key) {
        Some(bytes) => R::decode(&bytes),
        None => Ok(R::default()),
    }
}

/// Encode and store a row.
pub fn write_row<R: Row, S: Datastore + ?Sized>(store: &mut S, key: &[u8], row: &R) -> Result<()> {
    let bytes = row.encode()?;
    store.set(R::TABLE, key, bytes);
    Ok(())
}

/// Key of a board tile. Big-endian so that key order is x-major.
#[must_use]
pub fn tile_key(x: u16, y: u16) -> [u8; 4] {
    let [x0, x1] = x.to_be_bytes();
    let [y0, y1] = y.to_be_bytes();
    [x0, x1, y0, y1]
}
