//! Collection metadata
//!
//! One record per (collection name, namespace) pair, stored at the key
//! `[name] [ns?]`. Every data key of an instance embeds the `version`
//! (generation id) of its current metadata record.
//!
//! ## Record Format
//! ```text
//! ┌──────────┬──────────────────────────┐
//! │ Tag (1)  │ bincode(metadata struct) │
//! └──────────┴──────────────────────────┘
//! ```
//! The tag is the [`DataType`] of the collection, so a List and a Map that
//! accidentally share a name fail loudly instead of misreading each other.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{CollectionError, Result};

/// Collection kind stored in the metadata tag byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DataType {
    List = 0,
    Set = 1,
    Map = 2,
    ZSet = 3,
    Bitmap = 4,
}

impl DataType {
    pub fn name(self) -> &'static str {
        match self {
            DataType::List => "list",
            DataType::Set => "set",
            DataType::Map => "map",
            DataType::ZSet => "zset",
            DataType::Bitmap => "bitmap",
        }
    }
}

/// Behaviour shared by every metadata record
pub trait Metadata: Serialize + DeserializeOwned + Clone {
    const DATA_TYPE: DataType;

    /// Fresh record for a new generation
    fn with_version(version: i64) -> Self;

    /// Generation id embedded in every data key of the instance
    fn version(&self) -> i64;

    fn encode(&self) -> Result<Vec<u8>> {
        let mut bytes = vec![Self::DATA_TYPE as u8];
        bytes.extend(bincode::serialize(self)?);
        Ok(bytes)
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        let (&tag, body) = bytes
            .split_first()
            .ok_or_else(|| CollectionError::Serialization("empty metadata record".to_string()))?;
        if tag != Self::DATA_TYPE as u8 {
            return Err(CollectionError::TypeMismatch {
                expected: Self::DATA_TYPE.name(),
                found: tag,
            });
        }
        Ok(bincode::deserialize(body)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListMetadata {
    pub version: i64,
    /// Number of appended items (next index)
    pub size: u64,
    /// Last written data key
    pub tail: Option<Vec<u8>>,
}

impl Metadata for ListMetadata {
    const DATA_TYPE: DataType = DataType::List;

    fn with_version(version: i64) -> Self {
        Self {
            version,
            size: 0,
            tail: None,
        }
    }

    fn version(&self) -> i64 {
        self.version
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetMetadata {
    pub version: i64,
}

impl Metadata for SetMetadata {
    const DATA_TYPE: DataType = DataType::Set;

    fn with_version(version: i64) -> Self {
        Self { version }
    }

    fn version(&self) -> i64 {
        self.version
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapMetadata {
    pub version: i64,
}

impl Metadata for MapMetadata {
    const DATA_TYPE: DataType = DataType::Map;

    fn with_version(version: i64) -> Self {
        Self { version }
    }

    fn version(&self) -> i64 {
        self.version
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZSetMetadata {
    pub version: i64,
}

impl Metadata for ZSetMetadata {
    const DATA_TYPE: DataType = DataType::ZSet;

    fn with_version(version: i64) -> Self {
        Self { version }
    }

    fn version(&self) -> i64 {
        self.version
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitmapMetadata {
    pub version: i64,
    /// High-water mark of fragments ever written; never decreases
    pub max_fragment_index: u64,
}

impl Metadata for BitmapMetadata {
    const DATA_TYPE: DataType = DataType::Bitmap;

    fn with_version(version: i64) -> Self {
        Self {
            version,
            max_fragment_index: 0,
        }
    }

    fn version(&self) -> i64 {
        self.version
    }
}

static LAST_VERSION: AtomicI64 = AtomicI64::new(0);

/// Next generation id: wall-clock millis, strictly increasing within the process
pub fn next_version() -> i64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default();

    let mut last = LAST_VERSION.load(Ordering::Relaxed);
    loop {
        let candidate = now.max(last + 1);
        match LAST_VERSION.compare_exchange_weak(
            last,
            candidate,
            Ordering::SeqCst,
            Ordering::Relaxed,
        ) {
            Ok(_) => return candidate,
            Err(actual) => last = actual,
        }
    }
}
