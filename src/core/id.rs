use std::fmt::Display;

use anyhow::Result;
use async_trait::async_trait;
use futures_util::lock::Mutex;
use serde::{
    de::{
        Unexpected,
        Visitor,
    },
    Deserialize,
    Serialize,
};
use thiserror::Error;

use crate::core::hash::HashSet;

/// A WAMP ID, an unsigned integer in the range `[1, 2^53)`, safely representable in JSON.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct Id(u64);

impl Id {
    pub const MIN: u64 = 1;
    pub const MAX: u64 = (1 << 53) - 1;
}

impl Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Error)]
#[error("{value} is out of range for IDs")]
pub struct IdOutOfRange {
    value: u64,
}

impl IdOutOfRange {
    fn new(value: u64) -> Self {
        Self { value }
    }
}

impl TryFrom<u64> for Id {
    type Error = IdOutOfRange;
    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value < Self::MIN || value > Self::MAX {
            Err(IdOutOfRange::new(value))
        } else {
            Ok(Id(value))
        }
    }
}

impl From<Id> for u64 {
    fn from(value: Id) -> Self {
        value.0
    }
}

struct IdVisitor;

impl<'de> Visitor<'de> for IdVisitor {
    type Value = Id;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            formatter,
            "an unsigned integer in the range [{}, {}]",
            Id::MIN,
            Id::MAX
        )
    }

    fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Id::try_from(v).map_err(|_| E::invalid_value(Unexpected::Unsigned(v), &self))
    }
}

impl<'de> Deserialize<'de> for Id {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_u64(IdVisitor)
    }
}

/// An allocator for WAMP IDs in some scope.
///
/// Allocators are injectable wherever IDs are minted, so tests can substitute a deterministic
/// generator.
#[async_trait]
pub trait IdAllocator: Send + Sync {
    /// Generates the next ID.
    async fn generate_id(&self) -> Result<Id>;

    /// Resets the allocator to its initial state.
    async fn reset(&self);
}

/// An [`IdAllocator`] that draws IDs uniformly at random from the full ID range.
///
/// Collision avoidance is the caller's responsibility; see [`allocate_unused_id`].
#[derive(Default)]
pub struct RandomIdAllocator {}

#[async_trait]
impl IdAllocator for RandomIdAllocator {
    async fn generate_id(&self) -> Result<Id> {
        let id = rand::random::<u64>() % Id::MAX + Id::MIN;
        Ok(Id(id))
    }

    async fn reset(&self) {}
}

/// An [`IdAllocator`] that generates IDs sequentially, starting from 1.
pub struct SequentialIdAllocator {
    next: Mutex<u64>,
}

impl Default for SequentialIdAllocator {
    fn default() -> Self {
        Self {
            next: Mutex::new(Id::MIN),
        }
    }
}

#[async_trait]
impl IdAllocator for SequentialIdAllocator {
    async fn generate_id(&self) -> Result<Id> {
        let mut lock = self.next.lock().await;
        let id = Id::try_from(*lock)?;
        *lock += 1;
        Ok(id)
    }

    async fn reset(&self) {
        *self.next.lock().await = Id::MIN;
    }
}

/// Draws IDs from the allocator until one is found that is not in the set of live IDs for the
/// scope.
pub async fn allocate_unused_id(
    allocator: &dyn IdAllocator,
    in_use: &HashSet<Id>,
) -> Result<Id> {
    loop {
        let id = allocator.generate_id().await?;
        if !in_use.contains(&id) {
            return Ok(id);
        }
    }
}

#[cfg(test)]
mod id_test {
    use crate::core::{
        hash::HashSet,
        id::{
            allocate_unused_id,
            Id,
            IdAllocator,
            RandomIdAllocator,
            SequentialIdAllocator,
        },
    };

    #[test]
    fn fails_deserialization_out_of_range() {
        assert_matches::assert_matches!(serde_json::from_str::<Id>(r#"0"#), Err(err) => {
            assert!(err.to_string().contains("expected an unsigned integer in the range"));
        });
        assert_matches::assert_matches!(serde_json::from_str::<Id>(r#"9007199254740993"#), Err(err) => {
            assert!(err.to_string().contains("expected an unsigned integer in the range"));
        });
    }

    #[tokio::test]
    async fn generates_sequential_ids_from_one() {
        let allocator = SequentialIdAllocator::default();
        assert_matches::assert_matches!(allocator.generate_id().await, Ok(id) => {
            assert_eq!(id, Id::try_from(1).unwrap());
        });
        assert_matches::assert_matches!(allocator.generate_id().await, Ok(id) => {
            assert_eq!(id, Id::try_from(2).unwrap());
        });
        allocator.reset().await;
        assert_matches::assert_matches!(allocator.generate_id().await, Ok(id) => {
            assert_eq!(id, Id::try_from(1).unwrap());
        });
    }

    #[tokio::test]
    async fn generates_random_ids_in_range() {
        let allocator = RandomIdAllocator::default();
        for _ in 0..1000 {
            let id = allocator.generate_id().await.unwrap();
            let id = u64::from(id);
            assert!((Id::MIN..=Id::MAX).contains(&id));
        }
    }

    #[tokio::test]
    async fn skips_ids_already_in_use() {
        let allocator = SequentialIdAllocator::default();
        let in_use = HashSet::from_iter([Id::try_from(1).unwrap(), Id::try_from(2).unwrap()]);
        assert_matches::assert_matches!(allocate_unused_id(&allocator, &in_use).await, Ok(id) => {
            assert_eq!(id, Id::try_from(3).unwrap());
        });
    }
}
