//! Fixed-capacity sequences.
//!
//! [`BoundedVec`] keeps the first `N` items it is given and counts the rest.
//! Excess items are dropped, never reordered.

use std::fmt;
use std::marker::PhantomData;

use serde::de::{DeserializeOwned, SeqAccess, Visitor};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::warn;

/// A sequence holding at most `N` items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundedVec<T, const N: usize> {
    items: Vec<T>,
    dropped: usize,
}

impl<T, const N: usize> BoundedVec<T, N> {
    /// Maximum number of retained items.
    pub const CAPACITY: usize = N;

    /// Creates an empty sequence.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            items: Vec::new(),
            dropped: 0,
        }
    }

    /// Appends an item if there is room.
    ///
    /// Returns `false` (and counts the item as dropped) when full.
    pub fn push(&mut self, item: T) -> bool {
        if self.items.len() < N {
            self.items.push(item);
            true
        } else {
            self.dropped += 1;
            false
        }
    }

    /// Returns the retained items.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Iterates over the retained items in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// Returns the number of retained items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if nothing was retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns true if no further item would be retained.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.items.len() >= N
    }

    /// Returns how many items were dropped for lack of room.
    #[must_use]
    pub const fn dropped(&self) -> usize {
        self.dropped
    }

    /// Consumes the sequence and returns the retained items.
    #[must_use]
    pub fn into_vec(self) -> Vec<T> {
        self.items
    }
}

impl<T, const N: usize> Default for BoundedVec<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize> FromIterator<T> for BoundedVec<T, N> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut bounded = Self::new();
        for item in iter {
            bounded.push(item);
        }
        bounded
    }
}

impl<'a, T, const N: usize> IntoIterator for &'a BoundedVec<T, N> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T: Serialize, const N: usize> Serialize for BoundedVec<T, N> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.items.len()))?;
        for item in &self.items {
            seq.serialize_element(item)?;
        }
        seq.end()
    }
}

/// Deserializes leniently: elements that do not match `T` are skipped,
/// anything past the capacity is dropped, and a non-array value yields an
/// empty sequence.
impl<'de, T: DeserializeOwned, const N: usize> Deserialize<'de> for BoundedVec<T, N> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(BoundedVisitor(PhantomData))
    }
}

struct BoundedVisitor<T, const N: usize>(PhantomData<T>);

impl<'de, T: DeserializeOwned, const N: usize> Visitor<'de> for BoundedVisitor<T, N> {
    type Value = BoundedVec<T, N>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a sequence of at most {N} items")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut bounded = BoundedVec::new();
        while let Some(value) = seq.next_element::<serde_json::Value>()? {
            match serde_json::from_value::<T>(value) {
                Ok(item) => {
                    bounded.push(item);
                }
                Err(e) => warn!(error = %e, "skipping malformed sequence element"),
            }
        }
        if bounded.dropped() > 0 {
            warn!(
                kept = bounded.len(),
                dropped = bounded.dropped(),
                "sequence exceeded capacity, truncated"
            );
        }
        Ok(bounded)
    }

    fn visit_unit<E: serde::de::Error>(self) -> Result<Self::Value, E> {
        Ok(BoundedVec::new())
    }

    fn visit_none<E: serde::de::Error>(self) -> Result<Self::Value, E> {
        Ok(BoundedVec::new())
    }

    fn visit_bool<E: serde::de::Error>(self, _: bool) -> Result<Self::Value, E> {
        Ok(BoundedVec::new())
    }

    fn visit_i64<E: serde::de::Error>(self, _: i64) -> Result<Self::Value, E> {
        Ok(BoundedVec::new())
    }

    fn visit_u64<E: serde::de::Error>(self, _: u64) -> Result<Self::Value, E> {
        Ok(BoundedVec::new())
    }

    fn visit_f64<E: serde::de::Error>(self, _: f64) -> Result<Self::Value, E> {
        Ok(BoundedVec::new())
    }

    fn visit_str<E: serde::de::Error>(self, _: &str) -> Result<Self::Value, E> {
        Ok(BoundedVec::new())
    }

    fn visit_map<A: serde::de::MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        while map
            .next_entry::<serde::de::IgnoredAny, serde::de::IgnoredAny>()?
            .is_some()
        {}
        Ok(BoundedVec::new())
    }
}
