//! Row id generation.

use parking_lot::Mutex;
use ulid::{Generator, Ulid};

/// Source of globally unique row ids.
pub trait IdGenerator: Send + Sync {
    /// Produce the next id.
    fn generate(&self) -> String;
}

impl<F> IdGenerator for F
where
    F: Fn() -> String + Send + Sync,
{
    fn generate(&self) -> String {
        self()
    }
}

/// Thread-safe ULID generator scoped to a single instance.
///
/// Ids from one generator sort in generation order, so a column scan returns
/// rows in insertion order.
pub struct UlidGenerator {
    inner: Mutex<Generator>,
}

impl UlidGenerator {
    /// Create a generator seeded from the system clock.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Generator::new()),
        }
    }
}

impl Default for UlidGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator for UlidGenerator {
    fn generate(&self) -> String {
        // Overflow only happens after 2^80 ids within one millisecond.
        self.inner
            .lock()
            .generate()
            .unwrap_or_else(|_| Ulid::new())
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ulids_are_unique_and_ordered() {
        let generator = UlidGenerator::new();
        let ids: Vec<String> = (0..1_000).map(|_| generator.generate()).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted, ids);
    }

    #[test]
    fn closures_are_generators() {
        let fixed = || "row-1".to_string();
        assert_eq!(fixed.generate(), "row-1");
    }
}
