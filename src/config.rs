//! Bucket-count sizing for fixed-size tables.
//!
//! Tables never grow, so the bucket count picked at construction is the
//! one they keep. Rounding the requested capacity up to a prime spreads
//! digests that share small factors across more buckets.

/// Sizing parameters for [`HashTable`](crate::HashTable) and
/// [`MultiValueTable`](crate::MultiValueTable).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableConfig {
    /// Requested capacity; the bucket count is derived from it.
    pub capacity: usize,
    /// Round `capacity` up to the next prime (default: true).
    pub round_to_prime: bool,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            capacity: 7,
            round_to_prime: true,
        }
    }
}

impl TableConfig {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    /// Sizing for a table about to hold `n` elements, e.g. after a bulk
    /// load. Always yields at least two buckets.
    pub fn for_elements(n: usize) -> Self {
        Self::new(n)
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_prime_rounding(mut self, round: bool) -> Self {
        self.round_to_prime = round;
        self
    }

    /// Number of buckets a table built from this config gets. Zero only
    /// when rounding is off and `capacity` is zero, which construction
    /// rejects.
    pub fn bucket_count(&self) -> usize {
        if self.round_to_prime {
            next_prime(self.capacity)
        } else {
            self.capacity
        }
    }
}

/// Primality by 6k +/- 1 trial division.
pub fn is_prime(n: usize) -> bool {
    if n <= 1 {
        return false;
    }
    if n <= 3 {
        return true;
    }
    if n % 2 == 0 || n % 3 == 0 {
        return false;
    }
    let mut i = 5;
    while i <= n / i {
        if n % i == 0 || n % (i + 2) == 0 {
            return false;
        }
        i += 6;
    }
    true
}

/// Smallest prime `>= n`.
pub fn next_prime(n: usize) -> usize {
    (n.max(2)..=usize::MAX)
        .find(|&c| is_prime(c))
        .unwrap_or(usize::MAX)
}
