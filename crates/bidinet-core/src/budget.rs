/// Outcome of a [`BudgetAllocator::reserve`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation<K> {
    /// Entries whose bytes must be dropped, oldest first.
    pub evicted: Vec<K>,
    /// Whether the requested bytes fit after evicting.
    pub granted: bool,
}

/// Global ceiling on retained collected bytes.
///
/// Eviction walks retained entries oldest first and stops as soon as the
/// request fits. When the whole walk does not free enough room every visited
/// entry stays evicted and the request is refused; there is no second pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BudgetAllocator {
    max_total_size: u64,
}

impl BudgetAllocator {
    pub fn new(max_total_size: u64) -> Self {
        Self { max_total_size }
    }

    pub fn max_total_size(&self) -> u64 {
        self.max_total_size
    }

    /// `retained` lists the currently retained entries in insertion order.
    pub fn reserve<K: Clone>(&self, requested: u64, retained: &[(K, u64)]) -> Reservation<K> {
        let used: u64 = retained.iter().map(|(_, size)| *size).sum();
        let mut available = self.max_total_size.saturating_sub(used);
        if requested <= available {
            return Reservation {
                evicted: Vec::new(),
                granted: true,
            };
        }

        let mut evicted = Vec::new();
        for (key, size) in retained {
            available = available.saturating_add(*size);
            evicted.push(key.clone());
            if requested <= available {
                return Reservation {
                    evicted,
                    granted: true,
                };
            }
        }

        Reservation {
            evicted,
            granted: false,
        }
    }
}
