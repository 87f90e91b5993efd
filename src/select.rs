//! Random choice of one candidate among many.
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A source of uniformly distributed indices.
pub trait RandomSource {
    /// An index in `0..len`. Never called with `len == 0`.
    fn pick(&mut self, len: usize) -> usize;
}

impl<R: Rng + ?Sized> RandomSource for R {
    fn pick(&mut self, len: usize) -> usize {
        self.random_range(0..len)
    }
}

/// Always picks the same index (clamped to the last one).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedChoice(pub usize);

impl RandomSource for FixedChoice {
    fn pick(&mut self, len: usize) -> usize {
        self.0.min(len.saturating_sub(1))
    }
}

/// A generator seeded from `seed` when given, from the OS otherwise.
pub fn rng_from_seed(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

/// Choose one item uniformly, `None` if there is nothing to choose from.
pub fn choose<'a, T>(source: &mut dyn RandomSource, items: &'a [T]) -> Option<&'a T> {
    if items.is_empty() {
        None
    } else {
        items.get(source.pick(items.len()))
    }
}
