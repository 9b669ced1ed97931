use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Uniform choice among `len` candidates, injected so deck composition can be
/// replayed under a fixed seed.
pub trait Chooser: Send {
    /// `len` is always non-zero; the result must be `< len`.
    fn pick(&mut self, len: usize) -> usize;
}

#[derive(Debug, Clone)]
pub struct RandomChooser {
    rng: StdRng,
}

impl RandomChooser {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn from_seed(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::seeded(seed),
            None => Self::from_entropy(),
        }
    }
}

impl Chooser for RandomChooser {
    fn pick(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }
}

/// Always takes the first candidate.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstChooser;

impl Chooser for FirstChooser {
    fn pick(&mut self, _len: usize) -> usize {
        0
    }
}
