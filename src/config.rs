use std::num::NonZeroUsize;

use crate::opcode::Tiers;

pub const DEFAULT_TAPE_SIZE: NonZeroUsize = NonZeroUsize::new(30_000).unwrap();

/// Per-run settings supplied by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Number of data cells. In unified memory this is the size of the data
    /// region that follows the program.
    pub tape_size: NonZeroUsize,
    /// Enabled extension tiers.
    pub tiers: Tiers,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tape_size: DEFAULT_TAPE_SIZE,
            tiers: Tiers::NONE,
        }
    }
}

impl Config {
    pub fn new(tape_size: NonZeroUsize, tiers: Tiers) -> Self {
        Self { tape_size, tiers }
    }
}
