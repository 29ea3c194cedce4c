//! FastOR fired-chip map of the silicon pixel detector
//!
//! Each of the 1200 SPD chips raises a FastOR signal when it records a hit.
//! The map stores one bit per chip:
//!
//! ```text
//!   chip:   0 ............ 399 | 400 ...................... 1199
//!           inner layer (L0)   | outer layer (L1)
//!           20 bins of 20      | 40 bins of 20
//! ```

use serde::{Deserialize, Serialize};
use std::ops::Range;

use crate::error::CepError;
use crate::CepResult;

/// Total number of FastOR chips
pub const N_CHIPS: usize = 1200;

/// Chips of the inner SPD layer
pub const INNER_CHIPS: Range<usize> = 0..400;

/// Chips of the outer SPD layer
pub const OUTER_CHIPS: Range<usize> = 400..N_CHIPS;

const N_WORDS: usize = (N_CHIPS + 63) / 64;

/// Per-event FastOR bitmap
///
/// Serialized as the sorted list of fired chip indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<usize>", into = "Vec<usize>")]
pub struct FastOrMap {
    words: [u64; N_WORDS],
}

impl FastOrMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a map from fired chip indices
    pub fn from_chips<I>(chips: I) -> CepResult<Self>
    where
        I: IntoIterator<Item = usize>,
    {
        let mut map = Self::new();
        for chip in chips {
            map.set(chip)?;
        }
        Ok(map)
    }

    /// Mark a chip as fired
    pub fn set(&mut self, chip: usize) -> CepResult<()> {
        if chip >= N_CHIPS {
            return Err(CepError::ChipOutOfRange {
                index: chip,
                max: N_CHIPS,
            });
        }
        self.words[chip / 64] |= 1u64 << (chip % 64);
        Ok(())
    }

    /// Mark every chip of a range as fired
    pub fn set_range(&mut self, chips: Range<usize>) -> CepResult<()> {
        for chip in chips {
            self.set(chip)?;
        }
        Ok(())
    }

    /// Whether a chip fired. Indices past the end read as not fired.
    #[inline]
    pub fn test(&self, chip: usize) -> bool {
        chip < N_CHIPS && self.words[chip / 64] & (1u64 << (chip % 64)) != 0
    }

    /// Whether any chip of the range fired
    pub fn any_in(&self, chips: Range<usize>) -> bool {
        chips.into_iter().any(|chip| self.test(chip))
    }

    /// Number of fired chips in a range
    pub fn count_in(&self, chips: Range<usize>) -> usize {
        chips.into_iter().filter(|&chip| self.test(chip)).count()
    }

    /// Number of fired chips in the whole map
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Number of fired chips on the inner layer
    pub fn count_inner(&self) -> usize {
        self.count_in(INNER_CHIPS)
    }

    /// Number of fired chips on the outer layer
    pub fn count_outer(&self) -> usize {
        self.count_in(OUTER_CHIPS)
    }

    /// Iterate over fired chip indices in ascending order
    pub fn fired_chips(&self) -> impl Iterator<Item = usize> + '_ {
        (0..N_CHIPS).filter(move |&chip| self.test(chip))
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }
}

impl TryFrom<Vec<usize>> for FastOrMap {
    type Error = CepError;

    fn try_from(chips: Vec<usize>) -> CepResult<Self> {
        Self::from_chips(chips)
    }
}

impl From<FastOrMap> for Vec<usize> {
    fn from(map: FastOrMap) -> Self {
        map.fired_chips().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_map() {
        let map = FastOrMap::new();
        assert!(map.is_empty());
        assert_eq!(map.count(), 0);
        assert!(!map.test(0));
        assert!(!map.test(1199));
    }

    #[test]
    fn test_set_and_count_per_layer() {
        let map = FastOrMap::from_chips([0, 63, 64, 399, 400, 1199]).unwrap();
        assert_eq!(map.count(), 6);
        assert_eq!(map.count_inner(), 4);
        assert_eq!(map.count_outer(), 2);
        assert!(map.test(63) && map.test(64));
        assert!(!map.test(65));
    }

    #[test]
    fn test_out_of_range_chip() {
        let mut map = FastOrMap::new();
        assert!(matches!(
            map.set(N_CHIPS),
            Err(CepError::ChipOutOfRange { index: 1200, .. })
        ));
        assert!(!map.test(5000));
    }

    #[test]
    fn test_any_in_range() {
        let map = FastOrMap::from_chips([120]).unwrap();
        assert!(map.any_in(100..120 + 1));
        assert!(!map.any_in(100..120));
    }

    #[test]
    fn test_serde_as_chip_list() {
        let map = FastOrMap::from_chips([3, 401, 7]).unwrap();
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, "[3,7,401]");

        let back: FastOrMap = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);

        assert!(serde_json::from_str::<FastOrMap>("[1200]").is_err());
    }
}
