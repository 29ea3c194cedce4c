//! STG (Silicon Trigger Geometry) emulation
//!
//! The SPD FastOR map is reduced to coarse azimuthal sectors. A sector is
//! active when its inner-layer bin fired together with one of the four outer
//! bins facing it:
//!
//! ```text
//!   outer (40 bins):  ... | 2i-1 | 2i | 2i+1 | 2i+2 | ...
//!                            \     |     |     /
//!   inner (20 bins):              sector i
//! ```
//!
//! The trigger fires when two active sectors are `dphi` sectors apart for some
//! `dphi` in the requested range. All sector arithmetic wraps around in φ.

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

use crate::fastor::{FastOrMap, INNER_CHIPS, OUTER_CHIPS};

/// Number of azimuthal sectors (inner-layer bins)
pub const N_SECTORS: usize = 20;

/// Number of outer-layer bins
pub const N_OUTER_BINS: usize = 40;

/// Chips per bin on both layers
pub const BIN_WIDTH: usize = 20;

/// Sector activity derived from one FastOR map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectorPattern {
    inner: [bool; N_SECTORS],
    outer: [bool; N_OUTER_BINS],
    phi: [bool; N_SECTORS],
}

impl SectorPattern {
    /// Reduce a FastOR map to inner, outer and coincidence sectors
    pub fn from_map(map: &FastOrMap) -> Self {
        let mut inner = [false; N_SECTORS];
        let mut outer = [false; N_OUTER_BINS];

        for chip in map.fired_chips() {
            if INNER_CHIPS.contains(&chip) {
                inner[chip / BIN_WIDTH] = true;
            } else {
                outer[(chip - OUTER_CHIPS.start) / BIN_WIDTH] = true;
            }
        }

        let mut phi = [false; N_SECTORS];
        for (i, active) in phi.iter_mut().enumerate() {
            let facing = outer[(2 * i) % N_OUTER_BINS]
                || outer[(2 * i + 1) % N_OUTER_BINS]
                || outer[(2 * i + 2) % N_OUTER_BINS]
                || outer[(2 * i + N_OUTER_BINS - 1) % N_OUTER_BINS];
            *active = inner[i] && facing;
        }

        Self { inner, outer, phi }
    }

    pub fn inner(&self) -> &[bool; N_SECTORS] {
        &self.inner
    }

    pub fn outer(&self) -> &[bool; N_OUTER_BINS] {
        &self.outer
    }

    /// Inner/outer coincidence per sector
    pub fn phi(&self) -> &[bool; N_SECTORS] {
        &self.phi
    }

    /// Whether sectors `i` and `i + dphi` are both active
    #[inline]
    fn pair_fired(&self, i: usize, dphi: usize) -> bool {
        self.phi[i] && self.phi[(i + dphi % N_SECTORS) % N_SECTORS]
    }

    /// Number of separations in `dphi` congruent to `residue` modulo `N_SECTORS`
    fn occurrences(dphi: &RangeInclusive<usize>, residue: usize) -> usize {
        if dphi.is_empty() {
            return 0;
        }
        let up_to = |n: usize| if n < residue { 0 } else { (n - residue) / N_SECTORS + 1 };
        let below = dphi.start().checked_sub(1).map_or(0, up_to);
        up_to(*dphi.end()) - below
    }

    /// Fired pairs for one separation in `0..N_SECTORS`
    fn pairs_at(&self, residue: usize) -> usize {
        (0..N_SECTORS).filter(|&i| self.pair_fired(i, residue)).count()
    }

    /// Whether any sector pair with separation in `dphi` fired
    ///
    /// Only the separations modulo `N_SECTORS` are visited.
    pub fn fires(&self, dphi: RangeInclusive<usize>) -> bool {
        (0..N_SECTORS).any(|r| {
            Self::occurrences(&dphi, r) > 0 && (0..N_SECTORS).any(|i| self.pair_fired(i, r))
        })
    }

    /// Number of fired (dphi, sector) pairs over the range
    pub fn coincidences(&self, dphi: RangeInclusive<usize>) -> usize {
        (0..N_SECTORS)
            .map(|r| Self::occurrences(&dphi, r) * self.pairs_at(r))
            .sum()
    }
}

/// Evaluate the STG condition for a FastOR map
///
/// Returns false without looking at the sectors when the map is absent or
/// either SPD layer has no fired chip. Separations larger than the number of
/// sectors wrap around; an empty range (`dphi_min > dphi_max`) never fires.
pub fn is_stg_fired(map: Option<&FastOrMap>, dphi_min: usize, dphi_max: usize) -> bool {
    let Some(map) = map else {
        return false;
    };

    let n_outer = map.count_outer();
    let n_inner = map.count() - n_outer;
    if n_inner < 1 || n_outer < 1 {
        return false;
    }

    SectorPattern::from_map(map).fires(dphi_min..=dphi_max)
}

/// Largest separation a fired mask can hold
pub const MAX_SCAN_DPHI: usize = 31;

/// STG trigger scan over a range of single separations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StgTrigger {
    /// Largest separation scanned; bit `dphi` of the mask is evaluated for
    /// every `dphi` in `0..=max_dphi`. Must not exceed [`MAX_SCAN_DPHI`].
    pub max_dphi: usize,
}

impl Default for StgTrigger {
    fn default() -> Self {
        Self { max_dphi: 10 }
    }
}

impl StgTrigger {
    pub fn new(max_dphi: usize) -> Self {
        Self { max_dphi }
    }

    /// Bit `dphi` is set when the single separation `[dphi, dphi]` fired
    ///
    /// Separations past [`MAX_SCAN_DPHI`] have no bit and are not scanned.
    pub fn fired_mask(&self, map: Option<&FastOrMap>) -> u32 {
        (0..=self.max_dphi.min(MAX_SCAN_DPHI))
            .filter(|&dphi| is_stg_fired(map, dphi, dphi))
            .fold(0u32, |mask, dphi| mask | (1 << dphi))
    }

    /// Whether any separation of the scan fired
    pub fn fired(&self, map: Option<&FastOrMap>) -> bool {
        self.fired_mask(map) != 0
    }
}
