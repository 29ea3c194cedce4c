//! Track classification for the CEP selection
//!
//! Every reconstructed track gets a [`TrackStatus`] bit set. Tracks are then
//! counted against a track-type (TT) mask and pattern: a track matches when
//! `status & mask == pattern`.

use serde::{Deserialize, Serialize};

use crate::event::EsdTrack;

/// Per-track status bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TrackStatus(pub u32);

impl TrackStatus {
    pub const TPC_REFIT: u32 = 1 << 0;
    pub const ITS_REFIT: u32 = 1 << 1;
    pub const ETA_ACCEPTED: u32 = 1 << 2;
    pub const SHARED_CLUSTERS_OK: u32 = 1 << 3;
    pub const DCA_OK: u32 = 1 << 4;
    pub const DCAZ_OK: u32 = 1 << 5;

    /// Track-type baseline: every quality bit set
    pub const TT_BASELINE: u32 = Self::TPC_REFIT
        | Self::ITS_REFIT
        | Self::ETA_ACCEPTED
        | Self::SHARED_CLUSTERS_OK
        | Self::DCA_OK
        | Self::DCAZ_OK;

    pub fn bits(&self) -> u32 {
        self.0
    }

    pub fn has(&self, bit: u32) -> bool {
        self.0 & bit == bit
    }

    pub fn matches(&self, mask: u32, pattern: u32) -> bool {
        self.0 & mask == pattern
    }
}

/// Indices of the statuses matching `mask`/`pattern`
pub fn count_status(statuses: &[TrackStatus], mask: u32, pattern: u32) -> Vec<usize> {
    statuses
        .iter()
        .enumerate()
        .filter(|(_, s)| s.matches(mask, pattern))
        .map(|(i, _)| i)
        .collect()
}

/// Quality limits used to classify tracks
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackCuts {
    /// Maximal number of TPC clusters shared with other tracks
    pub max_shared_clusters: u16,
    /// Maximal transverse DCA (cm)
    pub max_dca: f64,
    /// Maximal longitudinal DCA (cm)
    pub max_dca_z: f64,
    /// Accepted pseudorapidity window
    pub eta_range: (f64, f64),
    /// Run-1 data: ITS refit is not part of the track-type baseline
    pub is_run1: bool,
}

impl Default for TrackCuts {
    fn default() -> Self {
        Self {
            max_shared_clusters: 3,
            max_dca: 500.0,
            max_dca_z: 6.0,
            eta_range: (-0.9, 0.9),
            is_run1: false,
        }
    }
}

impl TrackCuts {
    /// Run-1 flavour of the default cuts
    pub fn run1() -> Self {
        Self {
            is_run1: true,
            ..Self::default()
        }
    }

    /// Track-type mask matching the data-taking period
    pub fn baseline_mask(&self) -> u32 {
        if self.is_run1 {
            TrackStatus::TT_BASELINE & !TrackStatus::ITS_REFIT
        } else {
            TrackStatus::TT_BASELINE
        }
    }

    pub fn classify(&self, track: &EsdTrack) -> TrackStatus {
        let eta = track.eta();
        let checks = [
            (track.tpc_refit, TrackStatus::TPC_REFIT),
            (track.its_refit, TrackStatus::ITS_REFIT),
            (
                eta >= self.eta_range.0 && eta <= self.eta_range.1,
                TrackStatus::ETA_ACCEPTED,
            ),
            (
                track.tpc_shared_clusters <= self.max_shared_clusters,
                TrackStatus::SHARED_CLUSTERS_OK,
            ),
            (track.dca_xy.abs() <= self.max_dca, TrackStatus::DCA_OK),
            (track.dca_z.abs() <= self.max_dca_z, TrackStatus::DCAZ_OK),
        ];
        TrackStatus(
            checks
                .iter()
                .filter(|(passed, _)| *passed)
                .fold(0, |bits, (_, bit)| bits | bit),
        )
    }

    /// Classify every track of an event
    pub fn analyze_tracks(&self, tracks: &[EsdTrack]) -> Vec<TrackStatus> {
        tracks.iter().map(|t| self.classify(t)).collect()
    }
}
