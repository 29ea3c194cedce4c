//! CEP event selection
//!
//! Cuts are applied in a fixed order and the first failing one rejects the
//! event:
//!
//! ```text
//!   TrackCount ─► Pileup ─► V0Veto ─► StgTrigger ─► AdVeto ─► FiredChips ─► accepted
//!       │           │         │           │           │           │
//!       └───────────┴─────────┴───────────┴───────────┴───────────┴──► rejected
//! ```
//!
//! V0Veto and StgTrigger together form the CCUP13 trigger condition.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::event::{EsdEvent, OfflineTrigger, PileupCuts};
use crate::stg::StgTrigger;
use crate::track_cuts::{count_status, TrackStatus};

/// One step of the selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Cut {
    /// Number of track-type tracks equals the accepted multiplicity
    TrackCount,
    /// SPD pileup rejection
    Pileup,
    /// No V0A or V0C offline trigger
    V0Veto,
    /// STG fired for some separation of the scan
    StgTrigger,
    /// No ADA or ADC offline trigger
    AdVeto,
    /// Fired-chip counts within bounds
    FiredChips,
}

impl Cut {
    /// All cuts in application order
    pub fn all() -> [Self; 6] {
        [
            Self::TrackCount,
            Self::Pileup,
            Self::V0Veto,
            Self::StgTrigger,
            Self::AdVeto,
            Self::FiredChips,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::TrackCount => "track count",
            Self::Pileup => "SPD pileup",
            Self::V0Veto => "V0 veto",
            Self::StgTrigger => "STG trigger",
            Self::AdVeto => "AD veto",
            Self::FiredChips => "fired chips",
        }
    }

    /// Position in application order
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Cut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Selection parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Required number of track-type tracks; also the upper fired-chip bound
    pub n_tracks_accept: usize,
    /// Track-type mask
    pub tt_mask: u32,
    /// Expected bits under the track-type mask
    pub tt_pattern: u32,
    /// Lower bound on every fired-chip count
    pub min_fired_chips: usize,
    pub pileup: PileupCuts,
    pub stg: StgTrigger,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            n_tracks_accept: 2,
            tt_mask: TrackStatus::TT_BASELINE,
            tt_pattern: TrackStatus::TT_BASELINE,
            min_fired_chips: 1,
            pileup: PileupCuts::default(),
            stg: StgTrigger::default(),
        }
    }
}

/// What survives the selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedEvent {
    /// Indices of the track-type tracks
    pub track_indices: Vec<usize>,
    /// STG fired mask, bit `dphi` per separation
    pub stg_mask: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Accepted(SelectedEvent),
    Rejected(Cut),
}

impl Selection {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }
}

/// Event counts through the selection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CutFlow {
    pub processed: u64,
    pub accepted: u64,
    pub rejected: BTreeMap<Cut, u64>,
}

impl CutFlow {
    pub fn record(&mut self, selection: &Selection) {
        self.processed += 1;
        match selection {
            Selection::Accepted(_) => self.accepted += 1,
            Selection::Rejected(cut) => *self.rejected.entry(*cut).or_insert(0) += 1,
        }
    }

    pub fn rejected_by(&self, cut: Cut) -> u64 {
        self.rejected.get(&cut).copied().unwrap_or(0)
    }

    /// Events still alive after `cut`
    pub fn surviving(&self, cut: Cut) -> u64 {
        let lost: u64 = Cut::all()
            .iter()
            .take(cut.index() + 1)
            .map(|c| self.rejected_by(*c))
            .sum();
        self.processed - lost
    }
}

/// Stateful selection: evaluates events and keeps the cut flow
#[derive(Debug, Clone, Default)]
pub struct CepSelection {
    pub config: SelectionConfig,
    cut_flow: CutFlow,
}

impl CepSelection {
    pub fn new(config: SelectionConfig) -> Self {
        Self {
            config,
            cut_flow: CutFlow::default(),
        }
    }

    /// Run every cut on an event without recording it
    pub fn evaluate(&self, event: &EsdEvent, statuses: &[TrackStatus]) -> Selection {
        let cfg = &self.config;

        let track_indices = count_status(statuses, cfg.tt_mask, cfg.tt_pattern);
        if track_indices.len() != cfg.n_tracks_accept {
            return Selection::Rejected(Cut::TrackCount);
        }

        if event.is_pileup_from_spd(&cfg.pileup) {
            return Selection::Rejected(Cut::Pileup);
        }

        if event.is_offline_trigger_fired(OfflineTrigger::V0A)
            || event.is_offline_trigger_fired(OfflineTrigger::V0C)
        {
            return Selection::Rejected(Cut::V0Veto);
        }

        let stg_mask = cfg.stg.fired_mask(Some(&event.fastor));
        if stg_mask == 0 {
            return Selection::Rejected(Cut::StgTrigger);
        }

        if event.is_offline_trigger_fired(OfflineTrigger::ADA)
            || event.is_offline_trigger_fired(OfflineTrigger::ADC)
        {
            return Selection::Rejected(Cut::AdVeto);
        }

        let fired = [
            event.fired_chips[0] as usize,
            event.fired_chips[1] as usize,
            event.fastor.count_inner(),
            event.fastor.count_outer(),
        ];
        let chips_ok = fired
            .iter()
            .all(|&n| n >= cfg.min_fired_chips && n <= cfg.n_tracks_accept);
        if !chips_ok {
            return Selection::Rejected(Cut::FiredChips);
        }

        Selection::Accepted(SelectedEvent {
            track_indices,
            stg_mask,
        })
    }

    /// Evaluate an event and record the outcome in the cut flow
    pub fn apply(&mut self, event: &EsdEvent, statuses: &[TrackStatus]) -> Selection {
        let selection = self.evaluate(event, statuses);
        if let Selection::Rejected(cut) = &selection {
            log::debug!(
                "run {} event {} rejected by {}",
                event.run,
                event.event_number,
                cut
            );
        }
        self.cut_flow.record(&selection);
        selection
    }

    pub fn cut_flow(&self) -> &CutFlow {
        &self.cut_flow
    }
}
