//! # CEP Analysis
//!
//! Event processing for ALICE Central Exclusive Production (CEP) trigger
//! studies: STG trigger emulation from the SPD FastOR map, the CEP event
//! selection, and two analysis tasks driven through an explicit lifecycle.
//!
//! ## Architecture
//!
//! ```text
//!   events.jsonl ─► EventReader ─► AnalysisManager
//!                                        │  create_output_objects / user_exec / terminate
//!                        ┌───────────────┴───────────────┐
//!                        ▼                               ▼
//!                     MyTask                        McInfoTask
//!                  (AOD events)                    (ESD events)
//!                 histograms, trees                      │
//!                                    TrackCuts ─► CepSelection ─► MC truth
//!                                                     │
//!                                    FastOrMap ─► is_stg_fired
//! ```
//!
//! ## STG trigger
//!
//! ```rust
//! use cep_analysis::{is_stg_fired, FastOrMap};
//!
//! // inner sector 5 (chips 100..120) facing outer bin 10 (chips 600..620)
//! let map = FastOrMap::from_chips([105, 610]).unwrap();
//! assert!(is_stg_fired(Some(&map), 0, 0));
//! assert!(!is_stg_fired(Some(&map), 1, 10));
//! ```

// Trigger emulation
pub mod fastor;
pub mod stg;

// Event model and selection
pub mod event;
pub mod kinematics;
pub mod selection;
pub mod track_cuts;

// Tasks and driver
pub mod config;
pub mod manager;
pub mod output;
pub mod task;
pub mod tasks;

pub mod error;


pub use config::{AnalysisConfig, McInfoConfig, MyTaskConfig};
pub use error::CepError;
pub use event::{
    AodEvent, AodTrack, BeamDiamond, EsdEvent, EsdTrack, InputEvent, McEvent, McParticle,
    McStack, OfflineTrigger, OfflineTriggers, PileupCuts, Vertex,
};
pub use fastor::{FastOrMap, N_CHIPS};
pub use kinematics::LorentzVector;
pub use manager::{AnalysisManager, EventReader, RunStats};
pub use output::{Histogram1D, OutputList, OutputObject, TaskOutputs, Tree};
pub use selection::{CepSelection, Cut, CutFlow, SelectedEvent, Selection, SelectionConfig};
pub use stg::{is_stg_fired, SectorPattern, StgTrigger};
pub use task::AnalysisTask;
pub use tasks::{McInfoTask, MyTask};
pub use track_cuts::{TrackCuts, TrackStatus};

/// Result type for CEP analysis operations
pub type CepResult<T> = Result<T, CepError>;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        // Trigger
        is_stg_fired,
        FastOrMap,
        StgTrigger,

        // Events and selection
        CepSelection,
        Cut,
        EsdEvent,
        AodEvent,
        InputEvent,
        SelectionConfig,
        TrackCuts,

        // Tasks
        AnalysisManager,
        AnalysisTask,
        McInfoTask,
        MyTask,

        // Result type
        CepResult,
        CepError,
    };
}
