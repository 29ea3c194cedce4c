//! Template task: basic kinematics and flat trees from AOD events
//!
//! | slot | content |
//! |------|---------|
//! | 1 | histograms `pt`, `eta`, `prim_vertex_z` |
//! | 2 | tree `particles` |
//! | 3 | tree `emcal_cells` |
//! | 4 | tree `v0_channels` |
//! | 5 | tree `fmd_channels` |
//! | 6 | tree `ad_channels` |

use crate::config::MyTaskConfig;
use crate::event::{AodEvent, Channel, InputEvent};
use crate::output::{Histogram1D, OutputList, OutputObject, TaskOutputs, Tree};
use crate::task::AnalysisTask;
use crate::CepResult;

pub const HISTOGRAM_SLOT: usize = 1;
pub const PARTICLE_SLOT: usize = 2;
pub const EMCAL_SLOT: usize = 3;
pub const V0_SLOT: usize = 4;
pub const FMD_SLOT: usize = 5;
pub const AD_SLOT: usize = 6;

const PARTICLE_BRANCHES: [&str; 15] = [
    "eta",
    "phi",
    "pt",
    "tpc_signal",
    "its_signal",
    "tof_signal",
    "trd_signal",
    "hmpid_signal",
    "pdg",
    "vx",
    "vy",
    "vz",
    "prim_vertex_z",
    "n_tracks",
    "filter_map",
];

const CHANNEL_BRANCHES: [&str; 2] = ["amplitude", "position"];

#[derive(Debug, Clone)]
pub struct MyTask {
    name: String,
    config: MyTaskConfig,
    outputs: TaskOutputs,
    /// AOD events seen
    n_events: u64,
}

impl MyTask {
    pub fn new(name: &str, config: MyTaskConfig) -> Self {
        Self {
            name: name.to_string(),
            config,
            outputs: TaskOutputs::new(),
            n_events: 0,
        }
    }

    pub fn n_events(&self) -> u64 {
        self.n_events
    }

    fn fill_channels(&mut self, slot: usize, channels: &[Channel]) -> CepResult<()> {
        let tree = self.outputs.tree_mut(slot)?;
        for ch in channels {
            tree.fill(&[ch.amplitude, ch.position as f64])?;
        }
        Ok(())
    }

    fn process(&mut self, aod: &AodEvent) -> CepResult<()> {
        let Some(vertex) = aod.primary_vertex else {
            log::debug!("skipping event {}: no primary vertex", aod.event_number);
            return Ok(());
        };
        self.n_events += 1;

        let vertex_z = vertex.z;
        self.outputs
            .list_mut(HISTOGRAM_SLOT)?
            .fill("prim_vertex_z", vertex_z);

        let n_tracks = aod.tracks.len() as f64;
        let mask = self.config.filter_mask;
        for track in aod.tracks.iter().filter(|t| t.test_filter_bit(mask)) {
            let list = self.outputs.list_mut(HISTOGRAM_SLOT)?;
            list.fill("pt", track.pt);
            list.fill("eta", track.eta);

            self.outputs.tree_mut(PARTICLE_SLOT)?.fill(&[
                track.eta,
                track.phi,
                track.pt,
                track.tpc_signal,
                track.its_signal,
                track.tof_signal,
                track.trd_signal,
                track.hmpid_signal,
                track.pdg as f64,
                track.vx,
                track.vy,
                track.vz,
                vertex_z,
                n_tracks,
                track.filter_map as f64,
            ])?;
        }

        for cluster in &aod.calo_clusters {
            self.fill_channels(EMCAL_SLOT, &cluster.cells)?;
        }
        self.fill_channels(V0_SLOT, &aod.v0)?;
        self.fill_channels(FMD_SLOT, &aod.fmd)?;
        self.fill_channels(AD_SLOT, &aod.ad)?;
        Ok(())
    }
}

impl Default for MyTask {
    fn default() -> Self {
        Self::new("my_task", MyTaskConfig::default())
    }
}

impl AnalysisTask for MyTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn create_output_objects(&mut self) -> CepResult<()> {
        let mut list = OutputList::new();
        list.add(Histogram1D::new("pt", "track p_{T}", 100, 0.0, 10.0));
        list.add(Histogram1D::new("eta", "track #eta", 100, -15.0, 15.0));
        list.add(Histogram1D::new(
            "prim_vertex_z",
            "primary vertex z",
            100,
            -7.0,
            7.0,
        ));
        self.outputs.define(HISTOGRAM_SLOT, OutputObject::List(list));

        let trees = [
            (PARTICLE_SLOT, "particles", "particle tree", &PARTICLE_BRANCHES[..]),
            (EMCAL_SLOT, "emcal_cells", "EMCal cell information", &CHANNEL_BRANCHES[..]),
            (V0_SLOT, "v0_channels", "V0 channel information", &CHANNEL_BRANCHES[..]),
            (FMD_SLOT, "fmd_channels", "FMD channel information", &CHANNEL_BRANCHES[..]),
            (AD_SLOT, "ad_channels", "AD channel information", &CHANNEL_BRANCHES[..]),
        ];
        for (slot, name, title, branches) in trees {
            self.outputs
                .define(slot, OutputObject::Tree(Tree::new(name, title, branches)));
        }
        Ok(())
    }

    fn user_exec(&mut self, event: &InputEvent) -> CepResult<()> {
        match event.as_aod() {
            Some(aod) => self.process(aod),
            None => Ok(()),
        }
    }

    fn terminate(&mut self) -> CepResult<()> {
        let particles = self.outputs.tree(PARTICLE_SLOT)?.entries();
        log::info!(
            "{}: {} AOD events, {} tracks stored",
            self.name,
            self.n_events,
            particles
        );
        Ok(())
    }

    fn outputs(&self) -> &TaskOutputs {
        &self.outputs
    }
}
