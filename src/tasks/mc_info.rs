//! CEP trigger study with MC-truth comparison on ESD events
//!
//! Events passing the CEP selection must carry MC truth. For each of them the
//! truth momenta of the selected tracks are summed and compared with the
//! generated central system: if both invariant masses agree the event was
//! fully reconstructed.

use serde::{Deserialize, Serialize};

use crate::config::McInfoConfig;
use crate::error::CepError;
use crate::event::{EsdEvent, InputEvent, McEvent, McStack};
use crate::kinematics::LorentzVector;
use crate::output::{Histogram1D, OutputList, OutputObject, TaskOutputs};
use crate::selection::{CepSelection, Cut, CutFlow, SelectedEvent, Selection};
use crate::task::AnalysisTask;
use crate::CepResult;

pub const HISTOGRAM_SLOT: usize = 1;

/// Pythia process code of central diffraction
pub const PYTHIA_CD_PROCESS: i32 = 106;

const PHOTON_PDG: i32 = 22;

/// Per-run counters of the study
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct McInfoSummary {
    /// ESD events seen
    pub processed: u64,
    /// Events passing the CEP selection
    pub selected: u64,
    /// Selected events whose tracks account for the whole central system
    pub fully_reconstructed: u64,
}

/// Four-momentum of the centrally produced system from MC truth
///
/// Only Pythia central diffraction is understood: the system is particle 4
/// plus every later primary whose first mother is the beam particle 0.
/// Other generators give a zero vector.
pub fn central_system_momentum(mc: &McEvent) -> LorentzVector {
    let Some(stack) = mc.stack.as_ref() else {
        return LorentzVector::default();
    };
    if mc.generator != "Pythia" || mc.process_type != PYTHIA_CD_PROCESS {
        return LorentzVector::default();
    }
    let Some(first) = stack.particle(4) else {
        return LorentzVector::default();
    };

    let rest: LorentzVector = stack
        .particles
        .iter()
        .take(stack.n_primary)
        .skip(5)
        .filter(|p| p.mother == 0)
        .map(|p| p.momentum)
        .sum();
    first.momentum + rest
}

#[derive(Debug, Clone)]
pub struct McInfoTask {
    name: String,
    config: McInfoConfig,
    selection: CepSelection,
    outputs: TaskOutputs,
    summary: McInfoSummary,
}

impl McInfoTask {
    pub fn new(name: &str, config: McInfoConfig) -> Self {
        let selection = CepSelection::new(config.selection);
        Self {
            name: name.to_string(),
            config,
            selection,
            outputs: TaskOutputs::new(),
            summary: McInfoSummary::default(),
        }
    }

    pub fn summary(&self) -> McInfoSummary {
        self.summary
    }

    pub fn cut_flow(&self) -> &CutFlow {
        self.selection.cut_flow()
    }

    fn process(&mut self, esd: &EsdEvent) -> CepResult<()> {
        self.summary.processed += 1;

        let statuses = self.config.track_cuts.analyze_tracks(&esd.tracks);
        let selection = self.selection.apply(esd, &statuses);

        let list = self.outputs.list_mut(HISTOGRAM_SLOT)?;
        let selected = match selection {
            Selection::Accepted(selected) => {
                list.fill("cut_flow", Cut::all().len() as f64);
                selected
            }
            Selection::Rejected(cut) => {
                list.fill("cut_flow", cut.index() as f64);
                return Ok(());
            }
        };
        self.summary.selected += 1;

        let (mc, stack) = esd
            .mc_event()
            .and_then(|mc| mc.stack.as_ref().map(|stack| (mc, stack)))
            .ok_or(CepError::MissingMcTruth {
                run: esd.run,
                event: esd.event_number,
            })?;
        log::debug!(
            "stack: {} tracks, {} primaries, {} transported",
            stack.n_tracks(),
            stack.n_primary,
            stack.n_transported
        );

        let measured = self.measured_momentum(esd, stack, &selected)?;
        let generated = central_system_momentum(mc);
        let mass_diff = (measured.mass() - generated.mass()).abs();
        if mass_diff < self.config.mass_tolerance {
            self.summary.fully_reconstructed += 1;
            log::info!(
                "run {} event {}: fully reconstructed (M = {:.4} GeV)",
                esd.run,
                esd.event_number,
                generated.mass()
            );
        }

        self.fill_truth(esd, stack)
    }

    /// Sum of the MC-truth momenta behind the selected tracks
    fn measured_momentum(
        &self,
        esd: &EsdEvent,
        stack: &McStack,
        selected: &SelectedEvent,
    ) -> CepResult<LorentzVector> {
        selected
            .track_indices
            .iter()
            .map(|&idx| {
                let label = esd.tracks[idx].label;
                stack
                    .particle(label)
                    .map(|p| p.momentum)
                    .ok_or(CepError::MissingMcParticle { track: idx, label })
            })
            .sum()
    }

    fn fill_truth(&mut self, esd: &EsdEvent, stack: &McStack) -> CepResult<()> {
        let list = self.outputs.list_mut(HISTOGRAM_SLOT)?;
        for particle in &stack.particles {
            if particle.pdg == PHOTON_PDG {
                list.fill("gamma_e", particle.momentum.e);
            }
            if particle.is_neutral() {
                list.fill("neutral_pdg", particle.pdg.abs() as f64);
            }
        }
        for cluster in esd.calo_clusters.iter().filter(|c| c.label >= 0) {
            if let Some(mother) = stack.mother_of(cluster.label) {
                list.fill("emcal_hit_mothers", mother.pdg.abs() as f64);
            }
        }
        Ok(())
    }
}

impl Default for McInfoTask {
    fn default() -> Self {
        Self::new("mc_info", McInfoConfig::default())
    }
}

impl AnalysisTask for McInfoTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn create_output_objects(&mut self) -> CepResult<()> {
        self.config.validate()?;

        let n_cuts = Cut::all().len();
        let mut list = OutputList::new();
        list.add(Histogram1D::new("gamma_e", "photon energy", 100, 0.0, 10.0));
        list.add(Histogram1D::new(
            "neutral_pdg",
            "|PDG| of neutral particles",
            100,
            0.0,
            2500.0,
        ));
        list.add(Histogram1D::new(
            "emcal_hit_mothers",
            "|PDG| of EMCal hit mothers",
            100,
            0.0,
            2500.0,
        ));
        // one bin per rejecting cut plus one for accepted events
        list.add(Histogram1D::new(
            "cut_flow",
            "rejecting cut",
            n_cuts + 1,
            0.0,
            (n_cuts + 1) as f64,
        ));
        self.outputs.define(HISTOGRAM_SLOT, OutputObject::List(list));
        Ok(())
    }

    fn user_exec(&mut self, event: &InputEvent) -> CepResult<()> {
        match event.as_esd() {
            Some(esd) => self.process(esd),
            None => Ok(()),
        }
    }

    fn terminate(&mut self) -> CepResult<()> {
        let flow = self.selection.cut_flow();
        for cut in Cut::all() {
            log::info!(
                "{}: {:<12} rejected {:>6}, surviving {:>6}",
                self.name,
                cut.name(),
                flow.rejected_by(cut),
                flow.surviving(cut)
            );
        }
        log::info!(
            "{}: {} processed, {} selected, {} fully reconstructed",
            self.name,
            self.summary.processed,
            self.summary.selected,
            self.summary.fully_reconstructed
        );
        Ok(())
    }

    fn outputs(&self) -> &TaskOutputs {
        &self.outputs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EsdCaloCluster, EsdTrack, McParticle};
    use crate::fastor::FastOrMap;

    fn particle(pdg: i32, charge: f64, mother: i32, momentum: LorentzVector) -> McParticle {
        McParticle {
            pdg,
            charge,
            mother,
            momentum,
        }
    }

    fn pion(px: f64) -> LorentzVector {
        LorentzVector::from_momentum_mass(px, 0.1, 0.0, 0.139_570_39)
    }

    /// Pythia CD event: beams, remnants, central pi+ pi- and a photon
    fn cd_stack() -> McStack {
        let zero = LorentzVector::default();
        McStack {
            particles: vec![
                particle(2212, 1.0, -1, zero),
                particle(2212, 1.0, -1, zero),
                particle(2212, 1.0, 0, zero),
                particle(2212, 1.0, 1, zero),
                particle(211, 1.0, 0, pion(0.4)),
                particle(-211, -1.0, 0, pion(-0.4)),
                particle(22, 0.0, 2, LorentzVector::new(0.0, 0.0, 1.5, 1.5)),
            ],
            n_primary: 7,
            n_transported: 0,
        }
    }

    fn track(label: i32, px: f64) -> EsdTrack {
        EsdTrack {
            px,
            py: 0.1,
            pz: 0.0,
            charge: 1,
            label,
            tpc_refit: true,
            its_refit: true,
            tpc_shared_clusters: 0,
            dca_xy: 0.0,
            dca_z: 0.0,
        }
    }

    fn selected_event(labels: [i32; 2], mc: Option<McEvent>) -> EsdEvent {
        EsdEvent {
            run: 244918,
            event_number: 7,
            fired_chips: [2, 2],
            fastor: FastOrMap::from_chips([60, 260, 520, 920]).unwrap(),
            tracks: vec![track(labels[0], 0.4), track(labels[1], -0.4)],
            calo_clusters: vec![EsdCaloCluster {
                energy: 1.4,
                label: 6,
            }],
            mc,
            ..EsdEvent::default()
        }
    }

    fn cd_mc() -> McEvent {
        McEvent {
            generator: "Pythia".to_string(),
            process_type: PYTHIA_CD_PROCESS,
            stack: Some(cd_stack()),
        }
    }

    fn booked() -> McInfoTask {
        let mut task = McInfoTask::default();
        task.create_output_objects().unwrap();
        task
    }

    #[test]
    fn test_central_system_pythia_cd() {
        let p = central_system_momentum(&cd_mc());
        let expected = pion(0.4) + pion(-0.4);
        assert!((p.mass() - expected.mass()).abs() < 1e-12);
    }

    #[test]
    fn test_central_system_other_generator_is_zero() {
        let mc = McEvent {
            generator: "Phojet".to_string(),
            ..cd_mc()
        };
        assert_eq!(central_system_momentum(&mc), LorentzVector::default());

        let mc = McEvent {
            process_type: 105,
            ..cd_mc()
        };
        assert_eq!(central_system_momentum(&mc), LorentzVector::default());
    }

    #[test]
    fn test_fully_reconstructed_event() {
        let mut task = booked();
        let event = InputEvent::Esd(selected_event([4, 5], Some(cd_mc())));
        task.user_exec(&event).unwrap();

        let summary = task.summary();
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.selected, 1);
        assert_eq!(summary.fully_reconstructed, 1);

        let list = task.outputs().list(HISTOGRAM_SLOT).unwrap();
        assert_eq!(list.get("gamma_e").unwrap().count_at(1.5), 1);
        assert_eq!(list.get("neutral_pdg").unwrap().in_range(), 1);
        // cluster label 6 -> photon -> mother 2 is a proton
        assert_eq!(list.get("emcal_hit_mothers").unwrap().count_at(2212.0), 1);
        assert_eq!(
            list.get("cut_flow").unwrap().count_at(Cut::all().len() as f64),
            1
        );
    }

    #[test]
    fn test_partially_reconstructed_event() {
        let mut task = booked();
        // second track points at the photon instead of the pi-
        let event = InputEvent::Esd(selected_event([4, 6], Some(cd_mc())));
        task.user_exec(&event).unwrap();
        assert_eq!(task.summary().selected, 1);
        assert_eq!(task.summary().fully_reconstructed, 0);
    }

    #[test]
    fn test_missing_mc_is_an_error() {
        let mut task = booked();
        let event = InputEvent::Esd(selected_event([4, 5], None));
        let err = task.user_exec(&event).unwrap_err();
        assert!(matches!(
            err,
            CepError::MissingMcTruth {
                run: 244918,
                event: 7
            }
        ));

        let stackless = McEvent {
            stack: None,
            ..cd_mc()
        };
        let event = InputEvent::Esd(selected_event([4, 5], Some(stackless)));
        assert!(task.user_exec(&event).is_err());
    }

    #[test]
    fn test_unlabelled_track_is_an_error() {
        let mut task = booked();
        let event = InputEvent::Esd(selected_event([4, -1], Some(cd_mc())));
        assert!(matches!(
            task.user_exec(&event),
            Err(CepError::MissingMcParticle {
                track: 1,
                label: -1
            })
        ));
    }

    #[test]
    fn test_rejected_event_needs_no_mc() {
        let mut task = booked();
        let mut esd = selected_event([4, 5], None);
        esd.triggers.adc = true;
        task.user_exec(&InputEvent::Esd(esd)).unwrap();

        assert_eq!(task.summary().selected, 0);
        assert_eq!(task.cut_flow().rejected_by(Cut::AdVeto), 1);
        let list = task.outputs().list(HISTOGRAM_SLOT).unwrap();
        assert_eq!(
            list.get("cut_flow")
                .unwrap()
                .count_at(Cut::AdVeto.index() as f64),
            1
        );
    }

    #[test]
    fn test_skips_aod_events() {
        let mut task = booked();
        task.user_exec(&InputEvent::Aod(Default::default())).unwrap();
        assert_eq!(task.summary().processed, 0);
    }
}
