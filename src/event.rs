//! Event snapshots handed to analysis tasks
//!
//! Two flavours exist, mirroring the reconstruction output:
//! - [`EsdEvent`]: full reconstruction with trigger inputs, FastOR map and
//!   optional MC truth. Used by the CEP trigger study.
//! - [`AodEvent`]: reduced analysis data with PID signals and detector
//!   channels. Used by the template task.
//!
//! Events are read one per line as JSON, tagged by `"kind"`.

use serde::{Deserialize, Serialize};

use crate::fastor::FastOrMap;
use crate::kinematics::LorentzVector;

/// Charged pion mass (GeV), assigned to reconstructed tracks
pub const PION_MASS: f64 = 0.139_570_39;

/// One input event of either flavour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum InputEvent {
    Esd(EsdEvent),
    Aod(AodEvent),
}

impl InputEvent {
    pub fn as_esd(&self) -> Option<&EsdEvent> {
        match self {
            Self::Esd(esd) => Some(esd),
            Self::Aod(_) => None,
        }
    }

    pub fn as_aod(&self) -> Option<&AodEvent> {
        match self {
            Self::Aod(aod) => Some(aod),
            Self::Esd(_) => None,
        }
    }

    /// Short flavour name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Esd(_) => "esd",
            Self::Aod(_) => "aod",
        }
    }
}

/// Reconstructed vertex
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Vertex {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Position resolutions
    pub sigma_x: f64,
    pub sigma_y: f64,
    pub sigma_z: f64,
    pub n_contributors: u32,
}

impl Vertex {
    pub fn at_z(z: f64) -> Self {
        Self {
            z,
            ..Self::default()
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ESD
// ═══════════════════════════════════════════════════════════════════════════════

/// Offline trigger inputs of the forward detectors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OfflineTrigger {
    V0A,
    V0C,
    ADA,
    ADC,
}

/// Offline trigger decisions of one event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OfflineTriggers {
    pub v0a: bool,
    pub v0c: bool,
    pub ada: bool,
    pub adc: bool,
}

impl OfflineTriggers {
    pub fn is_fired(&self, trigger: OfflineTrigger) -> bool {
        match trigger {
            OfflineTrigger::V0A => self.v0a,
            OfflineTrigger::V0C => self.v0c,
            OfflineTrigger::ADA => self.ada,
            OfflineTrigger::ADC => self.adc,
        }
    }
}

/// Luminous region of the run
///
/// A width below 0.01 cm means the diamond was not measured along that axis.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BeamDiamond {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub sigma_x: f64,
    pub sigma_y: f64,
    pub sigma_z: f64,
}

impl BeamDiamond {
    const MIN_SIGMA2: f64 = 1e-4;

    /// Largest accepted distance from the diamond centre, or infinity when the
    /// axis is unmeasured
    fn window(sigma: f64, n_sigma: f64, resolution: f64) -> f64 {
        if sigma * sigma < Self::MIN_SIGMA2 {
            f64::INFINITY
        } else {
            n_sigma * resolution
        }
    }
}

/// SPD pileup rejection parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PileupCuts {
    /// Contributors needed for a pileup vertex to count
    pub min_contributors: u32,
    /// Minimal z distance to the primary vertex (cm)
    pub min_z_dist: f64,
    /// Minimal z distance in units of the combined z resolution
    pub n_sigma_z_dist: f64,
    /// Transverse window around the beam diamond, in units of the combined resolution
    pub n_sigma_diam_xy: f64,
    /// Longitudinal window around the beam diamond, in units of the diamond width
    pub n_sigma_diam_z: f64,
}

impl Default for PileupCuts {
    fn default() -> Self {
        Self {
            min_contributors: 3,
            min_z_dist: 0.8,
            n_sigma_z_dist: 3.0,
            n_sigma_diam_xy: 2.0,
            n_sigma_diam_z: 5.0,
        }
    }
}

/// Reconstructed ESD track
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EsdTrack {
    pub px: f64,
    pub py: f64,
    pub pz: f64,
    pub charge: i8,
    /// Index into the MC stack, negative when no truth particle is linked
    pub label: i32,
    pub tpc_refit: bool,
    pub its_refit: bool,
    /// TPC clusters shared with other tracks
    pub tpc_shared_clusters: u16,
    /// Transverse distance of closest approach (cm)
    pub dca_xy: f64,
    /// Longitudinal distance of closest approach (cm)
    pub dca_z: f64,
}

impl EsdTrack {
    /// Four-momentum under the pion mass hypothesis
    pub fn momentum(&self) -> LorentzVector {
        LorentzVector::from_momentum_mass(self.px, self.py, self.pz, PION_MASS)
    }

    pub fn pt(&self) -> f64 {
        self.px.hypot(self.py)
    }

    pub fn eta(&self) -> f64 {
        self.momentum().eta()
    }
}

/// Calorimeter cluster with its MC truth link
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EsdCaloCluster {
    pub energy: f64,
    pub label: i32,
}

/// Full reconstruction snapshot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EsdEvent {
    pub run: u32,
    pub event_number: u64,
    pub primary_vertex: Vertex,
    pub spd_pileup_vertices: Vec<Vertex>,
    pub diamond: BeamDiamond,
    pub triggers: OfflineTriggers,
    /// Fired-chip counters of SPD layer 0 and layer 1
    pub fired_chips: [u16; 2],
    pub fastor: FastOrMap,
    pub tracks: Vec<EsdTrack>,
    pub calo_clusters: Vec<EsdCaloCluster>,
    pub mc: Option<McEvent>,
}

impl EsdEvent {
    pub fn is_offline_trigger_fired(&self, trigger: OfflineTrigger) -> bool {
        self.triggers.is_fired(trigger)
    }

    /// Whether one of the SPD pileup vertices lies inside the beam diamond and
    /// is separated from the primary vertex along z by more than the cuts allow
    ///
    /// Never true when the primary vertex has no contributors.
    pub fn is_pileup_from_spd(&self, cuts: &PileupCuts) -> bool {
        let pv = &self.primary_vertex;
        if pv.n_contributors < 1 {
            return false;
        }
        let diamond = &self.diamond;
        let z_window = BeamDiamond::window(diamond.sigma_z, cuts.n_sigma_diam_z, diamond.sigma_z);

        self.spd_pileup_vertices.iter().any(|pile| {
            if pile.n_contributors < cuts.min_contributors {
                return false;
            }
            let dz = (pile.z - pv.z).abs();
            if dz <= cuts.min_z_dist || (pile.z - diamond.z).abs() >= z_window {
                return false;
            }

            let x_window = BeamDiamond::window(
                diamond.sigma_x,
                cuts.n_sigma_diam_xy,
                pile.sigma_x.hypot(diamond.sigma_x),
            );
            let y_window = BeamDiamond::window(
                diamond.sigma_y,
                cuts.n_sigma_diam_xy,
                pile.sigma_y.hypot(diamond.sigma_y),
            );
            (pile.x - diamond.x).abs() < x_window
                && (pile.y - diamond.y).abs() < y_window
                && dz > cuts.n_sigma_z_dist * pv.sigma_z.hypot(pile.sigma_z)
        })
    }

    /// MC event, provided its particle stack is present
    pub fn mc_event(&self) -> Option<&McEvent> {
        self.mc.as_ref().filter(|mc| mc.stack.is_some())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// MC TRUTH
// ═══════════════════════════════════════════════════════════════════════════════

/// Generated particle
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct McParticle {
    pub pdg: i32,
    /// Electric charge in units of e
    pub charge: f64,
    /// Index of the first mother, negative for beam particles
    pub mother: i32,
    pub momentum: LorentzVector,
}

impl McParticle {
    pub fn is_neutral(&self) -> bool {
        self.charge == 0.0
    }
}

/// Particle stack of one generated event
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct McStack {
    pub particles: Vec<McParticle>,
    pub n_primary: usize,
    pub n_transported: usize,
}

impl McStack {
    pub fn n_tracks(&self) -> usize {
        self.particles.len()
    }

    /// Look up a particle by stack label
    pub fn particle(&self, label: i32) -> Option<&McParticle> {
        usize::try_from(label)
            .ok()
            .and_then(|i| self.particles.get(i))
    }

    /// Mother of the particle behind `label`
    pub fn mother_of(&self, label: i32) -> Option<&McParticle> {
        self.particle(label).and_then(|p| self.particle(p.mother))
    }
}

/// Generator-level information of one event
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct McEvent {
    /// Generator name, e.g. "Pythia"
    pub generator: String,
    /// Generator process code
    pub process_type: i32,
    pub stack: Option<McStack>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// AOD
// ═══════════════════════════════════════════════════════════════════════════════

/// AOD track with PID signals
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AodTrack {
    pub pt: f64,
    pub eta: f64,
    pub phi: f64,
    pub pdg: i32,
    /// Bit map of the track filters this track passed
    pub filter_map: u32,
    pub vx: f64,
    pub vy: f64,
    pub vz: f64,
    pub tpc_signal: f64,
    pub its_signal: f64,
    pub tof_signal: f64,
    pub trd_signal: f64,
    pub hmpid_signal: f64,
}

impl AodTrack {
    /// Whether the track passed any of the filters in `mask`
    pub fn test_filter_bit(&self, mask: u32) -> bool {
        self.filter_map & mask != 0
    }
}

/// Amplitude recorded in one detector cell or channel
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Channel {
    pub position: i16,
    pub amplitude: f64,
}

/// Calorimeter cluster made of cells
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CaloCluster {
    pub cells: Vec<Channel>,
}

/// Reduced analysis snapshot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AodEvent {
    pub run: u32,
    pub event_number: u64,
    pub primary_vertex: Option<Vertex>,
    pub tracks: Vec<AodTrack>,
    pub calo_clusters: Vec<CaloCluster>,
    pub v0: Vec<Channel>,
    pub fmd: Vec<Channel>,
    pub ad: Vec<Channel>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertex(z: f64, sigma_z: f64, n_contributors: u32) -> Vertex {
        Vertex {
            z,
            sigma_z,
            n_contributors,
            ..Vertex::default()
        }
    }

    #[test]
    fn test_event_flavour_tag() {
        let json = r#"{"kind":"aod","run":1,"tracks":[{"pt":1.5,"filter_map":1}]}"#;
        let event: InputEvent = serde_json::from_str(json).unwrap();
        assert!(event.as_esd().is_none());
        let aod = event.as_aod().unwrap();
        assert_eq!(aod.tracks.len(), 1);
        assert!(aod.tracks[0].test_filter_bit(1));
        assert!(!aod.tracks[0].test_filter_bit(2));
        assert_eq!(event.kind(), "aod");
    }

    #[test]
    fn test_esd_defaults_from_sparse_json() {
        let json = r#"{"kind":"esd","fastor":[0,400],"triggers":{"v0a":true}}"#;
        let event: InputEvent = serde_json::from_str(json).unwrap();
        let esd = event.as_esd().unwrap();
        assert_eq!(esd.fastor.count(), 2);
        assert!(esd.is_offline_trigger_fired(OfflineTrigger::V0A));
        assert!(!esd.is_offline_trigger_fired(OfflineTrigger::ADC));
        assert!(esd.mc.is_none());
    }

    #[test]
    fn test_pileup_from_spd() {
        let cuts = PileupCuts::default();
        let mut esd = EsdEvent {
            primary_vertex: vertex(0.0, 0.05, 10),
            ..EsdEvent::default()
        };
        assert!(!esd.is_pileup_from_spd(&cuts));

        // too few contributors
        esd.spd_pileup_vertices = vec![vertex(2.0, 0.1, 2)];
        assert!(!esd.is_pileup_from_spd(&cuts));

        // too close in z
        esd.spd_pileup_vertices = vec![vertex(0.5, 0.1, 5)];
        assert!(!esd.is_pileup_from_spd(&cuts));

        // far but poorly measured
        esd.spd_pileup_vertices = vec![vertex(1.0, 0.5, 5)];
        assert!(!esd.is_pileup_from_spd(&cuts));

        esd.spd_pileup_vertices = vec![vertex(2.0, 0.1, 5)];
        assert!(esd.is_pileup_from_spd(&cuts));
    }

    #[test]
    fn test_pileup_needs_primary_contributors() {
        let esd = EsdEvent {
            primary_vertex: vertex(0.0, 0.05, 0),
            spd_pileup_vertices: vec![vertex(3.0, 0.1, 5)],
            ..EsdEvent::default()
        };
        assert!(!esd.is_pileup_from_spd(&PileupCuts::default()));
    }

    #[test]
    fn test_pileup_inside_beam_diamond() {
        let cuts = PileupCuts::default();
        let mut esd = EsdEvent {
            primary_vertex: vertex(0.0, 0.05, 10),
            diamond: BeamDiamond {
                sigma_x: 0.02,
                sigma_y: 0.02,
                sigma_z: 1.0,
                ..BeamDiamond::default()
            },
            ..EsdEvent::default()
        };

        esd.spd_pileup_vertices = vec![vertex(2.0, 0.1, 5)];
        assert!(esd.is_pileup_from_spd(&cuts));

        // beyond 5 sigma of the diamond along z
        esd.spd_pileup_vertices = vec![vertex(6.0, 0.1, 5)];
        assert!(!esd.is_pileup_from_spd(&cuts));

        // displaced transversely by more than 2 sigma (0.04 cm)
        esd.spd_pileup_vertices = vec![Vertex {
            x: 0.05,
            ..vertex(2.0, 0.1, 5)
        }];
        assert!(!esd.is_pileup_from_spd(&cuts));

        // unmeasured diamond: no transverse or longitudinal window
        esd.diamond = BeamDiamond::default();
        esd.spd_pileup_vertices = vec![Vertex {
            x: 0.05,
            ..vertex(6.0, 0.1, 5)
        }];
        assert!(esd.is_pileup_from_spd(&cuts));
    }

    #[test]
    fn test_mc_event_requires_stack() {
        let mut esd = EsdEvent {
            mc: Some(McEvent::default()),
            ..EsdEvent::default()
        };
        assert!(esd.mc_event().is_none());

        esd.mc = Some(McEvent {
            stack: Some(McStack::default()),
            ..McEvent::default()
        });
        assert!(esd.mc_event().is_some());
    }

    #[test]
    fn test_stack_lookup() {
        let stack = McStack {
            particles: vec![
                McParticle {
                    pdg: 2212,
                    mother: -1,
                    ..McParticle::default()
                },
                McParticle {
                    pdg: 22,
                    mother: 0,
                    ..McParticle::default()
                },
            ],
            n_primary: 2,
            n_transported: 0,
        };
        assert_eq!(stack.particle(1).map(|p| p.pdg), Some(22));
        assert!(stack.particle(-1).is_none());
        assert!(stack.particle(2).is_none());
        assert_eq!(stack.mother_of(1).map(|p| p.pdg), Some(2212));
        assert!(stack.mother_of(0).is_none());
    }
}
