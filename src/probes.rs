use std::collections::BTreeMap;

use crate::models::Sequential;
use crate::prelude::*;

/// Position of an epoch in the training timeline.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EpochMarker {
    First,
    Last,
}

impl EpochMarker {
    /// Tag used in artifact filenames.
    pub fn tag(&self) -> &'static str {
        match self {
            EpochMarker::First => "first",
            EpochMarker::Last => "last",
        }
    }
}

#[derive(Debug, Clone)]
enum ProbeState {
    Idle,
    Armed(EpochMarker),
    Fired(EpochMarker, Array2<f64>),
}

/// One observation point per layer.
#[derive(Debug)]
struct Probe {
    state: ProbeState,
}

/// A pre-activation captured by a probe.
#[derive(Debug, Clone)]
pub struct CapturedSignal {
    pub layer_index: usize,
    pub marker: EpochMarker,
    pub tensor: Array2<f64>,
}

/// Side-channel observer for the pre-activations of a network's layers.
///
/// Attaching a recorder never changes what the network computes: `observe`
/// only clones the tensor it is shown, and only while the probe is armed.
/// Probes are one-shot per arming; re-arm them for every epoch that should
/// be captured.
#[derive(Debug)]
pub struct SignalRecorder {
    probes: Vec<Probe>,
    captured: Vec<CapturedSignal>,
}

impl SignalRecorder {
    pub fn attach(network: &Sequential) -> Self {
        let probes = (0..network.depth())
            .map(|_| Probe {
                state: ProbeState::Idle,
            })
            .collect();
        Self {
            probes,
            captured: Vec::new(),
        }
    }

    /// Arms every probe for one capture tagged with `marker`. Any capture
    /// still held in a fired probe is harvested first.
    pub fn arm(&mut self, marker: EpochMarker) {
        self.harvest();
        for probe in self.probes.iter_mut() {
            probe.state = ProbeState::Armed(marker);
        }
    }

    /// Shows a layer's pre-activation to its probe. A no-op unless the probe
    /// is armed.
    pub fn observe(&mut self, layer_index: usize, z: &Array2<f64>) {
        let Some(probe) = self.probes.get_mut(layer_index) else {
            return;
        };
        if let ProbeState::Armed(marker) = probe.state {
            probe.state = ProbeState::Fired(marker, z.clone());
        }
    }

    /// Releases all probes and returns what they captured. Safe when some
    /// probes never fired.
    pub fn detach(mut self) -> Vec<CapturedSignal> {
        self.harvest();
        self.captured
    }

    fn harvest(&mut self) {
        for (layer_index, probe) in self.probes.iter_mut().enumerate() {
            let state = std::mem::replace(&mut probe.state, ProbeState::Idle);
            match state {
                ProbeState::Fired(marker, tensor) => self.captured.push(CapturedSignal {
                    layer_index,
                    marker,
                    tensor,
                }),
                other => probe.state = other,
            }
        }
    }
}

/// Groups captures into per-marker layer maps for persistence.
pub fn group_by_marker(
    signals: &[CapturedSignal],
) -> BTreeMap<EpochMarker, BTreeMap<usize, Array2<f64>>> {
    let mut grouped: BTreeMap<EpochMarker, BTreeMap<usize, Array2<f64>>> = BTreeMap::new();
    for signal in signals {
        grouped
            .entry(signal.marker)
            .or_default()
            .insert(signal.layer_index, signal.tensor.clone());
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schedule::WidthPolicy;

    fn network() -> Sequential {
        Sequential::gaussian(WidthPolicy::LinearShrink, 2, 6, 2, 1.0, 0.05).unwrap()
    }

    #[test]
    fn idle_probes_ignore_observations() {
        let net = network();
        let mut recorder = SignalRecorder::attach(&net);
        recorder.observe(0, &Array2::zeros((3, 4)));
        assert!(recorder.detach().is_empty());
    }

    #[test]
    fn armed_probes_fire_once_per_arming() {
        let net = network();
        let mut recorder = SignalRecorder::attach(&net);
        recorder.arm(EpochMarker::First);
        let first = Array2::from_elem((2, 4), 1.0);
        let second = Array2::from_elem((2, 4), 2.0);
        recorder.observe(0, &first);
        recorder.observe(0, &second); // already fired, must be ignored
        let captured = recorder.detach();
        assert_eq!(captured.len(), 1);
        assert_eq!(captured[0].layer_index, 0);
        assert_eq!(captured[0].marker, EpochMarker::First);
        assert_eq!(captured[0].tensor, first);
    }

    #[test]
    fn rearming_captures_a_second_marker() {
        let net = network();
        let mut recorder = SignalRecorder::attach(&net);
        recorder.arm(EpochMarker::First);
        recorder.observe(0, &Array2::zeros((1, 4)));
        recorder.observe(1, &Array2::zeros((1, 2)));
        recorder.arm(EpochMarker::Last);
        recorder.observe(0, &Array2::ones((1, 4)));
        // probe 1 never fires in the last epoch: detach must still be safe
        let grouped = group_by_marker(&recorder.detach());
        assert_eq!(grouped[&EpochMarker::First].len(), 2);
        assert_eq!(grouped[&EpochMarker::Last].len(), 1);
    }

    #[test]
    fn out_of_range_observation_is_ignored() {
        let net = network();
        let mut recorder = SignalRecorder::attach(&net);
        recorder.arm(EpochMarker::First);
        recorder.observe(99, &Array2::zeros((1, 1)));
        assert!(recorder.detach().is_empty());
    }
}
