//! C12 — per-terminal Fair-MODCOD-Tracking simulation (§4.9): keeps each
//! terminal's `current_input_modcod_id` in step with a simulated or
//! externally-reported channel condition.

use std::collections::HashMap;

use crate::attenuation::AttenuationModel;
use crate::error::CoreResult;
use crate::modcod::ModcodTable;

/// One terminal's tracked ESN0/MODCOD state.
#[derive(Debug)]
struct TrackedTerminal {
    model: Box<dyn AttenuationModel>,
    overridden_cni_db: Option<f32>,
}

/// Drives `current_input_modcod_id` for every tracked terminal, either from
/// a plugged-in attenuation model or from an external SAC-reported CNI.
#[derive(Debug, Default)]
pub struct FmtSimulation {
    terminals: HashMap<u16, TrackedTerminal>,
}

impl FmtSimulation {
    pub fn new() -> Self {
        FmtSimulation {
            terminals: HashMap::new(),
        }
    }

    pub fn track(&mut self, tal_id: u16, model: Box<dyn AttenuationModel>) {
        self.terminals.insert(
            tal_id,
            TrackedTerminal {
                model,
                overridden_cni_db: None,
            },
        );
    }

    pub fn untrack(&mut self, tal_id: u16) {
        self.terminals.remove(&tal_id);
    }

    /// External CNI notification (e.g. derived from a `Sac` frame):
    /// overrides the next `tick()` for this terminal only.
    pub fn require_cni(&mut self, tal_id: u16, cni_db: f32) {
        if let Some(tracked) = self.terminals.get_mut(&tal_id) {
            tracked.overridden_cni_db = Some(cni_db);
        }
    }

    /// Updates every tracked terminal's best-fit MODCOD id for the current
    /// superframe, returning the ids keyed by `tal_id`.
    pub fn tick(&mut self, sf: u32, modcods: &ModcodTable) -> CoreResult<HashMap<u16, u8>> {
        let mut updates = HashMap::with_capacity(self.terminals.len());
        for (tal_id, tracked) in self.terminals.iter_mut() {
            let esn0_db = match tracked.overridden_cni_db.take() {
                Some(cni) => cni,
                None => tracked.model.sample(sf),
            };
            let modcod_id = modcods.best_id_for(esn0_db)?;
            updates.insert(*tal_id, modcod_id);
        }
        Ok(updates)
    }
}
