//! C4 — partition of the return-link spectrum into carriers grouped by
//! access class, and the terminal categories that own them.

use serde::Deserialize;

use crate::error::{CoreError, CoreResult};

/// The MAC access class a carrier serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessType {
    Dama,
    Aloha,
    Scpc,
    Vcm,
}

/// A group of carriers of equivalent access class within a category.
///
/// `remaining_capacity` is mutable scheduling state, reset to the carrier's
/// full packets-per-superframe capacity at the start of every superframe
/// (§4.7 Step A); everything else is fixed at init.
#[derive(Debug, Clone, Deserialize)]
pub struct CarriersGroup {
    pub carriers_id: u8,
    pub symbol_rate_bauds: u64,
    pub carriers_count: u32,
    /// Ordered low -> high; the carrier's current MODCOD is always a member.
    pub allowed_modcod_ids: Vec<u8>,
    pub ratio: f64,
    pub access_type: AccessType,
    /// Capacity left to allocate this superframe, in packets-per-superframe.
    /// Reset by `reset_capacity` at the top of every superframe.
    #[serde(skip, default)]
    pub remaining_capacity: u32,
}

impl CarriersGroup {
    pub fn total_symbols_per_superframe(&self) -> u64 {
        self.symbol_rate_bauds * self.carriers_count as u64
    }

    pub fn reset_capacity(&mut self, pktpf: u32) {
        self.remaining_capacity = pktpf;
    }

    pub fn supports_modcod(&self, modcod_id: u8) -> bool {
        self.allowed_modcod_ids.contains(&modcod_id)
    }

    /// The carrier's single operating MODCOD: the highest id it allows,
    /// used by Step A to convert symbol capacity to packets.
    pub fn carrier_modcod_id(&self) -> CoreResult<u8> {
        self.allowed_modcod_ids
            .iter()
            .max()
            .copied()
            .ok_or(CoreError::BadValue(format!(
                "carrier {} has no allowed modcods",
                self.carriers_id
            )))
    }
}

/// A category groups carriers of one access class that share a pool of
/// terminals. Invariant: the union of `allowed_modcod_ids` across its
/// groups is non-empty (enforced in `new`).
#[derive(Debug, Clone)]
pub struct TerminalCategory {
    pub label: String,
    pub groups: Vec<CarriersGroup>,
    /// `tal_id`s assigned to this category.
    pub terminals: Vec<u16>,
}

impl TerminalCategory {
    pub fn new(label: impl Into<String>, groups: Vec<CarriersGroup>) -> CoreResult<Self> {
        let label = label.into();
        if groups.iter().all(|g| g.allowed_modcod_ids.is_empty()) {
            return Err(CoreError::BadValue(format!(
                "category {label} has no usable modcods across its carriers"
            )));
        }
        Ok(TerminalCategory {
            label,
            groups,
            terminals: Vec::new(),
        })
    }

    pub fn add_terminal(&mut self, tal_id: u16) {
        if !self.terminals.contains(&tal_id) {
            self.terminals.push(tal_id);
        }
    }

    pub fn remove_terminal(&mut self, tal_id: u16) {
        self.terminals.retain(|&id| id != tal_id);
    }

    pub fn group_mut(&mut self, carriers_id: u8) -> Option<&mut CarriersGroup> {
        self.groups.iter_mut().find(|g| g.carriers_id == carriers_id)
    }

    pub fn reset_all_capacities(&mut self, pktpfs: &[(u8, u32)]) {
        for group in self.groups.iter_mut() {
            if let Some((_, pktpf)) =
                pktpfs.iter().find(|(id, _)| *id == group.carriers_id)
            {
                group.reset_capacity(*pktpf);
            }
        }
    }
}
