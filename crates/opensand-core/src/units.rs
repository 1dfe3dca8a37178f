//! C1 — conversions between kbit/s, packets/superframe, symbols and
//! kilobits for a given MODCOD and superframe duration.
//!
//! All conversions round down to whole, non-negative packets; the lost
//! fractional rate is returned alongside as a credit so callers (chiefly
//! the DAMA controller, §4.7 Step B) can carry it to the next superframe
//! instead of discarding it.

use crate::error::CoreResult;
use crate::modcod::ModcodTable;

/// Converts between rates/volumes for a fixed superframe duration, against
/// a shared MODCOD table. One instance is shared read-only across a block.
#[derive(Debug, Clone, Copy)]
pub struct UnitConverter<'a> {
    superframe_duration_ms: f64,
    modcods: &'a ModcodTable,
}

/// A packet count plus the fractional rate lost to flooring, in kbps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PktConversion {
    pub pkt: u32,
    pub credit_kbps: f64,
}

impl<'a> UnitConverter<'a> {
    pub fn new(superframe_duration_ms: f64, modcods: &'a ModcodTable) -> Self {
        UnitConverter {
            superframe_duration_ms,
            modcods,
        }
    }

    fn superframe_duration_s(&self) -> f64 {
        self.superframe_duration_ms / 1000.0
    }

    /// Spectral efficiency of `modcod_id` times `sym`, divided by 1000.
    pub fn sym_to_kbits(&self, sym: u64, modcod_id: u8) -> CoreResult<f64> {
        let def = self.modcods.def(modcod_id)?;
        Ok(def.spectral_efficiency() * sym as f64 / 1000.0)
    }

    pub fn pkt_to_kbits(&self, pkt: u32, modcod_id: u8) -> CoreResult<f64> {
        let def = self.modcods.def(modcod_id)?;
        self.sym_to_kbits(def.burst_length_symbols as u64 * pkt as u64, modcod_id)
    }

    /// Floors to whole packets per superframe; the remainder is returned as
    /// a credit in kbps, bounded by less than one packet's worth of rate.
    pub fn kbps_to_pktpf(
        &self,
        rate_kbps: f64,
        modcod_id: u8,
    ) -> CoreResult<PktConversion> {
        let kbits_per_sf = rate_kbps.max(0.0) * self.superframe_duration_s();
        let kbits_per_pkt = self.pkt_to_kbits(1, modcod_id)?;
        if kbits_per_pkt <= 0.0 {
            return Ok(PktConversion {
                pkt: 0,
                credit_kbps: 0.0,
            });
        }
        let pkt = (kbits_per_sf / kbits_per_pkt).floor().max(0.0) as u32;
        let residue_kbits = (kbits_per_sf - pkt as f64 * kbits_per_pkt).max(0.0);
        let credit_kbps = residue_kbits / self.superframe_duration_s();
        Ok(PktConversion { pkt, credit_kbps })
    }

    pub fn pktpf_to_kbps(&self, pkt: u32, modcod_id: u8) -> CoreResult<f64> {
        let kbits = self.pkt_to_kbits(pkt, modcod_id)?;
        Ok(kbits / self.superframe_duration_s())
    }

    /// Packets-per-superframe worth of rate, i.e. `pktpf_to_kbps(1, modcod_id)`.
    /// Used as the bound for a terminal's RBDC credit (§3 invariant).
    pub fn one_packet_kbps(&self, modcod_id: u8) -> CoreResult<f64> {
        self.pktpf_to_kbps(1, modcod_id)
    }
}
