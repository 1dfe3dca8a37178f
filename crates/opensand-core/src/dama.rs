//! C9 — the DAMA return-link allocator (§4.7): RBDC fair-share with
//! carried credit, VBDC exhaustion, FCA top-up, run per category per
//! carrier group every superframe.

use std::collections::HashMap;

use crate::carriers::{CarriersGroup, TerminalCategory};
use crate::counters::{CounterKind, Counters};
use crate::error::{CoreError, CoreResult};
use crate::terminal::TerminalContext;
use crate::units::UnitConverter;

#[derive(Debug, Clone, Copy)]
pub struct DamaParams {
    pub fca_kbps: f64,
}

/// One terminal's award on one carrier for the current superframe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allocation {
    pub tal_id: u16,
    pub carrier_id: u8,
    pub rbdc_pktpf: u32,
    pub vbdc_pktpf: u32,
    pub fca_pktpf: u32,
}

/// Runs the four-step DAMA algorithm across every category and carrier
/// group. Owns nothing long-lived beyond the parameters; categories and
/// terminal contexts are borrowed for the duration of one superframe.
#[derive(Debug)]
pub struct DamaCtrl {
    params: DamaParams,
}

impl DamaCtrl {
    pub fn new(params: DamaParams) -> Self {
        DamaCtrl { params }
    }

    /// Runs one superframe's allocation across `categories`, consulting and
    /// updating `terminals`. Returns every terminal's award, one entry per
    /// `(tal_id, carrier_id)` pair that received anything.
    pub fn run_superframe(
        &self,
        categories: &mut [TerminalCategory],
        terminals: &mut HashMap<u16, TerminalContext>,
        conv: &UnitConverter<'_>,
        counters: &Counters,
    ) -> CoreResult<Vec<Allocation>> {
        let mut allocations = Vec::new();

        for category in categories.iter_mut() {
            for group in category.groups.iter_mut() {
                let carrier_modcod = match group.carrier_modcod_id() {
                    Ok(id) => id,
                    Err(e) => {
                        counters.incr(e.counter_kind());
                        continue;
                    }
                };

                // Step A: capacity initialization. Total symbol capacity is
                // converted straight to kbits, then divided by one packet's
                // worth of kbits -- no rate/duration conversion needed since
                // `sym_to_kbits` already yields the whole superframe's kbits.
                let total_kbits = conv.sym_to_kbits(
                    group.total_symbols_per_superframe(),
                    carrier_modcod,
                )?;
                let kbits_per_pkt = conv.pkt_to_kbits(1, carrier_modcod)?;
                let superframe_pktpf = if kbits_per_pkt > 0.0 {
                    (total_kbits / kbits_per_pkt).floor().max(0.0) as u32
                } else {
                    0
                };
                group.reset_capacity(superframe_pktpf);

                // Terminals on this group whose carrier they can decode.
                let mut members: Vec<u16> = Vec::new();
                for tal_id in &category.terminals {
                    let Some(ctx) = terminals.get(tal_id) else {
                        counters.incr(CounterKind::unknown_terminal);
                        continue;
                    };
                    if ctx.carrier_id != group.carriers_id {
                        continue;
                    }
                    if !group.supports_modcod(ctx.current_input_modcod_id) {
                        counters.incr(CounterKind::modcod_mismatch);
                        continue;
                    }
                    members.push(*tal_id);
                }

                self.run_rbdc(&members, group, terminals, conv, counters)?;
                self.run_vbdc(&members, group, terminals, counters);
                self.run_fca(&members, group, terminals, conv, counters)?;

                for tal_id in &members {
                    let ctx = terminals.get(tal_id).expect("checked above");
                    if ctx.total_alloc_pktpf() > 0 {
                        allocations.push(Allocation {
                            tal_id: *tal_id,
                            carrier_id: group.carriers_id,
                            rbdc_pktpf: ctx.rbdc_alloc_pktpf,
                            vbdc_pktpf: ctx.vbdc_alloc_pkt,
                            fca_pktpf: ctx.fca_alloc_pktpf,
                        });
                    }
                }
            }
        }

        Ok(allocations)
    }

    fn run_rbdc(
        &self,
        members: &[u16],
        group: &mut CarriersGroup,
        terminals: &mut HashMap<u16, TerminalContext>,
        conv: &UnitConverter<'_>,
        counters: &Counters,
    ) -> CoreResult<()> {
        if group.remaining_capacity == 0 || members.is_empty() {
            return Ok(());
        }

        let mut requests: Vec<(u16, u32)> = Vec::with_capacity(members.len());
        let mut total_request_pktpf: u64 = 0;
        for tal_id in members {
            let ctx = terminals.get(tal_id).expect("checked above");
            let conversion = conv.kbps_to_pktpf(
                ctx.rbdc_request_kbps,
                ctx.current_input_modcod_id,
            )?;
            total_request_pktpf += conversion.pkt as u64;
            requests.push((*tal_id, conversion.pkt));
        }

        let remaining = group.remaining_capacity as u64;
        if total_request_pktpf <= remaining {
            for (tal_id, pkt) in &requests {
                let ctx = terminals.get_mut(tal_id).expect("checked above");
                ctx.rbdc_alloc_pktpf = *pkt;
                group.remaining_capacity -= *pkt;
            }
            return Ok(());
        }

        if total_request_pktpf == 0 {
            return Ok(());
        }
        let fair_share = total_request_pktpf as f64 / remaining as f64;

        let mut one_slot_kbps = HashMap::new();
        for (tal_id, pkt) in &requests {
            let ctx = terminals.get_mut(tal_id).expect("checked above");
            let share = (*pkt as f64) / fair_share;
            let awarded = share.floor() as u32;
            ctx.rbdc_alloc_pktpf = awarded;
            let slot_kbps = conv.one_packet_kbps(ctx.current_input_modcod_id)?;
            one_slot_kbps.insert(*tal_id, slot_kbps);
            // Step B.3: the credit carried over is the fractional residue
            // of the fair-share division, not the raw request's flooring.
            let leftover_pkt = share - awarded as f64;
            ctx.add_rbdc_credit(leftover_pkt * slot_kbps, slot_kbps);
        }
        let awarded_total: u32 = requests
            .iter()
            .map(|(id, ..)| terminals[id].rbdc_alloc_pktpf)
            .sum();
        group.remaining_capacity = group.remaining_capacity.saturating_sub(awarded_total);

        if fair_share > 1.0 {
            let mut by_credit: Vec<u16> = members.to_vec();
            by_credit.sort_by(|a, b| {
                terminals[b]
                    .rbdc_credit_kbps
                    .partial_cmp(&terminals[a].rbdc_credit_kbps)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            for tal_id in by_credit {
                if group.remaining_capacity == 0 {
                    break;
                }
                let slot_kbps = *one_slot_kbps.get(&tal_id).unwrap_or(&0.0);
                let ctx = terminals.get_mut(&tal_id).expect("checked above");
                // credit is capped at `slot_kbps` by `add_rbdc_credit`, so a
                // terminal only clears the bar once its carried-over residue
                // has actually saturated a full packet's worth of rate.
                if ctx.rbdc_credit_kbps < slot_kbps || slot_kbps <= 0.0 {
                    continue;
                }
                if ctx.rbdc_alloc_pktpf + 1 > ctx.max_rbdc_pktpf {
                    continue;
                }
                ctx.rbdc_alloc_pktpf += 1;
                ctx.rbdc_credit_kbps -= slot_kbps;
                group.remaining_capacity -= 1;
            }
        }

        let _ = counters;
        Ok(())
    }

    fn run_vbdc(
        &self,
        members: &[u16],
        group: &mut CarriersGroup,
        terminals: &mut HashMap<u16, TerminalContext>,
        counters: &Counters,
    ) {
        let mut by_request: Vec<u16> = members.to_vec();
        by_request.sort_by(|a, b| {
            terminals[b]
                .vbdc_request_pkt
                .cmp(&terminals[a].vbdc_request_pkt)
        });

        for tal_id in by_request {
            if group.remaining_capacity == 0 {
                let ctx = terminals.get(&tal_id).expect("checked above");
                if ctx.vbdc_request_pkt > 0 {
                    tracing::debug!(tal_id, "vbdc request left unserved this superframe");
                }
                continue;
            }
            let ctx = terminals.get_mut(&tal_id).expect("checked above");
            let request = ctx.vbdc_request_pkt;
            if request == 0 {
                continue;
            }
            if request <= group.remaining_capacity {
                ctx.vbdc_alloc_pkt = request;
                ctx.vbdc_request_pkt = 0;
                group.remaining_capacity -= request;
            } else {
                ctx.vbdc_alloc_pkt = group.remaining_capacity;
                ctx.vbdc_request_pkt = request - group.remaining_capacity;
                group.remaining_capacity = 0;
                counters.incr(CounterKind::under_allocated);
            }
        }
    }

    fn run_fca(
        &self,
        members: &[u16],
        group: &mut CarriersGroup,
        terminals: &mut HashMap<u16, TerminalContext>,
        conv: &UnitConverter<'_>,
        _counters: &Counters,
    ) -> CoreResult<()> {
        if self.params.fca_kbps <= 0.0 || group.remaining_capacity == 0 || members.is_empty() {
            return Ok(());
        }

        let mut by_credit: Vec<u16> = members.to_vec();
        by_credit.sort_by(|a, b| {
            terminals[a]
                .rbdc_credit_kbps
                .partial_cmp(&terminals[b].rbdc_credit_kbps)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        for tal_id in by_credit {
            if group.remaining_capacity == 0 {
                break;
            }
            let ctx = terminals.get(&tal_id).expect("checked above");
            let fca_pktpf = conv
                .kbps_to_pktpf(self.params.fca_kbps, ctx.current_input_modcod_id)?
                .pkt
                .min(group.remaining_capacity);
            if fca_pktpf == 0 {
                continue;
            }
            let ctx = terminals.get_mut(&tal_id).expect("checked above");
            ctx.fca_alloc_pktpf = fca_pktpf;
            group.remaining_capacity -= fca_pktpf;
        }
        Ok(())
    }
}
