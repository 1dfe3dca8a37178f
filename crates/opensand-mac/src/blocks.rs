//! C17 — the block runtime: one tokio task per GW/ST, wired the way the
//! message-passing redesign requires (§5, §9 "no shared-mutable per-spot
//! state"). The GW owns every piece of scheduling state exclusively and
//! only ever publishes a `StatusSnapshot` for the REST endpoint to read;
//! STs never touch it directly, they only push encapsulated traffic over
//! the uplink channel and listen for the SoF sentinel.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use opensand_core::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::time::interval;
use tracing::{debug, info, warn};

const MAX_FRAME_BYTES: usize = 4096;

/// One ST's encapsulated packet, handed to the GW over the uplink channel.
#[derive(Debug)]
pub struct Uplink {
    pub tal_id: u16,
    pub packet: NetPacket,
}

/// Everything the GW loop needs; built once in `main` from configuration
/// and moved into the task, never shared.
pub struct GwState {
    pub table: ModcodTable,
    pub superframe_duration_ms: f64,
    pub categories: Vec<TerminalCategory>,
    pub terminals: HashMap<u16, TerminalContext>,
    pub fifos: HashMap<u16, TerminalFifos>,
    pub clock: SuperframeClock,
    pub dama: DamaParams,
}

/// Latest allocation snapshot, published after every superframe for the
/// REST endpoint (§12) to read without touching the GW's working state.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusSnapshot {
    pub superframe: u32,
    pub frames_emitted: u64,
    pub overrun: bool,
    pub allocations: Vec<TerminalAllocation>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TerminalAllocation {
    pub tal_id: u16,
    pub rbdc_pktpf: u32,
    pub vbdc_pktpf: u32,
    pub fca_pktpf: u32,
}

/// Drives one superframe per tick: drains queued uplink traffic, derives
/// each terminal's RBDC request from its current queue occupancy, runs the
/// DAMA allocation and return scheduler, then broadcasts the SoF sentinel.
#[allow(clippy::too_many_arguments)]
pub async fn gw_block(
    mut state: GwState,
    counters: Arc<Counters>,
    mut uplink_rx: mpsc::Receiver<Uplink>,
    sof_tx: broadcast::Sender<u32>,
    status: Arc<Mutex<StatusSnapshot>>,
    superframe_duration: Duration,
    max_superframes: Option<u32>,
) {
    let handler = RlePacketHandler;
    let mut tick = interval(superframe_duration);
    let mut sf: u32 = 0;

    loop {
        tick.tick().await;

        while let Ok(uplink) = uplink_rx.try_recv() {
            match state.fifos.get(&uplink.tal_id) {
                Some(fifos) => {
                    if fifos.push(uplink.packet).is_err() {
                        counters.incr(CounterKind::fifo_full);
                    }
                }
                None => counters.incr(CounterKind::unknown_terminal),
            }
        }

        for (tal_id, ctx) in state.terminals.iter_mut() {
            let queued_bytes = state.fifos.get(tal_id).map(|f| f.current_bytes()).unwrap_or(0);
            let kbps = (queued_bytes as f64 * 8.0) / (state.superframe_duration_ms / 1000.0) / 1000.0;
            ctx.set_rbdc_request(kbps);
        }

        state.clock.advance(sf, &counters);

        let conv = UnitConverter::new(state.superframe_duration_ms, &state.table);
        let dama = DamaCtrl::new(state.dama);
        let mut scheduler = ReturnScheduler::new(dama, &handler, superframe_duration);

        let output = scheduler.run_superframe(
            &mut state.categories,
            &mut state.terminals,
            &mut state.fifos,
            &conv,
            &counters,
            MAX_FRAME_BYTES,
        );

        if output.overrun {
            warn!(superframe = sf, "superframe overran its time budget");
        } else {
            debug!(superframe = sf, frames = output.frames.len(), "superframe emitted");
        }

        {
            let mut snap = status.lock().await;
            snap.superframe = sf;
            snap.frames_emitted += output.frames.len() as u64;
            snap.overrun = output.overrun;
            snap.allocations = output
                .allocations
                .iter()
                .map(|a| TerminalAllocation {
                    tal_id: a.tal_id,
                    rbdc_pktpf: a.rbdc_pktpf,
                    vbdc_pktpf: a.vbdc_pktpf,
                    fca_pktpf: a.fca_pktpf,
                })
                .collect();
        }

        // the sentinel for sf: every event of sf has drained, allocation
        // for sf + 1 may begin (§5 ordering guarantee).
        let _ = sof_tx.send(sf);
        sf += 1;

        if let Some(max) = max_superframes {
            if sf >= max {
                info!(superframes = sf, "reached configured superframe count");
                break;
            }
        }
    }
}

/// A synthetic ST: on every SoF, offers a handful of randomly sized packets
/// to the GW. Stands in for the out-of-scope encapsulation/DVB-RCS2 PHY
/// pipeline (§1 Non-goals) with just enough traffic to exercise contention.
pub async fn st_block(
    tal_id: u16,
    uplink_tx: mpsc::Sender<Uplink>,
    mut sof_rx: broadcast::Receiver<u32>,
    seed: u64,
) {
    let mut rng = StdRng::seed_from_u64(seed);
    loop {
        match sof_rx.recv().await {
            Ok(_sf) => {
                let nb_packets = rng.gen_range(0..=3);
                for _ in 0..nb_packets {
                    let len = rng.gen_range(16..=256);
                    let packet = NetPacket {
                        tal_id,
                        qos: 0,
                        payload: vec![0u8; len],
                    };
                    if uplink_tx.send(Uplink { tal_id, packet }).await.is_err() {
                        return;
                    }
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                debug!(tal_id, skipped, "st_block missed sof ticks");
            }
            Err(broadcast::error::RecvError::Closed) => return,
        }
    }
}
