//! C10 — the return scheduler (§4.8): drives one superframe's
//! `Idle -> CollectRequests -> RunDama -> BuildFrames -> Emit` cycle,
//! assembling `DvbRcsFrame`s from FIFO contents according to the DAMA
//! allocation.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::carriers::TerminalCategory;
use crate::counters::{CounterKind, Counters};
use crate::dama::{Allocation, DamaCtrl};
use crate::error::{CoreError, CoreResult};
use crate::fifo::DvbFifo;
use crate::frame::{DvbFrame, FrameHeader, CNI_NOT_AVAILABLE};
use crate::packet::{NetPacket, PacketHandler};
use crate::terminal::TerminalContext;
use crate::units::UnitConverter;

/// A FIFO per QoS class for one terminal, iterated in QoS order (ascending
/// `qos` = highest priority first, matching `DvbFifo::qos`).
#[derive(Debug, Default)]
pub struct TerminalFifos {
    fifos: Vec<DvbFifo>,
}

impl TerminalFifos {
    pub fn new(fifos: Vec<DvbFifo>) -> Self {
        let mut fifos = fifos;
        fifos.sort_by_key(|f| f.qos());
        TerminalFifos { fifos }
    }

    pub fn is_empty(&self) -> bool {
        self.fifos.iter().all(|f| f.is_empty())
    }

    /// Pushes `pkt` onto the fifo matching `pkt.qos`, for a host feeding
    /// encapsulated traffic into a terminal's queues from outside the
    /// scheduling thread.
    pub fn push(&self, pkt: NetPacket) -> CoreResult<()> {
        match self.fifos.iter().find(|f| f.qos() == pkt.qos) {
            Some(fifo) => fifo.push(pkt),
            None => Err(CoreError::UnknownTerminal(pkt.tal_id)),
        }
    }

    pub fn current_pkt(&self) -> usize {
        self.fifos.iter().map(|f| f.current_pkt()).sum()
    }

    pub fn current_bytes(&self) -> usize {
        self.fifos.iter().map(|f| f.current_bytes()).sum()
    }
}

/// `ReturnScheduler`'s state machine phase, exposed for logging/tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    CollectRequests,
    RunDama,
    BuildFrames,
    Emit,
}

/// Assembles one superframe's worth of `DvbRcsFrame`s from terminal FIFOs,
/// driven by a `DamaCtrl` allocation, using a `PacketHandler` to fragment
/// packets to the allocated byte budget.
pub struct ReturnScheduler<'a> {
    dama: DamaCtrl,
    handler: &'a dyn PacketHandler,
    state: SchedulerState,
    superframe_budget: Duration,
}

/// Output of one superframe's `BuildFrames` + `Emit` phases.
#[derive(Debug, Default)]
pub struct SuperframeOutput {
    pub frames: Vec<DvbFrame>,
    pub allocations: Vec<Allocation>,
    pub overrun: bool,
}

impl<'a> ReturnScheduler<'a> {
    pub fn new(dama: DamaCtrl, handler: &'a dyn PacketHandler, superframe_budget: Duration) -> Self {
        ReturnScheduler {
            dama,
            handler,
            state: SchedulerState::Idle,
            superframe_budget,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Runs the full superframe cycle. `fifos` is keyed by `tal_id`; any
    /// terminal absent from it is treated as having no queued traffic.
    #[allow(clippy::too_many_arguments)]
    pub fn run_superframe(
        &mut self,
        categories: &mut [TerminalCategory],
        terminals: &mut HashMap<u16, TerminalContext>,
        fifos: &mut HashMap<u16, TerminalFifos>,
        conv: &UnitConverter<'_>,
        counters: &Counters,
        max_frame_bytes: usize,
    ) -> SuperframeOutput {
        let started = Instant::now();

        self.state = SchedulerState::CollectRequests;
        for ctx in terminals.values_mut() {
            ctx.clear_allocations();
        }

        self.state = SchedulerState::RunDama;
        let allocations = match self
            .dama
            .run_superframe(categories, terminals, conv, counters)
        {
            Ok(allocations) => allocations,
            Err(e) => {
                counters.incr(e.counter_kind());
                return SuperframeOutput {
                    frames: Vec::new(),
                    allocations: Vec::new(),
                    overrun: false,
                };
            }
        };

        if started.elapsed() > self.superframe_budget {
            counters.incr(CounterKind::superframe_overrun);
            self.state = SchedulerState::Idle;
            return SuperframeOutput {
                frames: Vec::new(),
                allocations,
                overrun: true,
            };
        }

        self.state = SchedulerState::BuildFrames;
        let mut frames = Vec::new();
        for alloc in &allocations {
            let Some(terminal_fifos) = fifos.get(&alloc.tal_id) else {
                continue;
            };
            let mut budget_pkt = alloc.rbdc_pktpf + alloc.vbdc_pktpf + alloc.fca_pktpf;
            let mut payload = Vec::new();
            'fifos: for fifo in &terminal_fifos.fifos {
                while budget_pkt > 0 {
                    let Some(pkt) = fifo.pop() else {
                        break;
                    };
                    let remaining_bytes = max_frame_bytes.saturating_sub(payload.len());
                    let (bytes, residue) = self.handler.encode(&pkt, remaining_bytes);
                    payload.extend(bytes);
                    if let Some(residue) = residue {
                        fifo.push_front(residue);
                        budget_pkt = budget_pkt.saturating_sub(1);
                        break 'fifos;
                    }
                    budget_pkt -= 1;
                }
                if budget_pkt == 0 {
                    break;
                }
            }
            if budget_pkt > 0 {
                // allocated slots went unused because the FIFO ran dry
                // mid-allocation; logged, never reassigned (§4.8 edge case).
                counters.incr(CounterKind::under_allocated);
            }
            if !payload.is_empty() {
                frames.push(DvbFrame::DvbRcsFrame {
                    header: FrameHeader {
                        message_type: 0,
                        carrier_id: alloc.carrier_id,
                        spot_id: 0,
                        payload_length: payload.len() as u16,
                        cni_centibels: CNI_NOT_AVAILABLE,
                    },
                    payload,
                });
            }
        }

        self.state = SchedulerState::Emit;
        if started.elapsed() > self.superframe_budget {
            counters.incr(CounterKind::superframe_overrun);
            self.state = SchedulerState::Idle;
            return SuperframeOutput {
                frames: Vec::new(),
                allocations,
                overrun: true,
            };
        }

        self.state = SchedulerState::Idle;
        SuperframeOutput {
            frames,
            allocations,
            overrun: false,
        }
    }
}
