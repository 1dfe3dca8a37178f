//! C7 — Slotted-Aloha terminal side (§4.5): packet admission, slot
//! selection, replica emission and retransmission tracking.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::SeedableRng;

use crate::backoff::BackoffAlgorithm;
use crate::error::{CoreError, CoreResult};
use crate::frame::{DvbFrame, FrameHeader, SlottedAlohaDataHeader, CNI_NOT_AVAILABLE};
use crate::packet::NetPacket;

/// One logical packet awaiting acknowledgement, keyed by `base_id`.
#[derive(Debug, Clone)]
struct PendingPacket {
    base_id: u64,
    packet: NetPacket,
    nb_replicas: u8,
    superframes_waited: u32,
    retransmissions: u32,
}

/// Slotted-Aloha terminal-side state machine. One instance per terminal per
/// Slotted-Aloha carrier.
#[derive(Debug)]
pub struct SlottedAlohaTal {
    tal_id: u16,
    carrier_id: u8,
    slots_per_superframe: u16,
    nb_replicas: u8,
    timeout_sf: u32,
    nb_max_retransmissions: u32,
    nb_max_packets: usize,
    next_base_id: u64,
    incoming: Vec<(u64, NetPacket)>,
    pending: HashMap<u64, PendingPacket>,
    backoff_delay: u32,
    base_seed: u64,
    rng: StdRng,
}

/// Construction parameters, mirroring the Slotted-Aloha section of the
/// configuration format (SPEC_FULL.md §11).
#[derive(Debug, Clone, Copy)]
pub struct AlohaTalParams {
    pub tal_id: u16,
    pub carrier_id: u8,
    pub slots_per_superframe: u16,
    pub nb_replicas: u8,
    pub timeout_sf: u32,
    pub nb_max_retransmissions: u32,
    pub nb_max_packets: usize,
    pub seed: u64,
}

impl SlottedAlohaTal {
    pub fn new(params: AlohaTalParams) -> Self {
        SlottedAlohaTal {
            tal_id: params.tal_id,
            carrier_id: params.carrier_id,
            slots_per_superframe: params.slots_per_superframe,
            nb_replicas: params.nb_replicas.max(1),
            timeout_sf: params.timeout_sf,
            nb_max_retransmissions: params.nb_max_retransmissions,
            nb_max_packets: params.nb_max_packets,
            next_base_id: 0,
            incoming: Vec::new(),
            pending: HashMap::new(),
            backoff_delay: 0,
            base_seed: params.seed,
            rng: StdRng::seed_from_u64(params.seed ^ 0u64),
        }
    }

    /// Admits a newly-encapsulated packet, assigning it a monotone `base_id`
    /// that follows the packet through scheduling, retransmission and ACK.
    pub fn on_encap_packet(&mut self, pkt: NetPacket) -> u64 {
        let base_id = self.next_base_id;
        self.next_base_id += 1;
        self.incoming.push((base_id, pkt));
        base_id
    }

    /// Advances the backoff counter at the start of a superframe and
    /// reseeds slot selection from `(base_seed, sf)`, so a given
    /// superframe's draw is reproducible without replaying earlier ones.
    pub fn on_sof(&mut self, sf: u32) {
        self.rng = StdRng::seed_from_u64(self.base_seed ^ sf as u64);
        if self.backoff_delay > 0 {
            self.backoff_delay -= 1;
        }
        for pending in self.pending.values_mut() {
            pending.superframes_waited += 1;
        }
    }

    /// Picks up to `nb_max_packets` pending/incoming packets, assigns unique
    /// random slots per replica, and produces the `SlottedAlohaData` frames
    /// to transmit this superframe. Also applies retransmission timeouts.
    pub fn schedule(
        &mut self,
        backoff: &mut dyn BackoffAlgorithm,
        counters: &crate::counters::Counters,
    ) -> CoreResult<Vec<DvbFrame>> {
        let mut timed_out = Vec::new();
        for (base_id, pending) in self.pending.iter() {
            if pending.superframes_waited >= self.timeout_sf {
                timed_out.push(*base_id);
            }
        }
        let mut to_retransmit = Vec::new();
        for base_id in timed_out {
            let mut pending = self.pending.remove(&base_id).expect("just found");
            pending.retransmissions += 1;
            if pending.retransmissions > self.nb_max_retransmissions {
                counters.incr(crate::counters::CounterKind::max_retransmissions);
                let _ = CoreError::MaxRetransmissions {
                    tal_id: self.tal_id,
                    base_id,
                }
                .record(counters);
                continue;
            }
            self.backoff_delay = backoff.set_nok();
            pending.superframes_waited = 0;
            to_retransmit.push(pending);
        }

        if self.backoff_delay > 0 {
            for pending in to_retransmit {
                self.pending.insert(pending.base_id, pending);
            }
            return Ok(Vec::new());
        }

        let mut batch: Vec<PendingPacket> = to_retransmit;
        while batch.len() < self.nb_max_packets {
            let Some((base_id, pkt)) = self.incoming.pop() else {
                break;
            };
            batch.push(PendingPacket {
                base_id,
                packet: pkt,
                nb_replicas: self.nb_replicas,
                superframes_waited: 0,
                retransmissions: 0,
            });
        }

        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let total_slots_needed = batch.len() * self.nb_replicas as usize;
        let available = self.slots_per_superframe as usize;
        let drawn = if total_slots_needed <= available {
            sample(&mut self.rng, available, total_slots_needed).into_vec()
        } else {
            counters.incr(crate::counters::CounterKind::out_of_slots);
            sample(&mut self.rng, available, available).into_vec()
        };

        let mut frames = Vec::new();
        let mut cursor = 0;
        for pending in batch {
            let mut scheduled_any = false;
            for replica_id in 0..pending.nb_replicas {
                let Some(slot) = drawn.get(cursor) else {
                    break;
                };
                cursor += 1;
                scheduled_any = true;
                frames.push(DvbFrame::SlottedAlohaData {
                    header: FrameHeader {
                        message_type: 8,
                        carrier_id: self.carrier_id,
                        spot_id: 0,
                        payload_length: 0,
                        cni_centibels: CNI_NOT_AVAILABLE,
                    },
                    body: SlottedAlohaDataHeader {
                        tal_id: self.tal_id,
                        base_id: pending.base_id,
                        replica_id,
                        nb_replicas: pending.nb_replicas,
                        slot_id: *slot as u16,
                    },
                    payload: pending.packet.payload.clone(),
                });
            }
            if scheduled_any {
                self.pending.insert(pending.base_id, pending);
            } else {
                // slot set exhausted: spill back to the incoming queue for
                // the next superframe's schedule() call.
                self.incoming.push((pending.base_id, pending.packet));
            }
        }

        Ok(frames)
    }

    /// Handles a received ACK or implicit NAK-by-timeout is handled in
    /// `schedule`; this only processes explicit ACKs.
    pub fn on_rcv_frame(&mut self, frame: &DvbFrame, backoff: &mut dyn BackoffAlgorithm) {
        if let DvbFrame::SlottedAlohaAck { acks, .. } = frame {
            for ack in acks {
                if ack.tal_id != self.tal_id {
                    continue;
                }
                if self.pending.remove(&ack.base_id).is_some() {
                    self.backoff_delay = backoff.set_ok();
                }
            }
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Clears all pending retransmissions on terminal logoff (§5 Cancellation).
    pub fn clear_for_logoff(&mut self) -> usize {
        let cleared = self.pending.len() + self.incoming.len();
        self.pending.clear();
        self.incoming.clear();
        cleared
    }
}
