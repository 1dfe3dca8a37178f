//! C8 — Slotted-Aloha NCC/GW side (§4.6): slot table per superframe,
//! collision detection, replica resolution and ACK scheduling.

use std::collections::HashMap;

use crate::frame::{AckEntry, DvbFrame, FrameHeader, CNI_NOT_AVAILABLE};
use crate::packet::NetPacket;

#[derive(Debug, Clone)]
struct Replica {
    tal_id: u16,
    base_id: u64,
    payload: Vec<u8>,
}

/// Accumulates one superframe's worth of `SlottedAlohaData` frames, then
/// resolves collisions and produces ACKs + decapsulated bursts when the
/// sentinel SoF for the next superframe arrives.
#[derive(Debug, Default)]
pub struct SlottedAlohaNcc {
    carrier_id: u8,
    slots: HashMap<u16, Vec<Replica>>,
}

/// The result of resolving one superframe's Slotted-Aloha traffic.
#[derive(Debug, Default, PartialEq)]
pub struct ResolvedSuperframe {
    pub acks: Vec<DvbFrame>,
    pub packets: Vec<NetPacket>,
    pub collisions: usize,
}

impl SlottedAlohaNcc {
    pub fn new(carrier_id: u8) -> Self {
        SlottedAlohaNcc {
            carrier_id,
            slots: HashMap::new(),
        }
    }

    /// Ingests one received `SlottedAlohaData` frame into the current
    /// superframe's slot table.
    pub fn on_rcv_frame(&mut self, frame: &DvbFrame) {
        if let DvbFrame::SlottedAlohaData { body, payload, .. } = frame {
            self.slots
                .entry(body.slot_id)
                .or_default()
                .push(Replica {
                    tal_id: body.tal_id,
                    base_id: body.base_id,
                    payload: payload.clone(),
                });
        }
    }

    /// Resolves the superframe on sentinel SoF: slots with exactly one
    /// replica are clean; slots with more than one are collided and
    /// contribute no output. A logical packet is `received` if at least one
    /// of its replicas landed on a clean slot; it is emitted and ACKed
    /// exactly once even if it has other clean replicas.
    pub fn resolve_superframe(&mut self, counters: &crate::counters::Counters) -> ResolvedSuperframe {
        let mut collisions = 0;
        let mut received: HashMap<(u16, u64), Vec<u8>> = HashMap::new();

        for (slot_id, replicas) in self.slots.drain() {
            if replicas.len() == 1 {
                let replica = replicas.into_iter().next().expect("len == 1");
                received
                    .entry((replica.tal_id, replica.base_id))
                    .or_insert(replica.payload);
            } else {
                collisions += 1;
                counters.incr(crate::counters::CounterKind::slot_collision);
                tracing::trace!(slot_id, replicas = replicas.len(), "slotted-aloha collision");
            }
        }

        let mut acks = Vec::new();
        let mut packets = Vec::new();
        for ((tal_id, base_id), payload) in received {
            packets.push(NetPacket {
                tal_id,
                qos: 0,
                payload,
            });
            acks.push(AckEntry { tal_id, base_id });
        }

        let ack_frame = DvbFrame::SlottedAlohaAck {
            header: FrameHeader {
                message_type: 9,
                carrier_id: self.carrier_id,
                spot_id: 0,
                payload_length: 0,
                cni_centibels: CNI_NOT_AVAILABLE,
            },
            acks,
        };

        ResolvedSuperframe {
            acks: vec![ack_frame],
            packets,
            collisions,
        }
    }
}
