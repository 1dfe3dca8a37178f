//! C14 — the external packet-handler contract (§6) re-expressed as a
//! capability trait, plus a single concrete implementation standing in for
//! the out-of-scope GSE/RLE/ROHC encapsulation pipeline (§1 Non-goals).

/// A decapsulated network packet moving through the core, tagged with the
/// terminal it belongs to and its QoS class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetPacket {
    pub tal_id: u16,
    pub qos: u8,
    pub payload: Vec<u8>,
}

/// The downstream packet-handler contract consumed by the return scheduler
/// (C10) and the Slotted-Aloha terminal side (C7). A closed, tagged set at
/// build time — no runtime plugin loading (§9 Design Notes).
pub trait PacketHandler: std::fmt::Debug + Send + Sync {
    fn name(&self) -> &str;

    /// Encodes as many bytes of `pkt` as fit in `max_bytes`. Returns the
    /// encoded bytes and, if the packet didn't fit whole, the remaining
    /// fragment to push back onto the FIFO head.
    fn encode(&self, pkt: &NetPacket, max_bytes: usize) -> (Vec<u8>, Option<NetPacket>);

    fn decode(&self, bytes: &[u8]) -> Vec<NetPacket>;

    fn get_src(&self, payload: &[u8]) -> Option<u16>;

    /// Opaque CNI annotation carried in a header extension, if present.
    fn header_extension_cni(&self, pkt: &NetPacket) -> Option<u32>;
}

/// A minimal stand-in for OpenSAND's Return Link Encapsulation pipeline:
/// frames a packet as `[tal_id: u16 LE][qos: u8][len: u16 LE][payload]` and
/// fragments on the length prefix when it doesn't fit the byte budget.
#[derive(Debug, Default)]
pub struct RlePacketHandler;

const HEADER_LEN: usize = 2 + 1 + 2;

impl PacketHandler for RlePacketHandler {
    fn name(&self) -> &str {
        "rle"
    }

    fn encode(&self, pkt: &NetPacket, max_bytes: usize) -> (Vec<u8>, Option<NetPacket>) {
        if max_bytes <= HEADER_LEN {
            return (Vec::new(), Some(pkt.clone()));
        }
        let budget = max_bytes - HEADER_LEN;
        let (chunk, rest) = if pkt.payload.len() <= budget {
            (pkt.payload.as_slice(), None)
        } else {
            let (head, tail) = pkt.payload.split_at(budget);
            (
                head,
                Some(NetPacket {
                    tal_id: pkt.tal_id,
                    qos: pkt.qos,
                    payload: tail.to_vec(),
                }),
            )
        };
        let mut bytes = Vec::with_capacity(HEADER_LEN + chunk.len());
        bytes.extend_from_slice(&pkt.tal_id.to_le_bytes());
        bytes.push(pkt.qos);
        bytes.extend_from_slice(&(chunk.len() as u16).to_le_bytes());
        bytes.extend_from_slice(chunk);
        (bytes, rest)
    }

    fn decode(&self, bytes: &[u8]) -> Vec<NetPacket> {
        let mut packets = Vec::new();
        let mut offset = 0;
        while offset + HEADER_LEN <= bytes.len() {
            let tal_id = u16::from_le_bytes([bytes[offset], bytes[offset + 1]]);
            let qos = bytes[offset + 2];
            let len = u16::from_le_bytes([bytes[offset + 3], bytes[offset + 4]]) as usize;
            let start = offset + HEADER_LEN;
            if start + len > bytes.len() {
                break;
            }
            packets.push(NetPacket {
                tal_id,
                qos,
                payload: bytes[start..start + len].to_vec(),
            });
            offset = start + len;
        }
        packets
    }

    fn get_src(&self, payload: &[u8]) -> Option<u16> {
        if payload.len() < 2 {
            return None;
        }
        Some(u16::from_le_bytes([payload[0], payload[1]]))
    }

    fn header_extension_cni(&self, _pkt: &NetPacket) -> Option<u32> {
        None
    }
}
