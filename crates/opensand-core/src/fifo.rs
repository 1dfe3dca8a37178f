//! C5 — thread-safe bounded queue of packets with per-period statistics.
//!
//! The only mutex surviving the message-passing redesign (§5, §9
//! "Shared-mutable per-spot state"): everything a FIFO does under lock is a
//! plain `VecDeque` push/pop, never an `.await` point, so a synchronous
//! `std::sync::Mutex` is the right tool, matching the teacher's choice of a
//! blocking lock anywhere the critical section never suspends.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::error::{CoreError, CoreResult};
use crate::packet::NetPacket;

/// A snapshot of one period's FIFO activity, also resetting the counters it
/// reads (`DvbFifo::get_stats_context`, §4.3).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FifoStats {
    pub in_pkt: u64,
    pub out_pkt: u64,
    pub drop_pkt: u64,
    pub in_bytes: u64,
    pub out_bytes: u64,
}

#[derive(Debug, Default)]
struct Inner {
    queue: VecDeque<NetPacket>,
    current_bytes: usize,
    max_pkt: usize,
    period: FifoStats,
}

/// A bounded, mutex-protected packet queue, keyed by QoS priority at the
/// call site (one `DvbFifo` per QoS class).
#[derive(Debug)]
pub struct DvbFifo {
    qos: u8,
    inner: Mutex<Inner>,
}

impl DvbFifo {
    pub fn new(qos: u8, max_pkt: usize) -> Self {
        DvbFifo {
            qos,
            inner: Mutex::new(Inner {
                max_pkt,
                ..Default::default()
            }),
        }
    }

    pub fn qos(&self) -> u8 {
        self.qos
    }

    /// Fails with `FifoFull` iff the queue is already at `max_pkt`; the
    /// drop counter is incremented on failure, never the in-counter.
    pub fn push(&self, pkt: NetPacket) -> CoreResult<()> {
        let mut inner = self.inner.lock().expect("fifo mutex poisoned");
        if inner.queue.len() >= inner.max_pkt {
            inner.period.drop_pkt += 1;
            return Err(CoreError::FifoFull);
        }
        inner.current_bytes += pkt.payload.len();
        inner.period.in_pkt += 1;
        inner.period.in_bytes += pkt.payload.len() as u64;
        inner.queue.push_back(pkt);
        Ok(())
    }

    /// Reinserts a fragment at the head; does not count as new input.
    pub fn push_front(&self, pkt: NetPacket) {
        let mut inner = self.inner.lock().expect("fifo mutex poisoned");
        inner.current_bytes += pkt.payload.len();
        inner.queue.push_front(pkt);
    }

    pub fn pop(&self) -> Option<NetPacket> {
        let mut inner = self.inner.lock().expect("fifo mutex poisoned");
        let pkt = inner.queue.pop_front();
        if let Some(pkt) = &pkt {
            inner.current_bytes -= pkt.payload.len();
            inner.period.out_pkt += 1;
            inner.period.out_bytes += pkt.payload.len() as u64;
        }
        pkt
    }

    pub fn current_pkt(&self) -> usize {
        self.inner.lock().expect("fifo mutex poisoned").queue.len()
    }

    pub fn current_bytes(&self) -> usize {
        self.inner.lock().expect("fifo mutex poisoned").current_bytes
    }

    pub fn max_pkt(&self) -> usize {
        self.inner.lock().expect("fifo mutex poisoned").max_pkt
    }

    pub fn is_empty(&self) -> bool {
        self.current_pkt() == 0
    }

    /// Snapshot the period counters and atomically reset them to zero.
    pub fn get_stats_context(&self) -> FifoStats {
        let mut inner = self.inner.lock().expect("fifo mutex poisoned");
        std::mem::take(&mut inner.period)
    }

    /// Drain the FIFO entirely, for terminal logoff (`TerminalGone`, §5
    /// Cancellation). Returns the number of packets dropped.
    pub fn clear_for_terminal_gone(&self) -> usize {
        let mut inner = self.inner.lock().expect("fifo mutex poisoned");
        let dropped = inner.queue.len();
        inner.queue.clear();
        inner.current_bytes = 0;
        dropped
    }
}
