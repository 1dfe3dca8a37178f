//! Error kinds for the MAC core, per the error handling design: every kind
//! is non-panicking, recovered locally (dropped or deferred), and only
//! fatal configuration errors propagate out of block construction.

use std::error::Error;
use std::fmt;

use crate::counters::{CounterKind, Counters};

/// All error kinds the core can produce. None of these are ever turned into
/// a panic; callers either propagate fatal configuration errors with `?` or
/// log-and-continue for everything else.
#[derive(Debug, Clone, PartialEq)]
pub enum CoreError {
    /// Fatal, init-only: a required configuration field was absent.
    MissingParam(&'static str),
    /// Fatal, init-only: a configuration value failed validation.
    BadValue(String),
    /// Fatal, init-only: a MODCOD id referenced by configuration is not in the table.
    UnknownModcod(u8),
    /// No MODCOD in the table satisfies the requested ESN0.
    NoModcodAvailable(f32),
    /// Logon rejected: a terminal with this `tal_id` is already logged on.
    DuplicateTalId(u16),
    /// Logon rejected: the requested `tal_id` is reserved for the NCC.
    TalIdIsNcc(u16),
    /// Logon rejected: the requested category label does not exist.
    UnknownCategory(String),
    /// Allocation skipped this superframe: terminal can't decode the carrier's MODCOD.
    ModcodMismatch { tal_id: u16, carrier_id: u8 },
    /// Allocation would exceed carrier capacity.
    CarrierOverflow { carrier_id: u8 },
    /// A request referenced a `tal_id` with no `TerminalContext`.
    UnknownTerminal(u16),
    /// `DvbFifo::push` would exceed `max_pkt`; the element was dropped.
    FifoFull,
    /// Transport-layer short read (outside this core's byte-level framing).
    UdpShortRead,
    /// A sequence counter jumped by more than one.
    CounterGap,
    /// Frame failed its checksum.
    CrcMismatch,
    /// More than one packet landed in the same Slotted-Aloha slot.
    SlotCollision { carrier_id: u8, slot_id: u16 },
    /// A Slotted-Aloha packet exhausted `nb_max_retransmissions`.
    MaxRetransmissions { tal_id: u16, base_id: u64 },
    /// No free slot was left to schedule a pending packet.
    OutOfSlots,
    /// The superframe ran out of wall-clock time before `Emit`.
    SuperframeOverrun,
    /// A block-level timer fired without completing in time.
    StackTimeout,
}

impl Error for CoreError {}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::MissingParam(name) => {
                write!(f, "<MissingParam: {name} was not set>")
            }
            CoreError::BadValue(msg) => write!(f, "<BadValue: {msg}>"),
            CoreError::UnknownModcod(id) => {
                write!(f, "<UnknownModcod: no definition for id {id}>")
            }
            CoreError::NoModcodAvailable(esn0) => {
                write!(f, "<NoModcodAvailable: esn0 {esn0} dB too low>")
            }
            CoreError::DuplicateTalId(id) => {
                write!(f, "<DuplicateTalId: {id} already logged on>")
            }
            CoreError::TalIdIsNcc(id) => {
                write!(f, "<TalIdIsNcc: {id} is reserved for the NCC>")
            }
            CoreError::UnknownCategory(label) => {
                write!(f, "<UnknownCategory: {label}>")
            }
            CoreError::ModcodMismatch { tal_id, carrier_id } => write!(
                f,
                "<ModcodMismatch: terminal {tal_id} can't decode carrier {carrier_id}>"
            ),
            CoreError::CarrierOverflow { carrier_id } => {
                write!(f, "<CarrierOverflow: carrier {carrier_id}>")
            }
            CoreError::UnknownTerminal(id) => {
                write!(f, "<UnknownTerminal: {id}>")
            }
            CoreError::FifoFull => write!(f, "<FifoFull>"),
            CoreError::UdpShortRead => write!(f, "<UdpShortRead>"),
            CoreError::CounterGap => write!(f, "<CounterGap>"),
            CoreError::CrcMismatch => write!(f, "<CrcMismatch>"),
            CoreError::SlotCollision { carrier_id, slot_id } => write!(
                f,
                "<SlotCollision: carrier {carrier_id} slot {slot_id}>"
            ),
            CoreError::MaxRetransmissions { tal_id, base_id } => write!(
                f,
                "<MaxRetransmissions: terminal {tal_id} packet {base_id}>"
            ),
            CoreError::OutOfSlots => write!(f, "<OutOfSlots>"),
            CoreError::SuperframeOverrun => write!(f, "<SuperframeOverrun>"),
            CoreError::StackTimeout => write!(f, "<StackTimeout>"),
        }
    }
}

impl CoreError {
    /// The counter this error kind increments, per the error handling design.
    pub fn counter_kind(&self) -> CounterKind {
        match self {
            CoreError::MissingParam(_) => CounterKind::missing_param,
            CoreError::BadValue(_) => CounterKind::bad_value,
            CoreError::UnknownModcod(_) => CounterKind::unknown_modcod,
            CoreError::NoModcodAvailable(_) => CounterKind::unknown_modcod,
            CoreError::DuplicateTalId(_) => CounterKind::duplicate_tal_id,
            CoreError::TalIdIsNcc(_) => CounterKind::tal_id_is_ncc,
            CoreError::UnknownCategory(_) => CounterKind::unknown_category,
            CoreError::ModcodMismatch { .. } => CounterKind::modcod_mismatch,
            CoreError::CarrierOverflow { .. } => CounterKind::carrier_overflow,
            CoreError::UnknownTerminal(_) => CounterKind::unknown_terminal,
            CoreError::FifoFull => CounterKind::fifo_full,
            CoreError::UdpShortRead => CounterKind::udp_short_read,
            CoreError::CounterGap => CounterKind::counter_gap,
            CoreError::CrcMismatch => CounterKind::crc_mismatch,
            CoreError::SlotCollision { .. } => CounterKind::slot_collision,
            CoreError::MaxRetransmissions { .. } => {
                CounterKind::max_retransmissions
            }
            CoreError::OutOfSlots => CounterKind::out_of_slots,
            CoreError::SuperframeOverrun => CounterKind::superframe_overrun,
            CoreError::StackTimeout => CounterKind::stack_timeout,
        }
    }

    /// Record this error against `counters` and return it, for
    /// `foo().map_err(|e| e.record(&counters))?`-style call sites.
    pub fn record(self, counters: &Counters) -> Self {
        counters.incr(self.counter_kind());
        self
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
