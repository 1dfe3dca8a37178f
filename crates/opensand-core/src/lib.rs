//! `opensand-core`: the return-link MAC resource and framing core of an
//! OpenSAND-style DVB-S2/RCS2 emulation.
//!
//! This crate is transport- and runtime-agnostic: it has no socket, no
//! `tokio`, no file I/O beyond parsing an in-memory MODCOD table. Everything
//! that touches the network, a clock, or a config file lives in the
//! `opensand-mac` binary crate, which drives these types from tokio tasks.
//!
//! Module numbering follows the design's component list (C1-C15); see each
//! module's doc comment for its slice of the MAC.

pub mod aloha_ncc;
pub mod aloha_tal;
pub mod attenuation;
pub mod backoff;
pub mod carriers;
pub mod clock;
pub mod config;
pub mod counters;
pub mod dama;
pub mod error;
pub mod fifo;
pub mod fmt;
pub mod frame;
pub mod modcod;
pub mod packet;
pub mod scheduler;
pub mod terminal;
pub mod units;

/// Re-exports of the types most callers need, matching the teacher's habit
/// of a flat `prelude` for the handful of names a host binary touches most.
pub mod prelude {
    pub use crate::aloha_ncc::{ResolvedSuperframe, SlottedAlohaNcc};
    pub use crate::aloha_tal::{AlohaTalParams, SlottedAlohaTal};
    pub use crate::attenuation::{AttenuationModel, ConstantAttenuation, FileAttenuation, RandomAttenuation};
    pub use crate::backoff::{Beb, BackoffAlgorithm, BackoffParams, Eied};
    pub use crate::carriers::{AccessType, CarriersGroup, TerminalCategory};
    pub use crate::clock::{SofEvent, SuperframeClock};
    pub use crate::config::{AlohaConfig, BackoffConfig, CategoryConfig, DamaConfig, SandConfig, SpotConfig};
    pub use crate::counters::{CounterKind, Counters};
    pub use crate::dama::{Allocation, DamaCtrl, DamaParams};
    pub use crate::error::{CoreError, CoreResult};
    pub use crate::fifo::{DvbFifo, FifoStats};
    pub use crate::fmt::FmtSimulation;
    pub use crate::frame::{DvbFrame, FrameHeader};
    pub use crate::modcod::{ModcodDef, ModcodTable};
    pub use crate::packet::{NetPacket, PacketHandler, RlePacketHandler};
    pub use crate::scheduler::{ReturnScheduler, SchedulerState, SuperframeOutput, TerminalFifos};
    pub use crate::terminal::TerminalContext;
    pub use crate::units::{PktConversion, UnitConverter};
}
