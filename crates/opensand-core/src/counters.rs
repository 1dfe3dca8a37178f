//! Named counters for the error kinds and routine events of the MAC core.
//!
//! Modeled as `(name, value, timestamp)` tuples per the design notes: the
//! core only produces counters, it never decides how they are displayed or
//! persisted — that is the host's job (a REST endpoint, a log line, a test
//! assertion).

use std::sync::atomic::{AtomicU64, Ordering};

macro_rules! counters {
    ($( $field:ident => $name:literal ),+ $(,)?) => {
        /// Error-kind and routine-event counters, shared across blocks via `Arc`.
        #[derive(Debug, Default)]
        pub struct Counters {
            $( $field: AtomicU64, )+
        }

        impl Counters {
            $(
                pub fn $field(&self) -> u64 {
                    self.$field.load(Ordering::Relaxed)
                }
            )+

            /// Snapshot every counter as `(name, value)`, in declaration order.
            pub fn snapshot(&self) -> Vec<(&'static str, u64)> {
                vec![
                    $( ($name, self.$field()), )+
                ]
            }

            fn bump(counter: &AtomicU64) -> u64 {
                counter.fetch_add(1, Ordering::Relaxed) + 1
            }
        }

        /// Counter accessor names, matching the error kinds of the spec's
        /// error handling design and the routine events it calls out.
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum CounterKind {
            $( #[allow(non_camel_case_types)] $field, )+
        }

        impl Counters {
            pub fn incr(&self, kind: CounterKind) -> u64 {
                match kind {
                    $( CounterKind::$field => Self::bump(&self.$field), )+
                }
            }
        }
    };
}

counters! {
    missing_param => "missing_param",
    bad_value => "bad_value",
    unknown_modcod => "unknown_modcod",
    duplicate_tal_id => "duplicate_tal_id",
    tal_id_is_ncc => "tal_id_is_ncc",
    unknown_category => "unknown_category",
    modcod_mismatch => "modcod_mismatch",
    carrier_overflow => "carrier_overflow",
    unknown_terminal => "unknown_terminal",
    fifo_full => "fifo_full",
    udp_short_read => "udp_short_read",
    counter_gap => "counter_gap",
    crc_mismatch => "crc_mismatch",
    slot_collision => "slot_collision",
    max_retransmissions => "max_retransmissions",
    out_of_slots => "out_of_slots",
    superframe_overrun => "superframe_overrun",
    stack_timeout => "stack_timeout",
    under_allocated => "under_allocated",
    backwards_sof => "backwards_sof",
    terminal_gone => "terminal_gone",
}
