//! C11 — the superframe clock (§5 Ordering guarantees): a monotonic
//! counter that emits a sentinel SoF once all of a superframe's input has
//! drained, enforcing "all events of superframe S are processed before any
//! event of S+1 begins allocation".

use crate::counters::{CounterKind, Counters};

/// One superframe-boundary event. `sentinel == true` marks the SoF emitted
/// after draining `superframe_number`'s input, the trigger to begin
/// allocation for `superframe_number + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SofEvent {
    pub superframe_number: u32,
    pub sentinel: bool,
}

/// Monotonic superframe counter. Rejects duplicates and backwards jumps;
/// both are logged rather than panicking (§8 property 8, "Idempotent SoF").
#[derive(Debug, Default)]
pub struct SuperframeClock {
    current: Option<u32>,
}

impl SuperframeClock {
    pub fn new() -> Self {
        SuperframeClock { current: None }
    }

    pub fn current(&self) -> Option<u32> {
        self.current
    }

    /// Advances to `sf`. Returns `None` (a no-op) for a duplicate of the
    /// current superframe, and for any `sf` at or below the current one
    /// after the first advance (`BackwardsSof`, counted).
    pub fn advance(&mut self, sf: u32, counters: &Counters) -> Option<SofEvent> {
        match self.current {
            None => {
                self.current = Some(sf);
                Some(SofEvent {
                    superframe_number: sf,
                    sentinel: false,
                })
            }
            Some(cur) if sf == cur => None,
            Some(cur) if sf < cur => {
                counters.incr(CounterKind::backwards_sof);
                None
            }
            Some(cur) => {
                self.current = Some(sf);
                // a gap of more than one superframe is unusual but not an
                // error the core recovers from differently; only strict
                // monotonic order matters for the ordering guarantee.
                let _ = cur;
                Some(SofEvent {
                    superframe_number: sf,
                    sentinel: false,
                })
            }
        }
    }

    /// Emits the sentinel SoF for the superframe just finished draining,
    /// signalling downstream that allocation for `sf + 1` may begin.
    pub fn sentinel_for(&self, sf: u32) -> SofEvent {
        SofEvent {
            superframe_number: sf,
            sentinel: true,
        }
    }
}
