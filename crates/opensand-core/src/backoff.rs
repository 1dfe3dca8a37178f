//! C6 — pluggable Slotted-Aloha backoff state machine (§4.4): Binary
//! Exponential Backoff and Exponential Increase Exponential Decrease.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A backoff algorithm drives the contention window and, after every
/// update, draws the superframe delay before the next transmission
/// attempt. Implementations own their PRNG for reproducibility (§5
/// "Randomness": each block seeds its own PRNG from configuration).
pub trait BackoffAlgorithm: std::fmt::Debug + Send + Sync {
    /// Contention window shrinks (success): returns the new delay in superframes.
    fn set_ok(&mut self) -> u32;
    /// Contention window grows (failure/collision): returns the new delay.
    fn set_nok(&mut self) -> u32;
    fn cw(&self) -> u32;
}

#[derive(Debug, Clone, Copy)]
pub struct BackoffParams {
    pub cw_min: u32,
    pub cw_max: u32,
    pub multiple: u32,
}

fn draw_delay(rng: &mut StdRng, cw: u32) -> u32 {
    if cw <= 1 {
        0
    } else {
        rng.gen_range(0..cw)
    }
}

/// Binary Exponential Backoff.
#[derive(Debug)]
pub struct Beb {
    cw: u32,
    params: BackoffParams,
    rng: StdRng,
}

impl Beb {
    pub fn new(params: BackoffParams, seed: u64) -> Self {
        Beb {
            cw: params.cw_min.max(1),
            params,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl BackoffAlgorithm for Beb {
    fn set_ok(&mut self) -> u32 {
        self.cw = (self.cw / self.params.multiple.max(1)).max(1);
        draw_delay(&mut self.rng, self.cw)
    }

    fn set_nok(&mut self) -> u32 {
        self.cw = (self.cw.saturating_mul(self.params.multiple.max(1)))
            .min(self.params.cw_max);
        draw_delay(&mut self.rng, self.cw)
    }

    fn cw(&self) -> u32 {
        self.cw
    }
}

/// Exponential Increase Exponential Decrease.
#[derive(Debug)]
pub struct Eied {
    cw: u32,
    params: BackoffParams,
    rng: StdRng,
}

impl Eied {
    pub fn new(params: BackoffParams, seed: u64) -> Self {
        Eied {
            cw: params.cw_min.max(1),
            params,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl BackoffAlgorithm for Eied {
    fn set_ok(&mut self) -> u32 {
        let grown = self.cw as f64 * (self.params.multiple as f64).sqrt();
        self.cw = (grown.round() as u32).min(self.params.cw_max).max(1);
        draw_delay(&mut self.rng, self.cw)
    }

    fn set_nok(&mut self) -> u32 {
        self.cw = (self.cw.saturating_mul(self.params.multiple.max(1)))
            .min(self.params.cw_max);
        draw_delay(&mut self.rng, self.cw)
    }

    fn cw(&self) -> u32 {
        self.cw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> BackoffParams {
        BackoffParams {
            cw_min: 4,
            cw_max: 64,
            multiple: 2,
        }
    }

    #[test]
    fn beb_shrinks_on_success_grows_on_failure() {
        let mut beb = Beb::new(params(), 1);
        assert_eq!(beb.cw(), 4);
        beb.set_nok();
        assert_eq!(beb.cw(), 8);
        beb.set_nok();
        assert_eq!(beb.cw(), 16);
        beb.set_ok();
        assert_eq!(beb.cw(), 8);
        beb.set_ok();
        assert_eq!(beb.cw(), 4);
    }

    #[test]
    fn beb_grows_clamped_to_cw_max() {
        let mut beb = Beb::new(params(), 1);
        for _ in 0..10 {
            beb.set_nok();
        }
        assert_eq!(beb.cw(), 64);
    }

    #[test]
    fn beb_shrink_floors_at_one() {
        let mut beb = Beb::new(
            BackoffParams {
                cw_min: 1,
                cw_max: 64,
                multiple: 2,
            },
            1,
        );
        beb.set_ok();
        assert_eq!(beb.cw(), 1);
    }

    #[test]
    fn eied_grows_slower_on_success_than_beb_on_failure() {
        let mut eied = Eied::new(params(), 1);
        eied.set_nok();
        assert_eq!(eied.cw(), 8);
        // sqrt(2) growth from 8 rounds to 11, well under the BEB doubling to 16.
        eied.set_ok();
        assert_eq!(eied.cw(), 11);
    }

    #[test]
    fn delay_is_within_contention_window() {
        let mut beb = Beb::new(params(), 42);
        for _ in 0..50 {
            let delay = beb.set_nok();
            assert!(delay < beb.cw());
        }
    }

    #[test]
    fn reproducible_with_same_seed() {
        let mut a = Beb::new(params(), 7);
        let mut b = Beb::new(params(), 7);
        for _ in 0..5 {
            assert_eq!(a.set_nok(), b.set_nok());
        }
    }
}
