//! C3 — per-terminal state held by the GW: current MODCOD, pending
//! requests, allocations and the RBDC credit carried between superframes.

/// State for one logged-on terminal. Created on logon, destroyed on logoff
/// (§3 Lifecycle); the GW exclusively owns it and writes it only from the
/// scheduling thread.
#[derive(Debug, Clone)]
pub struct TerminalContext {
    pub tal_id: u16,
    pub category_label: String,
    /// Which `CarriersGroup` within the category this terminal is assigned
    /// to. Stable after logon; reshaping the carrier plan requires a full
    /// logon/logoff cycle (Open Question, resolved in SPEC_FULL.md §9).
    pub carrier_id: u8,
    pub current_input_modcod_id: u8,
    pub current_output_modcod_id: u8,

    /// Continuous Rate Assignment: static, never renegotiated per superframe.
    pub cra_kbps: f64,

    pub rbdc_request_kbps: f64,
    pub max_rbdc_kbps: f64,
    pub max_rbdc_pktpf: u32,

    pub vbdc_request_pkt: u32,
    pub max_vbdc_pkt: u32,

    pub rbdc_alloc_pktpf: u32,
    pub vbdc_alloc_pkt: u32,
    pub fca_alloc_pktpf: u32,

    /// Fractional rate carried over from flooring RBDC allocation, bounded
    /// by one packet's worth of rate at the terminal's input MODCOD.
    pub rbdc_credit_kbps: f64,

    pub scpc: bool,
}

impl TerminalContext {
    pub fn new(tal_id: u16, category_label: impl Into<String>, cra_kbps: f64) -> Self {
        TerminalContext {
            tal_id,
            category_label: category_label.into(),
            carrier_id: 0,
            current_input_modcod_id: 0,
            current_output_modcod_id: 0,
            cra_kbps,
            rbdc_request_kbps: 0.0,
            max_rbdc_kbps: f64::MAX,
            max_rbdc_pktpf: u32::MAX,
            vbdc_request_pkt: 0,
            max_vbdc_pkt: u32::MAX,
            rbdc_alloc_pktpf: 0,
            vbdc_alloc_pkt: 0,
            fca_alloc_pktpf: 0,
            rbdc_credit_kbps: 0.0,
            scpc: false,
        }
    }

    /// Sets the RBDC request, clamped to `max_rbdc_kbps`.
    pub fn set_rbdc_request(&mut self, rate_kbps: f64) {
        self.rbdc_request_kbps = rate_kbps.clamp(0.0, self.max_rbdc_kbps);
    }

    /// Sets the VBDC request, clamped to `max_vbdc_pkt`.
    pub fn set_vbdc_request(&mut self, pkt: u32) {
        self.vbdc_request_pkt = pkt.min(self.max_vbdc_pkt);
    }

    /// Adds to the carried-over RBDC credit, saturating at zero for
    /// negative values (resolves the source's ambiguous `addRbdcCredit`
    /// boundary behavior per the Open Questions).
    pub fn add_rbdc_credit(&mut self, delta_kbps: f64, bound_kbps: f64) {
        self.rbdc_credit_kbps = (self.rbdc_credit_kbps + delta_kbps)
            .max(0.0)
            .min(bound_kbps.max(0.0));
    }

    /// Clears this superframe's allocations, ready for the next round.
    pub fn clear_allocations(&mut self) {
        self.rbdc_alloc_pktpf = 0;
        self.vbdc_alloc_pkt = 0;
        self.fca_alloc_pktpf = 0;
    }

    pub fn total_alloc_pktpf(&self) -> u32 {
        self.rbdc_alloc_pktpf + self.vbdc_alloc_pkt + self.fca_alloc_pktpf
    }
}
