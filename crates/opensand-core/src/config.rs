//! C15 — the typed configuration shape consumed by the core (§6
//! Configuration, SPEC_FULL.md §11). These types are `serde::Deserialize`
//! so a host (the `opensand-mac` binary) can load them from TOML; the core
//! itself only ever borrows the resulting structs, never parses the file
//! format (keeping "opaque to the core", §6).

use serde::Deserialize;

use crate::backoff::BackoffParams;
use crate::carriers::{AccessType, CarriersGroup};
use crate::dama::DamaParams;

/// Root configuration: one spot's worth of carriers plan, DAMA parameters
/// and Slotted-Aloha parameters, plus the superframe timing shared by both.
#[derive(Debug, Clone, Deserialize)]
pub struct SandConfig {
    pub superframe_duration_ms: f64,
    pub frames_per_superframe: u32,
    pub modcod_table_path: String,
    pub spots: Vec<SpotConfig>,
    pub dama: DamaConfig,
    pub aloha: AlohaConfig,
}

/// One spot's carriers plan and the tag carried by each logical channel.
#[derive(Debug, Clone, Deserialize)]
pub struct SpotConfig {
    pub spot_id: u16,
    pub log_id: u8,
    pub ctrl_id: u8,
    pub data_in_st: u8,
    pub data_in_gw: u8,
    pub data_out_st: u8,
    pub data_out_gw: u8,
    pub categories: Vec<CategoryConfig>,
}

/// One `TerminalCategory`'s carriers, as read from configuration before
/// `TerminalCategory::new` validates it.
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryConfig {
    pub label: String,
    pub groups: Vec<CarriersGroup>,
}

/// Access-class-independent DAMA parameters from configuration.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct DamaConfig {
    pub fca_kbps: f64,
    pub max_rbdc_kbps: f64,
    pub max_vbdc_pkt: u32,
}

impl From<DamaConfig> for DamaParams {
    fn from(cfg: DamaConfig) -> Self {
        DamaParams {
            fca_kbps: cfg.fca_kbps,
        }
    }
}

/// The backoff algorithm selected by configuration, plus its parameters.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case", tag = "algorithm")]
pub enum BackoffConfig {
    Beb {
        cw_min: u32,
        cw_max: u32,
        multiple: u32,
    },
    Eied {
        cw_min: u32,
        cw_max: u32,
        multiple: u32,
    },
}

impl BackoffConfig {
    pub fn params(&self) -> BackoffParams {
        match self {
            BackoffConfig::Beb {
                cw_min,
                cw_max,
                multiple,
            }
            | BackoffConfig::Eied {
                cw_min,
                cw_max,
                multiple,
            } => BackoffParams {
                cw_min: *cw_min,
                cw_max: *cw_max,
                multiple: *multiple,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct AlohaConfig {
    pub nb_replicas: u8,
    pub timeout_sf: u32,
    pub nb_max_retransmissions: u32,
    pub nb_max_packets: usize,
    #[serde(flatten)]
    pub backoff: BackoffConfig,
}
