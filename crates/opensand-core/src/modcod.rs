//! C2 — static MODCOD table: id -> (spectral efficiency, burst length,
//! required ESN0), loaded from a text table at init.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::{CoreError, CoreResult};

/// An immutable MODCOD definition. Spectral efficiency is kept as a
/// numerator/denominator pair rather than a float so that `UnitConverter`
/// rounding stays exact for the common halves/quarters seen in real MODCOD
/// tables (e.g. QPSK 1/2 = 1 bit/symbol, 8PSK 3/4 = 2.25 bits/symbol).
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ModcodDef {
    pub id: u8,
    pub efficiency_num: u32,
    pub efficiency_den: u32,
    pub required_esn0_db: f32,
    /// Burst length in symbols, relevant to RCS2 framing.
    pub burst_length_symbols: u32,
}

impl ModcodDef {
    /// Spectral efficiency in bits per symbol.
    pub fn spectral_efficiency(&self) -> f64 {
        self.efficiency_num as f64 / self.efficiency_den as f64
    }
}

/// Table of MODCOD definitions, keyed by id. Invariant: strictly increasing
/// spectral efficiency by id.
#[derive(Debug, Clone, Default)]
pub struct ModcodTable {
    defs: BTreeMap<u8, ModcodDef>,
}

impl ModcodTable {
    pub fn new() -> Self {
        ModcodTable {
            defs: BTreeMap::new(),
        }
    }

    /// Build a table from a list of definitions, validating the
    /// strictly-increasing-efficiency invariant.
    pub fn from_defs(defs: Vec<ModcodDef>) -> CoreResult<Self> {
        let mut table = BTreeMap::new();
        let mut last_efficiency = -1.0_f64;
        for def in defs {
            if def.spectral_efficiency() <= last_efficiency {
                return Err(CoreError::BadValue(format!(
                    "modcod {} does not strictly increase spectral efficiency",
                    def.id
                )));
            }
            last_efficiency = def.spectral_efficiency();
            table.insert(def.id, def);
        }
        Ok(ModcodTable { defs: table })
    }

    /// Parse a whitespace-separated text table: `id num den esn0 burst_len`,
    /// one row per line, blank lines and `#`-prefixed lines ignored.
    pub fn parse(text: &str) -> CoreResult<Self> {
        let mut defs = Vec::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() != 5 {
                return Err(CoreError::BadValue(format!(
                    "malformed modcod table row: {line:?}"
                )));
            }
            let parse_field = |s: &str| {
                s.parse().map_err(|_| {
                    CoreError::BadValue(format!("malformed field {s:?}"))
                })
            };
            defs.push(ModcodDef {
                id: parse_field(fields[0])?,
                efficiency_num: parse_field(fields[1])?,
                efficiency_den: parse_field(fields[2])?,
                required_esn0_db: parse_field(fields[3])?,
                burst_length_symbols: parse_field(fields[4])?,
            });
        }
        Self::from_defs(defs)
    }

    /// Reads and parses a MODCOD table from a file on disk, per the
    /// `modcod_table_path` configuration field.
    pub fn load_from_path(path: impl AsRef<std::path::Path>) -> CoreResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            CoreError::BadValue(format!("reading modcod table {path:?}: {e}"))
        })?;
        Self::parse(&text)
    }

    pub fn def(&self, id: u8) -> CoreResult<&ModcodDef> {
        self.defs.get(&id).ok_or(CoreError::UnknownModcod(id))
    }

    /// Highest id whose `required_esn0_db <= esn0_db`.
    pub fn best_id_for(&self, esn0_db: f32) -> CoreResult<u8> {
        self.defs
            .values()
            .rev()
            .find(|def| def.required_esn0_db <= esn0_db)
            .map(|def| def.id)
            .ok_or(CoreError::NoModcodAvailable(esn0_db))
    }

    pub fn ids(&self) -> impl Iterator<Item = u8> + '_ {
        self.defs.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}
