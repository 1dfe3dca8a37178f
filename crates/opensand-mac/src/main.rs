#![doc = include_str!("../readme.md")]

mod blocks;
mod cli;
mod web;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use opensand_core::prelude::*;
use tokio::sync::{broadcast, mpsc, Mutex};
use tracing::info;

use blocks::{GwState, StatusSnapshot, Uplink};

fn resolve_relative(config_path: &Path, target: &str) -> std::path::PathBuf {
    let target = Path::new(target);
    if target.is_absolute() {
        return target.to_path_buf();
    }
    config_path
        .parent()
        .map(|dir| dir.join(target))
        .unwrap_or_else(|| target.to_path_buf())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let options = cli::Options::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(if options.verbose { "debug" } else { "info" })
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config_text = std::fs::read_to_string(&options.config)?;
    let config: SandConfig = toml::from_str(&config_text)?;
    let modcod_path = resolve_relative(&options.config, &config.modcod_table_path);
    let table = ModcodTable::load_from_path(&modcod_path)?;

    let spot = config
        .spots
        .first()
        .ok_or("configuration has no spots")?
        .clone();

    let mut categories = Vec::new();
    let mut terminals = HashMap::new();
    let mut fifos = HashMap::new();

    // Synthetic STs are all parked in the spot's first category; the
    // remaining categories are still built (and handed to the DAMA
    // controller) but carry no terminals in this demo.
    for (idx, cat_cfg) in spot.categories.iter().enumerate() {
        let mut category = TerminalCategory::new(cat_cfg.label.clone(), cat_cfg.groups.clone())?;

        if idx == 0 {
            let default_carrier = cat_cfg
                .groups
                .first()
                .ok_or_else(|| format!("category {} has no carriers groups", cat_cfg.label))?;
            let modcod_id = default_carrier.carrier_modcod_id()?;

            for tal_id in 1..=options.terminals {
                category.add_terminal(tal_id);

                let mut ctx = TerminalContext::new(tal_id, cat_cfg.label.clone(), 0.0);
                ctx.carrier_id = default_carrier.carriers_id;
                ctx.current_input_modcod_id = modcod_id;
                ctx.current_output_modcod_id = modcod_id;
                ctx.max_rbdc_kbps = config.dama.max_rbdc_kbps;
                ctx.max_vbdc_pkt = config.dama.max_vbdc_pkt;
                terminals.insert(tal_id, ctx);

                fifos.insert(tal_id, TerminalFifos::new(vec![DvbFifo::new(0, 64)]));
            }
        }
        categories.push(category);
    }

    let counters = Arc::new(Counters::default());
    let status = Arc::new(Mutex::new(StatusSnapshot::default()));

    let (uplink_tx, uplink_rx) = mpsc::channel::<Uplink>(100);
    let (sof_tx, _) = broadcast::channel::<u32>(16);

    for n in 1..=options.terminals {
        let rx = sof_tx.subscribe();
        let tx = uplink_tx.clone();
        tokio::spawn(blocks::st_block(n, tx, rx, n as u64));
    }
    drop(uplink_tx);

    let superframe_duration =
        std::time::Duration::from_secs_f64(config.superframe_duration_ms / 1000.0);

    let gw_state = GwState {
        table,
        superframe_duration_ms: config.superframe_duration_ms,
        categories,
        terminals,
        fifos,
        clock: SuperframeClock::new(),
        dama: config.dama.into(),
    };

    let mut gw_handle = tokio::spawn(blocks::gw_block(
        gw_state,
        counters.clone(),
        uplink_rx,
        sof_tx,
        status.clone(),
        superframe_duration,
        options.superframes,
    ));

    if let Some(port) = options.serve_port {
        let counters_for_web = counters.clone();
        let status_for_web = status.clone();
        tokio::spawn(async move {
            use warp::Filter;

            let counters_route = warp::path("counters")
                .and(warp::any().map(move || counters_for_web.clone()))
                .and_then(|c: Arc<Counters>| async move { web::counters(&c).await });

            let status_route = warp::path("status")
                .and(warp::any().map(move || status_for_web.clone()))
                .and_then(|s: Arc<Mutex<StatusSnapshot>>| async move { web::status(&s).await });

            let routes = warp::get()
                .and(counters_route.or(status_route))
                .recover(web::handle_rejection);

            info!(port, "serving status endpoint");
            warp::serve(routes).run(([0, 0, 0, 0], port)).await;
        });
    }

    tokio::select! {
        res = &mut gw_handle => {
            res?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("ctrl-c received, shutting down");
            gw_handle.abort();
        }
    }

    Ok(())
}
