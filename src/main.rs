//! Binary entry point that glues the dispatch core to the terminal board.
//! Startup reads the `DISPATCH_*` environment, opens the log file, loads the
//! chosen fleet and hands control to the Ratatui event loop until the user
//! exits.
use anyhow::{Context, Result};
use tracing::{info, warn};

use dispatch_manager::config::{self, Config, Fleet};
use dispatch_manager::seed::{generate_flights, sample_drones, sample_flights, sample_trains};
use dispatch_manager::{logging, run_app, App, Dispatcher, Entity};

fn main() -> Result<()> {
    let config = Config::from_env().context("failed to read configuration")?;
    let data_dir = config::data_dir().context("failed to resolve data directory")?;
    logging::init(&data_dir, &config.log_filter)?;
    info!(fleet = %config.fleet, capacity = config.capacity, "starting dispatch board");

    match config.fleet {
        Fleet::Trains => launch(&config, sample_trains(), |_| {}),
        Fleet::Drones => launch(&config, sample_drones(), |_| {}),
        Fleet::Flights => launch(&config, sample_flights(), |desk| {
            // every sample flight starts queued at its departure slot
            let codes: Vec<String> = desk
                .registry()
                .traverse_in_order()
                .map(|flight| flight.code.clone())
                .collect();
            for code in codes {
                if let Err(err) = desk.schedule(code.as_str()) {
                    warn!(%code, error = %err, "could not schedule sample flight");
                }
            }
            if config.generate > 0 {
                generate_flights(&mut rand::rng(), config.generate, desk);
            }
        }),
    }
}

/// Register `entities`, let `prepare` adjust the desk, and run the board.
fn launch<E, F>(config: &Config, entities: Vec<E>, prepare: F) -> Result<()>
where
    E: Entity,
    F: FnOnce(&mut Dispatcher<E>),
{
    let order = config.order_or(E::default_order());
    let mut desk = Dispatcher::with_capacity(order, config.capacity)
        .with_context(|| format!("failed to size the dispatch queue for {} entries", config.capacity))?;
    for entity in entities {
        if let Err(duplicate) = desk.register(entity) {
            warn!(kind = E::KIND, key = duplicate.key(), "skipped duplicate sample");
        }
    }
    prepare(&mut desk);
    info!(
        kind = E::KIND,
        %order,
        registered = desk.registry().len(),
        queued = desk.queue().len(),
        "board ready"
    );

    let mut app = App::new(desk);
    run_app(&mut app)
}
