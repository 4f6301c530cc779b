//! Core library surface for the dispatch manager.
//!
//! A [`Registry`] owns entities in key order, a [`DispatchQueue`] schedules
//! work against them by handle, and a [`Dispatcher`] ties the two together so
//! nothing still waiting in the queue can be deleted. The terminal board in
//! [`ui`] and the binary are thin layers over these pieces.
pub mod config;
pub mod dispatch;
pub mod dispatcher;
pub mod entity;
pub mod error;
pub mod logging;
pub mod models;
pub mod registry;
pub mod seed;
pub mod ui;

pub use dispatch::{DispatchQueue, Entry, SortedDrain, DEFAULT_CAPACITY};
pub use dispatcher::{Dispatcher, Plan, Scheduled};
pub use entity::{Entity, EntityId, Order, Priority};
pub use error::{ConfigError, DeleteError, DuplicateKey, QueueError, ScheduleError, UpdateError};
pub use registry::Registry;

/// The three fleets the board ships with.
pub use models::{DeliveryKey, Drone, Flight, RouteKey, Slot, Train};

/// The interactive application entry point and state container.
pub use ui::{run_app, App};
