pub mod adapters;
pub mod api;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::ServiceConfig;

pub use api::{create_router, AppState};
pub use core::{
    aggregator::RateAggregator, calculator::ShippingCalculator, catalog::RegionCatalog,
    locator::AgentLocator,
};
pub use utils::error::{OngkirError, Result};
