pub mod aggregator;
pub mod calculator;
pub mod catalog;
pub mod locator;
pub mod ranker;

pub use crate::domain::model::{AggregationResult, GeoPoint, RankedAgent, RateQuote};
pub use crate::domain::ports::{AgentRepository, RateProvider, RegionRepository};
pub use crate::utils::error::Result;
