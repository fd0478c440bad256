// Domain layer: models and ports (interfaces) for the datastore and the rate API.

pub mod model;
pub mod ports;
