// Domain layer: feed and sku models plus the ports the engine talks to.

pub mod model;
pub mod ports;
