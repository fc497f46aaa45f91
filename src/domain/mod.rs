// Domain layer: models and ports. Concrete service clients live under adapters.

pub mod model;
pub mod ports;
