// Domain layer: table model and ports. Adapters live under `config`, logic under `core`.

pub mod model;
pub mod ports;
