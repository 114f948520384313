// Domain layer: item model and ports (interfaces) shared by the store, collectors and report stages.

pub mod model;
pub mod ports;
