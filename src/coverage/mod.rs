pub mod cobertura;
pub mod paths;
