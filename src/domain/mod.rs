// Domain layer: record shapes exchanged with the admin UI and the backend, plus the ports
// both adapters are written against.

pub mod model;
pub mod ports;
