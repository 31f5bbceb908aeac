pub mod write_gate;

pub use write_gate::{WriteGateLayer, WriteGateService};
