//! # gee-simulator
//!
//! Pulse-timing and hyperbolic-positioning engine for a GEE/LORAN-style chain:
//! one master and two slave transmitters, one receiver measuring arrival-time
//! differences.
//!
//! Data flow:
//!   layout (stations + receiver) → timing (emission / arrival schedule)
//!   → observations (ranges, TDOA) + locus (hyperbolic lines of position)
//!   → driver snapshots → presenter (animated feed / static report)
//!
//! Every run is built once by `driver::Simulation::build` from an explicit setup and
//! an injected random source; nothing in the engine holds global state.

pub mod config;
pub mod driver;
pub mod error;
pub mod layout;
pub mod locus;
pub mod observations;
pub mod presenter;
pub mod scenarios;
pub mod timing;
pub mod udp_tx;

pub use driver::{Simulation, SimulationSetup};
pub use error::{GeeError, Result};
pub use locus::{ClosedForm, FocalPair, GridContour, LocusStrategy};
pub use timing::PropagationConstants;
