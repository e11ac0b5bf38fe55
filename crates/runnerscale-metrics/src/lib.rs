//! runnerscale-metrics — observability for the runner fleet.
//!
//! Republishes what the reconciler reads each cycle as gauges, and renders
//! them in the Prometheus text exposition format.
//!
//! # Architecture
//!
//! ```text
//! FleetGauges
//!   ├── publish()  ← called once per successful reconciliation cycle
//!   └── snapshot() → GaugeSnapshot
//!
//! Prometheus exposition
//!   └── render_prometheus() → text/plain for /metrics endpoint
//! ```

pub mod gauges;
pub mod prometheus;

pub use gauges::{FleetGauges, GaugeSnapshot};
pub use prometheus::render_prometheus;
