pub(crate) mod calendar;
pub mod columns;
pub mod exporter;
pub mod model;
pub(crate) mod overlap;
pub mod store;
pub mod units;
