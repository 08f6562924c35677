pub mod core;
mod errors;
pub mod input;

pub use crate::core::columns::{ColumnDef, FilterType};
pub use crate::core::exporter::meters::PropertyMeterReadingsExporter;
pub use crate::core::exporter::sensors::PropertySensorReadingsExporter;
pub use crate::core::exporter::{CellValue, ReadingInterval, ReadingRow, ReadingsExport};
pub use crate::core::model::{
    Meter, MeterId, MeterReading, MeterSource, MeterType, OrganizationId, PropertyId, ScenarioId,
    Sensor, SensorId, SensorReading,
};
pub use crate::core::store::{
    InMemoryInventory, MeterStore, OrganizationStore, SensorStore, StoreError,
};
pub use crate::core::units::Country;
pub use crate::errors::ExportError;
pub use crate::input::ingest_inventory;
