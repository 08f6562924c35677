use crate::core::model::{
    Meter, MeterId, MeterReading, OrganizationId, PropertyId, ScenarioId, Sensor, SensorId,
    SensorReading,
};
use crate::core::units::Country;
use chrono::FixedOffset;
use indexmap::IndexMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("property {0} does not exist")]
    PropertyNotFound(PropertyId),
    #[error("organization {0} does not exist")]
    OrganizationNotFound(OrganizationId),
}

/// Source of meters and their interval readings for one inventory entity.
///
/// Implementations must not leak readings belonging to unrelated properties,
/// and must return readings ordered ascending by `(start_time, end_time)` —
/// Month and Year aggregation rely on a fully materialized, time-ordered
/// reading set.
pub trait MeterStore {
    /// Meters in scope for an export: those owned by the property plus those
    /// attached to any of the given scenarios, minus the excluded ids. A
    /// property that does not exist within the organization is `NotFound`.
    fn meters_for_property(
        &self,
        property_id: PropertyId,
        org_id: OrganizationId,
        excluded_meter_ids: &[MeterId],
        scenario_ids: &[ScenarioId],
    ) -> Result<Vec<Meter>, StoreError>;

    /// Interval readings for one meter, ordered ascending by start then end
    /// time. A meter unknown to the store simply has no readings.
    fn meter_readings(&self, meter_id: MeterId) -> Result<Vec<MeterReading>, StoreError>;
}

/// Source of sensors (reached through the property's data loggers) and their
/// point readings.
pub trait SensorStore {
    fn sensors_for_property(
        &self,
        property_id: PropertyId,
        org_id: OrganizationId,
        excluded_sensor_ids: &[SensorId],
    ) -> Result<Vec<Sensor>, StoreError>;

    /// Point readings for one sensor, ordered ascending by timestamp. With
    /// `only_occupied` set, readings taken while the space was unoccupied are
    /// filtered out before any bucketing.
    fn sensor_readings(
        &self,
        sensor_id: SensorId,
        only_occupied: bool,
    ) -> Result<Vec<SensorReading>, StoreError>;
}

/// Per-organization display configuration.
pub trait OrganizationStore {
    /// Mapping from meter type name to preferred display unit name, possibly
    /// carrying a "Default" fallback row.
    fn display_meter_units(
        &self,
        org_id: OrganizationId,
    ) -> Result<IndexMap<String, String>, StoreError>;

    /// Country the organization reports in.
    fn country(&self, org_id: OrganizationId) -> Result<Country, StoreError>;

    /// The organization's display timezone as a fixed UTC offset.
    fn timezone(&self, org_id: OrganizationId) -> Result<FixedOffset, StoreError>;
}

#[derive(Clone, Debug)]
pub(crate) struct OrganizationRecord {
    pub(crate) display_meter_units: IndexMap<String, String>,
    pub(crate) country: Country,
    pub(crate) timezone: FixedOffset,
}

#[derive(Clone, Debug)]
pub(crate) struct PropertyRecord {
    pub(crate) organization: OrganizationId,
    pub(crate) meter_ids: Vec<MeterId>,
    pub(crate) sensor_ids: Vec<SensorId>,
}

/// In-memory inventory backing all three store traits, populated by
/// [`crate::input::ingest_inventory`].
#[derive(Debug, Default)]
pub struct InMemoryInventory {
    pub(crate) organizations: IndexMap<OrganizationId, OrganizationRecord>,
    pub(crate) properties: IndexMap<PropertyId, PropertyRecord>,
    pub(crate) meters: IndexMap<MeterId, Meter>,
    pub(crate) meter_readings: IndexMap<MeterId, Vec<MeterReading>>,
    pub(crate) sensors: IndexMap<SensorId, Sensor>,
    pub(crate) sensor_readings: IndexMap<SensorId, Vec<SensorReading>>,
}

impl InMemoryInventory {
    fn organization(&self, org_id: OrganizationId) -> Result<&OrganizationRecord, StoreError> {
        self.organizations
            .get(&org_id)
            .ok_or(StoreError::OrganizationNotFound(org_id))
    }

    fn property(
        &self,
        property_id: PropertyId,
        org_id: OrganizationId,
    ) -> Result<&PropertyRecord, StoreError> {
        self.properties
            .get(&property_id)
            .filter(|property| property.organization == org_id)
            .ok_or(StoreError::PropertyNotFound(property_id))
    }
}

impl MeterStore for InMemoryInventory {
    fn meters_for_property(
        &self,
        property_id: PropertyId,
        org_id: OrganizationId,
        excluded_meter_ids: &[MeterId],
        scenario_ids: &[ScenarioId],
    ) -> Result<Vec<Meter>, StoreError> {
        let property = self.property(property_id, org_id)?;

        let in_scope = |meter: &Meter| {
            let owned = property.meter_ids.contains(&meter.id);
            let via_scenario = meter
                .scenario_id
                .is_some_and(|scenario| scenario_ids.contains(&scenario));
            (owned || via_scenario) && !excluded_meter_ids.contains(&meter.id)
        };

        Ok(self
            .meters
            .values()
            .filter(|meter| in_scope(meter))
            .cloned()
            .collect())
    }

    fn meter_readings(&self, meter_id: MeterId) -> Result<Vec<MeterReading>, StoreError> {
        Ok(self.meter_readings.get(&meter_id).cloned().unwrap_or_default())
    }
}

impl SensorStore for InMemoryInventory {
    fn sensors_for_property(
        &self,
        property_id: PropertyId,
        org_id: OrganizationId,
        excluded_sensor_ids: &[SensorId],
    ) -> Result<Vec<Sensor>, StoreError> {
        let property = self.property(property_id, org_id)?;

        Ok(property
            .sensor_ids
            .iter()
            .filter(|id| !excluded_sensor_ids.contains(id))
            .filter_map(|id| self.sensors.get(id))
            .cloned()
            .collect())
    }

    fn sensor_readings(
        &self,
        sensor_id: SensorId,
        only_occupied: bool,
    ) -> Result<Vec<SensorReading>, StoreError> {
        let readings = self.sensor_readings.get(&sensor_id).cloned().unwrap_or_default();
        Ok(if only_occupied {
            readings.into_iter().filter(|r| r.is_occupied).collect()
        } else {
            readings
        })
    }
}

impl OrganizationStore for InMemoryInventory {
    fn display_meter_units(
        &self,
        org_id: OrganizationId,
    ) -> Result<IndexMap<String, String>, StoreError> {
        Ok(self.organization(org_id)?.display_meter_units.clone())
    }

    fn country(&self, org_id: OrganizationId) -> Result<Country, StoreError> {
        Ok(self.organization(org_id)?.country)
    }

    fn timezone(&self, org_id: OrganizationId) -> Result<FixedOffset, StoreError> {
        Ok(self.organization(org_id)?.timezone)
    }
}
