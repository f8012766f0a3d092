//! Derived-metric guard: in-memory production/area efficiency ratio.
//!
//! The ratio is identical to the final `yield_per_ha` target, so it must
//! never reach the persisted dataset. It lives only on [`GuardedRecord`],
//! which has no serialization impls.

use crate::schema::CanonicalRecord;

/// A canonical record annotated with its efficiency ratio.
#[derive(Debug, Clone, PartialEq)]
pub struct GuardedRecord {
    record: CanonicalRecord,
    efficiency: Option<f64>,
}

impl GuardedRecord {
    /// Annotates a record.
    ///
    /// The ratio is `None` when `area_ha` is not a finite positive number,
    /// in which case the area predicate already rejects the record.
    #[must_use]
    pub fn annotate(record: CanonicalRecord) -> Self {
        let efficiency = efficiency_ratio(record.total_production, record.area_ha);
        Self { record, efficiency }
    }

    /// The underlying canonical record.
    #[must_use]
    pub fn record(&self) -> &CanonicalRecord {
        &self.record
    }

    /// Production per hectare, if defined.
    #[must_use]
    pub fn efficiency(&self) -> Option<f64> {
        self.efficiency
    }

    /// Drops the annotation.
    #[must_use]
    pub fn into_record(self) -> CanonicalRecord {
        self.record
    }
}

/// `total_production / area_ha`, or `None` for a non-positive or
/// non-finite area.
#[must_use]
pub fn efficiency_ratio(total_production: f64, area_ha: f64) -> Option<f64> {
    (area_ha.is_finite() && area_ha > 0.0).then(|| total_production / area_ha)
}
