//! Physical validity filter.
//!
//! Each record is checked against an explicit list of named predicates.
//! Every predicate is evaluated independently and every failure is
//! recorded; a record is kept iff no predicate fails. The outcome is
//! therefore independent of predicate order, and the dropped-row count is
//! the size of the union of the per-reason rejection sets.

mod guard;

pub use guard::{efficiency_ratio, GuardedRecord};

use crate::error::{CosechaError, Result};
use crate::schema::CanonicalRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info};

/// Why a record was excluded from the clean dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RejectionReason {
    /// pH not a finite value above the floor
    #[serde(rename = "InvalidPH")]
    InvalidPh,
    /// Area not a finite value above the floor
    InvalidArea,
    /// Maximum temperature at or below the cold sentinel floor
    TemperatureOutlier,
    /// Production per hectare at or above the ceiling (copy-paste artifact)
    EfficiencyOutlier,
    /// An unconstrained numeric field is NaN or infinite
    NonFiniteValue,
    /// Empty district name; the record cannot be grouped
    MissingDistrict,
}

impl RejectionReason {
    /// Every predicate, in reporting order.
    pub const ALL: [Self; 6] = [
        Self::InvalidPh,
        Self::InvalidArea,
        Self::TemperatureOutlier,
        Self::EfficiencyOutlier,
        Self::NonFiniteValue,
        Self::MissingDistrict,
    ];

    /// Report label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidPh => "InvalidPH",
            Self::InvalidArea => "InvalidArea",
            Self::TemperatureOutlier => "TemperatureOutlier",
            Self::EfficiencyOutlier => "EfficiencyOutlier",
            Self::NonFiniteValue => "NonFiniteValue",
            Self::MissingDistrict => "MissingDistrict",
        }
    }

    /// Evaluates this predicate; `true` means the record passes.
    #[must_use]
    pub fn passes(self, guarded: &GuardedRecord, limits: &ValidityLimits) -> bool {
        let r = guarded.record();
        match self {
            Self::InvalidPh => r.ph.is_finite() && r.ph > limits.ph_floor,
            Self::InvalidArea => r.area_ha.is_finite() && r.area_ha > limits.area_floor,
            Self::TemperatureOutlier => {
                r.max_temp.is_finite() && r.max_temp > limits.max_temp_floor
            }
            // An undefined ratio means the area predicate already failed.
            Self::EfficiencyOutlier => guarded
                .efficiency()
                .map_or(true, |e| e.is_finite() && e < limits.efficiency_ceiling),
            Self::NonFiniteValue => unconstrained_values(r).all(f64::is_finite),
            Self::MissingDistrict => !r.district.trim().is_empty(),
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn unconstrained_values(r: &CanonicalRecord) -> impl Iterator<Item = f64> + '_ {
    [r.avg_temp, r.min_temp]
        .into_iter()
        .chain([r.avg_precipitation, r.wind_speed, r.clay, r.sand, r.silt].into_iter().flatten())
}

/// Domain bounds for the physical predicates.
///
/// All bounds are exclusive: a record passes with `ph > ph_floor`,
/// `area_ha > area_floor`, `max_temp > max_temp_floor` and
/// `total_production / area_ha < efficiency_ceiling`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidityLimits {
    /// Lower bound on soil pH
    pub ph_floor: f64,
    /// Lower bound on cultivated area
    pub area_floor: f64,
    /// Cold-outlier sentinel floor for maximum temperature
    pub max_temp_floor: f64,
    /// Upper bound on production per hectare
    pub efficiency_ceiling: f64,
}

impl Default for ValidityLimits {
    fn default() -> Self {
        Self {
            ph_floor: 0.0,
            area_floor: 0.0,
            max_temp_floor: -50.0,
            efficiency_ceiling: 10.0,
        }
    }
}

impl ValidityLimits {
    /// Creates validated limits.
    ///
    /// # Errors
    ///
    /// Returns an error if any bound is non-finite, the area floor is
    /// negative, or the efficiency ceiling is not positive.
    pub fn new(
        ph_floor: f64,
        area_floor: f64,
        max_temp_floor: f64,
        efficiency_ceiling: f64,
    ) -> Result<Self> {
        let limits = Self {
            ph_floor,
            area_floor,
            max_temp_floor,
            efficiency_ceiling,
        };
        limits.validate()?;
        Ok(limits)
    }

    /// Checks the bounds.
    ///
    /// # Errors
    ///
    /// See [`ValidityLimits::new`].
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("ph_floor", self.ph_floor),
            ("area_floor", self.area_floor),
            ("max_temp_floor", self.max_temp_floor),
            ("efficiency_ceiling", self.efficiency_ceiling),
        ] {
            if !value.is_finite() {
                return Err(CosechaError::invalid_param(name, value, "a finite number"));
            }
        }
        if self.area_floor < 0.0 {
            return Err(CosechaError::invalid_param("area_floor", self.area_floor, ">= 0"));
        }
        if self.efficiency_ceiling <= 0.0 {
            return Err(CosechaError::invalid_param(
                "efficiency_ceiling",
                self.efficiency_ceiling,
                "> 0",
            ));
        }
        Ok(())
    }
}

/// A record excluded from the dataset with every predicate it failed.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedRecord {
    /// The offending record
    pub record: CanonicalRecord,
    /// Failed predicates, in [`RejectionReason::ALL`] order; never empty
    pub reasons: Vec<RejectionReason>,
}

/// Partition of records into kept and rejected.
#[derive(Debug, Clone, Default)]
pub struct ValidationOutcome {
    /// Records passing every predicate, with their guard annotation
    pub kept: Vec<GuardedRecord>,
    /// Records failing at least one predicate
    pub rejected: Vec<RejectedRecord>,
}

impl ValidationOutcome {
    /// Number of records inspected.
    #[must_use]
    pub fn total(&self) -> usize {
        self.kept.len() + self.rejected.len()
    }

    /// Count of records failing each predicate.
    ///
    /// A record failing several predicates counts once under each, so the
    /// sum may exceed [`ValidationOutcome::rejected`]'s length.
    #[must_use]
    pub fn breakdown(&self) -> BTreeMap<RejectionReason, usize> {
        let mut counts = BTreeMap::new();
        for rejected in &self.rejected {
            for reason in &rejected.reasons {
                *counts.entry(*reason).or_insert(0) += 1;
            }
        }
        counts
    }
}

/// Applies the named predicates to canonical records.
///
/// # Examples
///
/// ```
/// use cosecha::validation::{PhysicalValidityFilter, RejectionReason};
/// use cosecha::schema::CanonicalRecord;
///
/// let record = CanonicalRecord {
///     row: 0,
///     state: None,
///     district: "Dala".into(),
///     avg_temp: 25.0,
///     min_temp: 20.0,
///     max_temp: -273.0,
///     avg_precipitation: None,
///     wind_speed: None,
///     ph: 6.5,
///     clay: None,
///     sand: None,
///     silt: None,
///     total_production: 100.0,
///     area_ha: 50.0,
/// };
///
/// let outcome = PhysicalValidityFilter::default().validate(vec![record]);
/// assert!(outcome.kept.is_empty());
/// assert_eq!(outcome.rejected[0].reasons, vec![RejectionReason::TemperatureOutlier]);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct PhysicalValidityFilter {
    limits: ValidityLimits,
}

impl PhysicalValidityFilter {
    /// Creates a filter with the given limits.
    #[must_use]
    pub fn new(limits: ValidityLimits) -> Self {
        Self { limits }
    }

    /// The limits in use.
    #[must_use]
    pub fn limits(&self) -> &ValidityLimits {
        &self.limits
    }

    /// Every predicate the record fails, in [`RejectionReason::ALL`] order.
    #[must_use]
    pub fn violations(&self, guarded: &GuardedRecord) -> Vec<RejectionReason> {
        RejectionReason::ALL
            .into_iter()
            .filter(|reason| !reason.passes(guarded, &self.limits))
            .collect()
    }

    /// Partitions records into kept and rejected.
    #[must_use]
    pub fn validate(&self, records: Vec<CanonicalRecord>) -> ValidationOutcome {
        let mut outcome = ValidationOutcome::default();
        for record in records {
            let guarded = GuardedRecord::annotate(record);
            let reasons = self.violations(&guarded);
            if reasons.is_empty() {
                outcome.kept.push(guarded);
            } else {
                debug!(
                    row = guarded.record().row,
                    district = %guarded.record().district,
                    reasons = ?reasons,
                    "rejected record"
                );
                outcome.rejected.push(RejectedRecord {
                    record: guarded.into_record(),
                    reasons,
                });
            }
        }
        info!(
            kept = outcome.kept.len(),
            rejected = outcome.rejected.len(),
            "physical validity filter finished"
        );
        outcome
    }
}

#[cfg(test)]
#[path = "tests_validity_contract.rs"]
mod tests_validity_contract;
