//! Snapshot Assembly

use tracing::trace;

use crate::catalog::MetricCatalog;
use crate::field::{Field, FieldValue};
use crate::provider::SnapshotProvider;
use crate::snapshot::TelemetrySnapshot;

/// Evaluates a catalog against a provider, one snapshot per call
pub struct SnapshotAssembler<'a, P: SnapshotProvider + ?Sized> {
    catalog: &'a MetricCatalog,
    provider: &'a P,
}

impl<'a, P: SnapshotProvider + ?Sized> SnapshotAssembler<'a, P> {
    pub fn new(catalog: &'a MetricCatalog, provider: &'a P) -> Self {
        Self { catalog, provider }
    }

    /// Build a snapshot.
    ///
    /// A field is included only when every raw metric it requires is fresh;
    /// otherwise it is left out. `utc` is included when the clock is valid.
    pub fn assemble(&self, utc: Option<i64>) -> TelemetrySnapshot {
        let mut builder = TelemetrySnapshot::builder();

        if let Some(utc) = utc {
            builder.insert(Field::Utc, FieldValue::Int(utc));
        }

        for entry in self.catalog.entries() {
            match entry.evaluate(self.provider) {
                Ok(value) => builder.insert(entry.field, value),
                Err(e) => trace!("Omitting {}: {}", entry.field, e),
            }
        }

        builder.build()
    }
}
