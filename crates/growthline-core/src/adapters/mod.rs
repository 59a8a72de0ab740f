mod snapshot;

pub use snapshot::{
    FailureKind, FailureSpec, MetricSeries, ProviderSnapshot, Snapshot, SnapshotPoint,
    SnapshotSource,
};
