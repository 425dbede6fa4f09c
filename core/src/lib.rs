//! gridsim-core — previous-state tracking for grid simulation environments.
//!
//! The environment remembers the last known good setpoints and topology of
//! every grid element in a [`snapshot::GridSnapshot`], refreshes it after
//! each solver step (only for elements currently connected), hands copies to
//! forecast sub-environments, and freezes the canonical initial-state
//! reference against accidental mutation.
//!
//! Single-threaded by design: each environment instance owns its snapshot
//! exclusively, and `&mut self` on every mutating operation makes that
//! structural. The freeze gate guards against accidental mutation, not
//! against concurrent access.

pub mod backend;
pub mod diff;
pub mod error;
pub mod shape;
pub mod snapshot;
pub mod types;

pub use backend::{BackendQuery, StaticBackend};
pub use diff::{FieldDiff, FieldValues, StateDiff, StateField};
pub use error::{SnapshotError, SnapshotResult};
pub use shape::{GridShape, SwitchTopology};
pub use snapshot::{GridObservation, GridSnapshot, ShuntObservation};
