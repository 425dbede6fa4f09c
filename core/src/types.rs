//! Shared primitive types used across the entire crate.

/// Bus-assignment code for one topology-vector slot.
///
/// `> 0`  — connected to that busbar number.
/// `-1`   — disconnected / unknown.
/// `0`    — uninitialized.
/// `<= -2` — error sentinel written by a failed solver run.
pub type BusCode = i32;

/// Safe default for an element whose bus cannot be trusted.
pub const BUS_DISCONNECTED: BusCode = -1;

/// Uninitialized slot, never a valid target for a set-bus action.
pub const BUS_UNSET: BusCode = 0;

/// First busbar of a substation, the clamp target for out-of-range codes.
pub const BUS_FIRST: BusCode = 1;

/// Codes at or below this value are error sentinels.
pub const BUS_ERROR: BusCode = -2;
