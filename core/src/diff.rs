//! Snapshot comparison types — field identifiers, mismatch kinds, and the
//! approximate-equality rule for real-valued arrays.
//!
//! Diff results exist for test assertions and diagnostic logging, never for
//! automatic repair.

use crate::types::BusCode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Relative tolerance for real-valued comparison. Repeated copy/update
/// cycles accumulate float noise; exact equality would flag healthy
/// snapshots.
pub const RTOL: f64 = 1e-5;

/// Absolute tolerance floor for values near zero.
pub const ATOL: f64 = 1e-8;

/// The comparable fields of a snapshot, in the fixed comparison order.
/// `BTreeMap` keyed by this enum iterates in exactly this order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum StateField {
    LoadP,
    LoadQ,
    GenP,
    GenV,
    StorageP,
    TopoVect,
    ShuntP,
    ShuntQ,
    ShuntBus,
    SwitchState,
}

impl StateField {
    pub fn as_str(&self) -> &'static str {
        match self {
            StateField::LoadP       => "load_p",
            StateField::LoadQ       => "load_q",
            StateField::GenP        => "gen_p",
            StateField::GenV        => "gen_v",
            StateField::StorageP    => "storage_p",
            StateField::TopoVect    => "topo_vect",
            StateField::ShuntP      => "shunt_p",
            StateField::ShuntQ      => "shunt_q",
            StateField::ShuntBus    => "shunt_bus",
            StateField::SwitchState => "switch_state",
        }
    }
}

impl fmt::Display for StateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Owned copy of one side's array, carried inside a [`FieldDiff`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldValues {
    Real(Vec<f64>),
    Bus(Vec<BusCode>),
    Switch(Vec<bool>),
}

/// How one field of two snapshots disagrees. Fields absent on both sides
/// are skipped, so a diff map only ever holds genuine mismatches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldDiff {
    /// Absent here, tracked by the other snapshot.
    MeNone { other: FieldValues },
    /// Tracked here, absent on the other snapshot.
    OtherNone { me: FieldValues },
    /// Both tracked, array lengths disagree.
    Size { me: usize, other: usize },
    /// Both tracked, same length, values diverge beyond tolerance.
    Values { me: FieldValues, other: FieldValues },
}

/// Result of [`GridSnapshot::where_different`](crate::snapshot::GridSnapshot::where_different):
/// one entry per mismatching field, in [`StateField`] order.
pub type StateDiff = BTreeMap<StateField, FieldDiff>;

/// Elementwise approximate equality: `|a - b| <= ATOL + RTOL * |b|`.
pub fn all_close(me: &[f64], other: &[f64]) -> bool {
    me.len() == other.len()
        && me
            .iter()
            .zip(other)
            .all(|(a, b)| (a - b).abs() <= ATOL + RTOL * b.abs())
}

/// Classify one field pair. `close` decides value equality so that real
/// arrays tolerate float noise while bus codes and switches compare exactly.
pub(crate) fn compare_field<T: Clone>(
    me: Option<&[T]>,
    other: Option<&[T]>,
    close: impl Fn(&[T], &[T]) -> bool,
    wrap: impl Fn(Vec<T>) -> FieldValues,
) -> Option<FieldDiff> {
    match (me, other) {
        (None, None) => None,
        (None, Some(o)) => Some(FieldDiff::MeNone {
            other: wrap(o.to_vec()),
        }),
        (Some(m), None) => Some(FieldDiff::OtherNone { me: wrap(m.to_vec()) }),
        (Some(m), Some(o)) => {
            if m.len() != o.len() {
                Some(FieldDiff::Size {
                    me: m.len(),
                    other: o.len(),
                })
            } else if close(m, o) {
                None
            } else {
                Some(FieldDiff::Values {
                    me: wrap(m.to_vec()),
                    other: wrap(o.to_vec()),
                })
            }
        }
    }
}
