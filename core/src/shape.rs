//! Structural description of the grid — element counts, topology-vector
//! positions, busbar count — fixed for the lifetime of a snapshot.
//!
//! A shape is built once from the grid model descriptor (or loaded from a
//! JSON mapping of the same layout) and is consumed read-only afterwards.
//! Presence of the optional field groups is decided here and never changes:
//!   - `name_shunt: Some(..)`   => the snapshot tracks `shunt_p/q/bus`.
//!   - `detailed_topo: Some(..)` => the snapshot tracks `switch_state`.

use crate::error::{SnapshotError, SnapshotResult};
use crate::types::BusCode;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GridShape {
    /// Ordered element names per category; counts derive from these.
    pub name_load:    Vec<String>,
    pub name_gen:     Vec<String>,
    pub name_storage: Vec<String>,
    /// `Some` iff the grid model declares shunts.
    #[serde(default)]
    pub name_shunt:   Option<Vec<String>>,

    /// Per-category positions into the unified topology vector.
    pub load_pos_topo_vect:    Vec<usize>,
    pub gen_pos_topo_vect:     Vec<usize>,
    pub storage_pos_topo_vect: Vec<usize>,

    /// Total length of the topology vector.
    pub dim_topo: usize,

    /// Busbars available per substation; valid connected codes are 1..=this.
    pub n_busbar_per_sub: BusCode,

    /// `Some` iff the grid model carries a switch-level topology description.
    #[serde(default)]
    pub detailed_topo: Option<SwitchTopology>,
}

/// Switch-level topology descriptor. Only the switch count matters to the
/// snapshot; the wiring itself belongs to the grid model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SwitchTopology {
    pub n_switch: usize,
}

impl GridShape {
    pub fn n_load(&self) -> usize {
        self.name_load.len()
    }

    pub fn n_gen(&self) -> usize {
        self.name_gen.len()
    }

    pub fn n_storage(&self) -> usize {
        self.name_storage.len()
    }

    pub fn n_shunt(&self) -> usize {
        self.name_shunt.as_ref().map_or(0, Vec::len)
    }

    pub fn has_shunts(&self) -> bool {
        self.name_shunt.is_some()
    }

    pub fn has_switches(&self) -> bool {
        self.detailed_topo.is_some()
    }

    pub fn n_switch(&self) -> usize {
        self.detailed_topo.as_ref().map_or(0, |dt| dt.n_switch)
    }

    /// Check internal consistency. Called by the snapshot constructor; a
    /// shape that fails here must never reach the update path.
    pub fn validate(&self) -> SnapshotResult<()> {
        if self.n_busbar_per_sub < 1 {
            return Err(SnapshotError::InvalidShape {
                detail: format!(
                    "n_busbar_per_sub must be >= 1, got {}",
                    self.n_busbar_per_sub
                ),
            });
        }
        let categories = [
            ("load", self.n_load(), &self.load_pos_topo_vect),
            ("gen", self.n_gen(), &self.gen_pos_topo_vect),
            ("storage", self.n_storage(), &self.storage_pos_topo_vect),
        ];
        for (label, count, positions) in categories {
            if positions.len() != count {
                return Err(SnapshotError::InvalidShape {
                    detail: format!(
                        "{label}: {} topology positions for {count} elements",
                        positions.len()
                    ),
                });
            }
            if let Some(&bad) = positions.iter().find(|&&p| p >= self.dim_topo) {
                return Err(SnapshotError::InvalidShape {
                    detail: format!(
                        "{label}: topology position {bad} out of range (dim_topo={})",
                        self.dim_topo
                    ),
                });
            }
        }
        Ok(())
    }

    /// Load a shape from a JSON descriptor mapping and validate it.
    pub fn from_json_str(raw: &str) -> SnapshotResult<Self> {
        let shape: GridShape = serde_json::from_str(raw)?;
        shape.validate()?;
        Ok(shape)
    }
}
