//! The previous-state snapshot — the last known good setpoints and topology
//! of every grid element, carried across steps, resets, and forecast copies.
//!
//! RULES:
//!   - A disconnected element keeps its last known setpoint. That stale
//!     value becomes the default when the controller reconnects the element,
//!     so it must never be zeroed or overwritten with garbage.
//!   - The freeze gate is checked, and the whole observation validated,
//!     before any field is touched. A failed call leaves no partial update.
//!   - Optional field groups (shunts, switches) are fixed at construction
//!     from the shape and never appear or disappear afterwards.

use crate::backend::BackendQuery;
use crate::diff::{all_close, compare_field, FieldValues, StateDiff, StateField};
use crate::error::{SnapshotError, SnapshotResult};
use crate::shape::GridShape;
use crate::types::{BusCode, BUS_DISCONNECTED, BUS_ERROR, BUS_FIRST, BUS_UNSET};
use serde::{Deserialize, Serialize};

/// Freshly observed shunt setpoints, part of a [`GridObservation`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShuntObservation {
    pub p:   Vec<f64>,
    pub q:   Vec<f64>,
    pub bus: Vec<BusCode>,
}

/// Raw arrays observed after one solver step. Doubles as the constructor
/// input: the initial observation seeds the snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GridObservation {
    pub load_p:    Vec<f64>,
    pub load_q:    Vec<f64>,
    pub gen_p:     Vec<f64>,
    pub gen_v:     Vec<f64>,
    pub topo_vect: Vec<BusCode>,
    /// Empty when the grid has no storage units.
    pub storage_p: Vec<f64>,
    pub shunt:     Option<ShuntObservation>,
    pub switches:  Option<Vec<bool>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ShuntState {
    p:   Vec<f64>,
    q:   Vec<f64>,
    bus: Vec<BusCode>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GridSnapshot {
    shape:        GridShape,
    load_p:       Vec<f64>,
    load_q:       Vec<f64>,
    gen_p:        Vec<f64>,
    gen_v:        Vec<f64>,
    storage_p:    Vec<f64>,
    topo_vect:    Vec<BusCode>,
    shunt:        Option<ShuntState>,
    switch_state: Option<Vec<bool>>,
    can_modify:   bool,
}

impl GridSnapshot {
    /// Build a snapshot from the grid shape and an initial observation.
    ///
    /// Every array is deep-copied; later mutation of `init` never reaches
    /// the snapshot. Shunt and switch data are required iff the shape
    /// declares them; data supplied for an undeclared group is ignored,
    /// since presence is fixed by the descriptor.
    pub fn new(shape: GridShape, init: &GridObservation) -> SnapshotResult<Self> {
        shape.validate()?;
        check_lengths(&shape, init)?;

        let shunt = if shape.has_shunts() {
            let sh = init.shunt.as_ref().ok_or(SnapshotError::MissingShuntData {
                detail: "grid declares shunts but no initial shunt data was supplied",
            })?;
            Some(ShuntState {
                p:   sh.p.clone(),
                q:   sh.q.clone(),
                bus: sh.bus.clone(),
            })
        } else {
            None
        };
        let switch_state = if shape.has_switches() {
            Some(init.switches.clone().ok_or(SnapshotError::MissingSwitchData {
                detail: "grid declares a detailed topology but no initial switch state was supplied",
            })?)
        } else {
            None
        };

        Ok(Self {
            load_p:    init.load_p.clone(),
            load_q:    init.load_q.clone(),
            gen_p:     init.gen_p.clone(),
            gen_v:     init.gen_v.clone(),
            storage_p: init.storage_p.clone(),
            topo_vect: init.topo_vect.clone(),
            shunt,
            switch_state,
            can_modify: true,
            shape,
        })
    }

    /// Deep copy. The copy is always modifiable, whatever the source's gate:
    /// forecast sub-environments receive a copy precisely so they can mutate
    /// it without touching the canonical reference.
    pub fn copy(&self) -> Self {
        Self {
            shape:        self.shape.clone(),
            load_p:       self.load_p.clone(),
            load_q:       self.load_q.clone(),
            gen_p:        self.gen_p.clone(),
            gen_v:        self.gen_v.clone(),
            storage_p:    self.storage_p.clone(),
            topo_vect:    self.topo_vect.clone(),
            shunt:        self.shunt.clone(),
            switch_state: self.switch_state.clone(),
            can_modify:   true,
        }
    }

    /// Refresh only the elements the new observation shows as connected.
    ///
    /// Loads, generators, and storage units are gated per element on the
    /// new topology code at that element's slot; the topology vector itself
    /// only accepts strictly positive codes, so a transient "unknown" never
    /// erases a previously known bus. Switches, when tracked, are always
    /// fully overwritten — they carry no partial-connectivity semantic.
    pub fn update(&mut self, obs: &GridObservation) -> SnapshotResult<()> {
        self.ensure_mutable()?;
        check_lengths(&self.shape, obs)?;
        self.check_optional_presence(obs)?;

        gated_refresh(
            &self.shape.load_pos_topo_vect,
            &obs.topo_vect,
            &mut self.load_p,
            &obs.load_p,
        );
        gated_refresh(
            &self.shape.load_pos_topo_vect,
            &obs.topo_vect,
            &mut self.load_q,
            &obs.load_q,
        );
        gated_refresh(
            &self.shape.gen_pos_topo_vect,
            &obs.topo_vect,
            &mut self.gen_p,
            &obs.gen_p,
        );
        gated_refresh(
            &self.shape.gen_pos_topo_vect,
            &obs.topo_vect,
            &mut self.gen_v,
            &obs.gen_v,
        );
        for (stored, &new) in self.topo_vect.iter_mut().zip(&obs.topo_vect) {
            if new > 0 {
                *stored = new;
            }
        }
        if self.shape.n_storage() > 0 {
            gated_refresh(
                &self.shape.storage_pos_topo_vect,
                &obs.topo_vect,
                &mut self.storage_p,
                &obs.storage_p,
            );
        }
        if let (Some(stored), Some(new)) = (self.shunt.as_mut(), obs.shunt.as_ref()) {
            for i in 0..stored.p.len() {
                if new.bus[i] > 0 {
                    stored.p[i] = new.p[i];
                    stored.q[i] = new.q[i];
                }
            }
            for (sb, &nb) in stored.bus.iter_mut().zip(&new.bus) {
                if nb > 0 {
                    *sb = nb;
                }
            }
        }
        if let (Some(stored), Some(new)) = (self.switch_state.as_mut(), obs.switches.as_ref()) {
            stored.copy_from_slice(new);
        }

        log::debug!(
            "snapshot update: {}/{} slots connected",
            obs.topo_vect.iter().filter(|&&b| b > 0).count(),
            obs.topo_vect.len()
        );
        Ok(())
    }

    /// Pull fresh setpoints from the backend and delegate to [`update`].
    ///
    /// Switch extraction from a detailed-topology backend is not implemented
    /// yet; this path always passes switches as absent, so a switch-tracking
    /// snapshot rejects it in `update`.
    ///
    /// [`update`]: GridSnapshot::update
    pub fn update_from_backend<B: BackendQuery + ?Sized>(
        &mut self,
        backend: &B,
    ) -> SnapshotResult<()> {
        self.ensure_mutable()?;
        let topo_vect = backend.get_topo_vect();
        let (load_p, load_q) = backend.loads_info();
        let (gen_p, _gen_q, gen_v) = backend.generators_info();
        let storage_p = if self.shape.n_storage() > 0 {
            backend.storages_info()
        } else {
            Vec::new()
        };
        let shunt = if backend.shunts_available() {
            let (p, q, bus) = backend.shunt_setpoint();
            Some(ShuntObservation { p, q, bus })
        } else {
            None
        };
        self.update(&GridObservation {
            load_p,
            load_q,
            gen_p,
            gen_v,
            topo_vect,
            storage_p,
            shunt,
            switches: None,
        })
    }

    /// Unconditionally copy every field's contents from another snapshot.
    ///
    /// No connectivity gating here. Array storage is reused where lengths
    /// allow; single-element (and resized) arrays are replaced wholesale.
    pub fn update_from_other(&mut self, other: &GridSnapshot) -> SnapshotResult<()> {
        self.ensure_mutable()?;
        if self.shunt.is_some() != other.shunt.is_some() {
            return Err(SnapshotError::MissingShuntData {
                detail: "the two snapshots disagree on shunt tracking",
            });
        }
        if self.switch_state.is_some() != other.switch_state.is_some() {
            return Err(SnapshotError::MissingSwitchData {
                detail: "the two snapshots disagree on switch tracking",
            });
        }

        copy_into(&mut self.load_p, &other.load_p);
        copy_into(&mut self.load_q, &other.load_q);
        copy_into(&mut self.gen_p, &other.gen_p);
        copy_into(&mut self.gen_v, &other.gen_v);
        copy_into(&mut self.storage_p, &other.storage_p);
        copy_into(&mut self.topo_vect, &other.topo_vect);
        if let (Some(me), Some(oth)) = (self.shunt.as_mut(), other.shunt.as_ref()) {
            copy_into(&mut me.p, &oth.p);
            copy_into(&mut me.q, &oth.q);
            copy_into(&mut me.bus, &oth.bus);
        }
        if let (Some(me), Some(oth)) = (self.switch_state.as_mut(), other.switch_state.as_ref())
        {
            copy_into(me, oth);
        }
        Ok(())
    }

    /// Mark the snapshot read-only. Every subsequent mutating call fails
    /// with [`SnapshotError::ImmutableState`] until [`force_update`] is used.
    ///
    /// [`force_update`]: GridSnapshot::force_update
    pub fn prevent_modification(&mut self) {
        self.can_modify = false;
        log::debug!("snapshot frozen");
    }

    /// The only way to change a frozen snapshot: temporarily restore the
    /// gate, copy everything from `other`, then refreeze. Used when a
    /// forecast sub-environment is seeded from the parent's current state.
    /// The snapshot is frozen after the call even if the copy failed.
    pub fn force_update(&mut self, other: &GridSnapshot) -> SnapshotResult<()> {
        self.can_modify = true;
        let res = self.update_from_other(other);
        self.can_modify = false;
        log::debug!("snapshot force-updated and refrozen");
        res
    }

    /// Where this snapshot differs from another one. Pure; see
    /// [`StateDiff`] for the classification per field.
    pub fn where_different(&self, other: &GridSnapshot) -> StateDiff {
        let mut res = StateDiff::new();

        let real_fields = [
            (StateField::LoadP, &self.load_p, &other.load_p),
            (StateField::LoadQ, &self.load_q, &other.load_q),
            (StateField::GenP, &self.gen_p, &other.gen_p),
            (StateField::GenV, &self.gen_v, &other.gen_v),
            (StateField::StorageP, &self.storage_p, &other.storage_p),
        ];
        for (field, me, oth) in real_fields {
            if let Some(diff) = compare_field(
                Some(me.as_slice()),
                Some(oth.as_slice()),
                all_close,
                FieldValues::Real,
            ) {
                res.insert(field, diff);
            }
        }

        if let Some(diff) = compare_field(
            Some(self.topo_vect.as_slice()),
            Some(other.topo_vect.as_slice()),
            |a, b| a == b,
            FieldValues::Bus,
        ) {
            res.insert(StateField::TopoVect, diff);
        }

        let me_sh = self.shunt.as_ref();
        let oth_sh = other.shunt.as_ref();
        if let Some(diff) = compare_field(
            me_sh.map(|s| s.p.as_slice()),
            oth_sh.map(|s| s.p.as_slice()),
            all_close,
            FieldValues::Real,
        ) {
            res.insert(StateField::ShuntP, diff);
        }
        if let Some(diff) = compare_field(
            me_sh.map(|s| s.q.as_slice()),
            oth_sh.map(|s| s.q.as_slice()),
            all_close,
            FieldValues::Real,
        ) {
            res.insert(StateField::ShuntQ, diff);
        }
        if let Some(diff) = compare_field(
            me_sh.map(|s| s.bus.as_slice()),
            oth_sh.map(|s| s.bus.as_slice()),
            |a, b| a == b,
            FieldValues::Bus,
        ) {
            res.insert(StateField::ShuntBus, diff);
        }

        if let Some(diff) = compare_field(
            self.switch_state.as_deref(),
            other.switch_state.as_deref(),
            |a, b| a == b,
            FieldValues::Switch,
        ) {
            res.insert(StateField::SwitchState, diff);
        }

        res
    }

    /// Normalize an invalid topology vector before it is reused as the
    /// baseline for set-bus actions.
    ///
    /// Invalid codes are `<= -2` (error sentinel), `0` (uninitialized), and
    /// anything above the busbar count. Sentinels and uninitialized slots
    /// become `-1` (disconnected); out-of-range codes clamp to busbar 1.
    /// A fully valid vector is left untouched, even on a frozen snapshot.
    pub fn fix_topo_bus(&mut self) -> SnapshotResult<()> {
        let n_busbar = self.shape.n_busbar_per_sub;
        let any_invalid = self
            .topo_vect
            .iter()
            .any(|&b| b <= BUS_ERROR || b == BUS_UNSET || b > n_busbar);
        if !any_invalid {
            return Ok(());
        }
        if self.switch_state.is_some() {
            // Clamping a bus code without adjusting the switches that imply
            // it could leave an electrically inconsistent pairing.
            return Err(SnapshotError::UnsupportedDetailedTopology);
        }
        self.ensure_mutable()?;

        let mut repaired = 0usize;
        for code in &mut self.topo_vect {
            if *code <= BUS_ERROR || *code == BUS_UNSET {
                *code = BUS_DISCONNECTED;
                repaired += 1;
            } else if *code > n_busbar {
                *code = BUS_FIRST;
                repaired += 1;
            }
        }
        log::debug!("fix_topo_bus repaired {repaired} slots");
        Ok(())
    }

    pub fn is_frozen(&self) -> bool {
        !self.can_modify
    }

    pub fn shape(&self) -> &GridShape {
        &self.shape
    }

    pub fn load_p(&self) -> &[f64] {
        &self.load_p
    }

    pub fn load_q(&self) -> &[f64] {
        &self.load_q
    }

    pub fn gen_p(&self) -> &[f64] {
        &self.gen_p
    }

    pub fn gen_v(&self) -> &[f64] {
        &self.gen_v
    }

    pub fn storage_p(&self) -> &[f64] {
        &self.storage_p
    }

    pub fn topo_vect(&self) -> &[BusCode] {
        &self.topo_vect
    }

    pub fn shunt_p(&self) -> Option<&[f64]> {
        self.shunt.as_ref().map(|s| s.p.as_slice())
    }

    pub fn shunt_q(&self) -> Option<&[f64]> {
        self.shunt.as_ref().map(|s| s.q.as_slice())
    }

    pub fn shunt_bus(&self) -> Option<&[BusCode]> {
        self.shunt.as_ref().map(|s| s.bus.as_slice())
    }

    pub fn switch_state(&self) -> Option<&[bool]> {
        self.switch_state.as_deref()
    }

    fn ensure_mutable(&self) -> SnapshotResult<()> {
        if self.can_modify {
            Ok(())
        } else {
            Err(SnapshotError::ImmutableState)
        }
    }

    fn check_optional_presence(&self, obs: &GridObservation) -> SnapshotResult<()> {
        if obs.shunt.is_some() && self.shunt.is_none() {
            return Err(SnapshotError::MissingShuntData {
                detail: "new shunt values supplied but the snapshot tracks no shunts",
            });
        }
        match (&self.switch_state, &obs.switches) {
            (Some(_), None) => Err(SnapshotError::MissingSwitchData {
                detail: "no new switch values to refresh the tracked switch state",
            }),
            (None, Some(_)) => Err(SnapshotError::MissingSwitchData {
                detail: "new switch values supplied but the snapshot tracks no switch state",
            }),
            _ => Ok(()),
        }
    }
}

impl PartialEq for GridSnapshot {
    fn eq(&self, other: &Self) -> bool {
        self.where_different(other).is_empty()
    }
}

/// Overwrite `stored[i]` with `observed[i]` for every element whose slot in
/// the new topology vector carries a strictly positive code.
fn gated_refresh(
    positions: &[usize],
    topo_new: &[BusCode],
    stored: &mut [f64],
    observed: &[f64],
) {
    for (i, &pos) in positions.iter().enumerate() {
        if topo_new[pos] > 0 {
            stored[i] = observed[i];
        }
    }
}

/// Copy `source` into `stored`, reusing the existing allocation where the
/// lengths allow. Single-element and resized arrays are replaced wholesale.
fn copy_into<T: Copy>(stored: &mut Vec<T>, source: &[T]) {
    if stored.len() == source.len() && stored.len() > 1 {
        stored.copy_from_slice(source);
    } else {
        *stored = source.to_vec();
    }
}

fn check_lengths(shape: &GridShape, obs: &GridObservation) -> SnapshotResult<()> {
    check_len("load_p", shape.n_load(), obs.load_p.len())?;
    check_len("load_q", shape.n_load(), obs.load_q.len())?;
    check_len("gen_p", shape.n_gen(), obs.gen_p.len())?;
    check_len("gen_v", shape.n_gen(), obs.gen_v.len())?;
    check_len("topo_vect", shape.dim_topo, obs.topo_vect.len())?;
    check_len("storage_p", shape.n_storage(), obs.storage_p.len())?;
    if shape.has_shunts() {
        if let Some(sh) = &obs.shunt {
            check_len("shunt_p", shape.n_shunt(), sh.p.len())?;
            check_len("shunt_q", shape.n_shunt(), sh.q.len())?;
            check_len("shunt_bus", shape.n_shunt(), sh.bus.len())?;
        }
    }
    if shape.has_switches() {
        if let Some(sw) = &obs.switches {
            check_len("switch_state", shape.n_switch(), sw.len())?;
        }
    }
    Ok(())
}

fn check_len(field: &'static str, expected: usize, actual: usize) -> SnapshotResult<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(SnapshotError::SizeMismatch {
            field,
            expected,
            actual,
        })
    }
}
