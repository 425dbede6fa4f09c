//! Backend-driven update tests — the BackendQuery adapter and the
//! presence-mismatch errors for shunt and switch data.

use gridsim_core::{
    GridObservation, GridShape, GridSnapshot, ShuntObservation, SnapshotError,
    StaticBackend, SwitchTopology,
};

fn shape(with_shunts: bool, with_switches: bool) -> GridShape {
    GridShape {
        name_load:    vec!["load_0".into(), "load_1".into()],
        name_gen:     vec!["gen_0".into()],
        name_storage: vec!["storage_0".into()],
        name_shunt:   with_shunts.then(|| vec!["shunt_0".into()]),
        load_pos_topo_vect:    vec![0, 1],
        gen_pos_topo_vect:     vec![2],
        storage_pos_topo_vect: vec![3],
        dim_topo: 4,
        n_busbar_per_sub: 2,
        detailed_topo: with_switches.then(|| SwitchTopology { n_switch: 3 }),
    }
}

fn base_obs(with_shunts: bool, with_switches: bool) -> GridObservation {
    GridObservation {
        load_p:    vec![1.0, 2.0],
        load_q:    vec![0.1, 0.2],
        gen_p:     vec![10.0],
        gen_v:     vec![1.0],
        topo_vect: vec![1, 1, 1, 1],
        storage_p: vec![0.0],
        shunt: with_shunts.then(|| ShuntObservation {
            p:   vec![0.0],
            q:   vec![-10.0],
            bus: vec![1],
        }),
        switches: with_switches.then(|| vec![true, true, true]),
    }
}

fn backend() -> StaticBackend {
    StaticBackend {
        topo_vect: vec![1, -1, 2, 1],
        load_p:    vec![11.0, 22.0],
        load_q:    vec![1.1, 2.2],
        gen_p:     vec![33.0],
        gen_q:     vec![4.0], // reported but never stored
        gen_v:     vec![1.04],
        storage_p: vec![5.0],
        shunts:    Some((vec![7.0], vec![-7.0], vec![2])),
    }
}

#[test]
fn backend_values_land_through_the_gated_update() {
    let mut snap = GridSnapshot::new(shape(true, false), &base_obs(true, false))
        .expect("construction");

    snap.update_from_backend(&backend()).expect("update_from_backend");

    assert_eq!(snap.load_p(), &[11.0, 2.0], "load_1 is disconnected in the backend topo");
    assert_eq!(snap.load_q(), &[1.1, 0.2]);
    assert_eq!(snap.gen_p(), &[33.0]);
    assert_eq!(snap.gen_v(), &[1.04]);
    assert_eq!(snap.storage_p(), &[5.0]);
    assert_eq!(snap.topo_vect(), &[1, 1, 2, 1]);
    assert_eq!(snap.shunt_p(), Some(&[7.0][..]));
    assert_eq!(snap.shunt_bus(), Some(&[2][..]));
}

#[test]
fn a_backend_without_shunt_support_leaves_tracked_shunts_alone() {
    let mut snap = GridSnapshot::new(shape(true, false), &base_obs(true, false))
        .expect("construction");

    let mut be = backend();
    be.shunts = None;
    snap.update_from_backend(&be).expect("update_from_backend");

    assert_eq!(snap.shunt_p(), Some(&[0.0][..]));
    assert_eq!(snap.shunt_q(), Some(&[-10.0][..]));
    assert_eq!(snap.shunt_bus(), Some(&[1][..]));
}

#[test]
fn shunt_data_against_a_non_tracking_snapshot_is_an_error() {
    let mut snap = GridSnapshot::new(shape(false, false), &base_obs(false, false))
        .expect("construction");

    let err = snap.update_from_backend(&backend()).unwrap_err();
    assert!(matches!(err, SnapshotError::MissingShuntData { .. }), "{err}");
}

#[test]
fn switch_tracking_snapshots_reject_the_backend_path() {
    // Switch extraction from a detailed-topology backend is a declared
    // capability gap: the adapter always passes switches as absent, and a
    // tracking snapshot must refuse rather than silently desynchronize.
    let mut snap = GridSnapshot::new(shape(false, true), &base_obs(false, true))
        .expect("construction");

    let mut be = backend();
    be.shunts = None;
    let err = snap.update_from_backend(&be).unwrap_err();
    assert!(matches!(err, SnapshotError::MissingSwitchData { .. }), "{err}");
}

#[test]
fn switch_values_against_a_non_tracking_snapshot_are_an_error() {
    let mut snap = GridSnapshot::new(shape(false, false), &base_obs(false, false))
        .expect("construction");

    let mut obs = base_obs(false, false);
    obs.switches = Some(vec![true, false, true]);
    let err = snap.update(&obs).unwrap_err();
    assert!(matches!(err, SnapshotError::MissingSwitchData { .. }), "{err}");
}

#[test]
fn supplied_switch_values_overwrite_without_gating() {
    let mut snap = GridSnapshot::new(shape(false, true), &base_obs(false, true))
        .expect("construction");

    let mut obs = base_obs(false, true);
    obs.topo_vect = vec![-1, -1, -1, -1]; // everything disconnected
    obs.switches = Some(vec![false, true, false]);
    snap.update(&obs).expect("update");

    assert_eq!(snap.switch_state(), Some(&[false, true, false][..]),
        "switches have no partial-connectivity semantic");
}

#[test]
fn update_from_other_requires_matching_optional_fields() {
    let mut with_shunts = GridSnapshot::new(shape(true, false), &base_obs(true, false))
        .expect("construction");
    let without = GridSnapshot::new(shape(false, false), &base_obs(false, false))
        .expect("construction");

    let err = with_shunts.update_from_other(&without).unwrap_err();
    assert!(matches!(err, SnapshotError::MissingShuntData { .. }), "{err}");
    // Nothing was copied before the refusal.
    assert_eq!(with_shunts.shunt_q(), Some(&[-10.0][..]));
}

#[test]
fn update_from_other_copies_every_field_unconditionally() {
    let mut dst = GridSnapshot::new(shape(true, false), &base_obs(true, false))
        .expect("construction");
    let mut src = dst.copy();
    src.update_from_backend(&backend()).expect("seed source");

    dst.update_from_other(&src).expect("update_from_other");
    assert!(dst == src);
    // Even the slot the backend saw as disconnected was copied verbatim.
    assert_eq!(dst.topo_vect(), src.topo_vect());
}

#[test]
fn observation_arrays_must_match_the_declared_counts() {
    let mut snap = GridSnapshot::new(shape(false, false), &base_obs(false, false))
        .expect("construction");

    let mut obs = base_obs(false, false);
    obs.load_p = vec![1.0, 2.0, 3.0];
    let err = snap.update(&obs).unwrap_err();
    match err {
        SnapshotError::SizeMismatch { field, expected, actual } => {
            assert_eq!(field, "load_p");
            assert_eq!((expected, actual), (2, 3));
        }
        other => panic!("expected a size mismatch, got {other}"),
    }
    // The refused call mutated nothing.
    assert_eq!(snap.load_p(), &[1.0, 2.0]);
}
