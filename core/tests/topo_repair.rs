//! Topology repair tests — fix_topo_bus normalization policy.

use gridsim_core::{
    GridObservation, GridShape, GridSnapshot, SnapshotError, SwitchTopology,
};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;

/// A shape whose topology vector is entirely loads, so tests can spell the
/// vector out directly.
fn loads_only_shape(n: usize, n_busbar: i32) -> GridShape {
    GridShape {
        name_load:    (0..n).map(|i| format!("load_{i}")).collect(),
        name_gen:     vec![],
        name_storage: vec![],
        name_shunt:   None,
        load_pos_topo_vect:    (0..n).collect(),
        gen_pos_topo_vect:     vec![],
        storage_pos_topo_vect: vec![],
        dim_topo: n,
        n_busbar_per_sub: n_busbar,
        detailed_topo: None,
    }
}

fn snapshot_with_topo(topo_vect: Vec<i32>, n_busbar: i32) -> GridSnapshot {
    let n = topo_vect.len();
    let obs = GridObservation {
        load_p: vec![0.0; n],
        load_q: vec![0.0; n],
        topo_vect,
        ..GridObservation::default()
    };
    GridSnapshot::new(loads_only_shape(n, n_busbar), &obs).expect("construction")
}

#[test]
fn sentinels_and_unset_become_disconnected() {
    let mut snap = snapshot_with_topo(vec![1, -1, 0, -3], 2);
    snap.fix_topo_bus().expect("repair");
    assert_eq!(snap.topo_vect(), &[1, -1, -1, -1]);
}

#[test]
fn out_of_range_codes_clamp_to_the_first_busbar() {
    let mut snap = snapshot_with_topo(vec![3, 1], 2);
    snap.fix_topo_bus().expect("repair");
    assert_eq!(snap.topo_vect(), &[1, 1]);
}

#[test]
fn a_valid_vector_is_left_untouched() {
    let mut snap = snapshot_with_topo(vec![1, 2, -1, 1], 2);
    snap.fix_topo_bus().expect("repair");
    assert_eq!(snap.topo_vect(), &[1, 2, -1, 1]);
}

#[test]
fn repair_is_idempotent() {
    let mut snap = snapshot_with_topo(vec![-5, 0, 4, 2, -1, 1], 2);
    snap.fix_topo_bus().expect("first repair");
    let once = snap.topo_vect().to_vec();
    snap.fix_topo_bus().expect("second repair");
    assert_eq!(snap.topo_vect(), once.as_slice());
}

#[test]
fn switch_level_snapshots_refuse_repair() {
    let n = 3;
    let shape = GridShape {
        detailed_topo: Some(SwitchTopology { n_switch: 2 }),
        ..loads_only_shape(n, 2)
    };
    let obs = GridObservation {
        load_p: vec![0.0; n],
        load_q: vec![0.0; n],
        topo_vect: vec![1, 0, -2],
        switches: Some(vec![true, false]),
        ..GridObservation::default()
    };
    let mut snap = GridSnapshot::new(shape, &obs).expect("construction");

    let err = snap.fix_topo_bus().unwrap_err();
    assert!(matches!(err, SnapshotError::UnsupportedDetailedTopology), "{err}");
    assert_eq!(snap.topo_vect(), &[1, 0, -2], "no partial repair on refusal");
}

#[test]
fn switch_level_snapshots_with_a_valid_vector_are_a_no_op() {
    let n = 2;
    let shape = GridShape {
        detailed_topo: Some(SwitchTopology { n_switch: 2 }),
        ..loads_only_shape(n, 2)
    };
    let obs = GridObservation {
        load_p: vec![0.0; n],
        load_q: vec![0.0; n],
        topo_vect: vec![1, 2],
        switches: Some(vec![true, true]),
        ..GridObservation::default()
    };
    let mut snap = GridSnapshot::new(shape, &obs).expect("construction");
    snap.fix_topo_bus().expect("nothing to repair");
}

#[test]
fn every_repaired_vector_is_valid_for_set_bus() {
    let mut rng = Pcg64Mcg::seed_from_u64(42);
    for _ in 0..100 {
        let n_busbar = rng.gen_range(1..=3);
        let topo: Vec<i32> = (0..rng.gen_range(1..20))
            .map(|_| rng.gen_range(-5..6))
            .collect();
        let mut snap = snapshot_with_topo(topo, n_busbar);
        snap.fix_topo_bus().expect("repair");
        assert!(
            snap.topo_vect()
                .iter()
                .all(|&b| b == -1 || (b >= 1 && b <= n_busbar)),
            "repaired vector still invalid: {:?} (n_busbar={n_busbar})",
            snap.topo_vect()
        );
    }
}
