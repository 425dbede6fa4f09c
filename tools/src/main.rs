//! grid-runner: headless exercise of the previous-state tracker.
//!
//! Usage:
//!   grid-runner --steps 24
//!   grid-runner --steps 24 --json
//!
//! Builds a small five-substation grid shape, seeds a snapshot, freezes a
//! canonical reference copy, then replays drifting setpoints through a
//! StaticBackend — disconnecting one load every fourth step — and prints
//! where the tracked state ended up relative to the reference.

use anyhow::Result;
use gridsim_core::{
    GridObservation, GridShape, GridSnapshot, ShuntObservation, StaticBackend,
};
use std::env;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let steps = parse_arg(&args, "--steps", 24u64);
    let json = args.iter().any(|a| a == "--json");

    if !json {
        println!("grid-runner — previous-state tracker demo");
        println!("  steps: {steps}");
        println!();
    }

    let shape = demo_shape();
    let init = initial_observation(&shape);
    let mut tracked = GridSnapshot::new(shape.clone(), &init)?;

    // Canonical reference: frozen as soon as it is established.
    let mut reference = tracked.copy();
    reference.prevent_modification();

    let mut backend = StaticBackend {
        topo_vect: init.topo_vect.clone(),
        load_p:    init.load_p.clone(),
        load_q:    init.load_q.clone(),
        gen_p:     init.gen_p.clone(),
        gen_q:     vec![0.0; shape.n_gen()],
        gen_v:     init.gen_v.clone(),
        storage_p: init.storage_p.clone(),
        shunts:    init
            .shunt
            .as_ref()
            .map(|s| (s.p.clone(), s.q.clone(), s.bus.clone())),
    };

    for step in 1..=steps {
        drift(&mut backend, step);
        // Every fourth step the first load drops off the grid; its slot in
        // the tracked snapshot must keep the last connected setpoint.
        backend.topo_vect[0] = if step % 4 == 0 { -1 } else { 1 };
        tracked.update_from_backend(&backend)?;
        log::debug!("step {step}: load_p = {:?}", tracked.load_p());
    }

    let diff = tracked.where_different(&reference);
    if json {
        println!("{}", serde_json::to_string_pretty(&tracked)?);
        println!("{}", serde_json::to_string_pretty(&diff)?);
    } else {
        println!("after {steps} steps:");
        println!("  load_p:    {:?}", tracked.load_p());
        println!("  gen_p:     {:?}", tracked.gen_p());
        println!("  storage_p: {:?}", tracked.storage_p());
        println!("  topo_vect: {:?}", tracked.topo_vect());
        println!();
        println!("fields differing from the frozen reference: {}", diff.len());
        for field in diff.keys() {
            println!("  {field}");
        }
    }

    // Seed the reference from the tracked state the way a forecast
    // sub-environment would, then confirm it stayed frozen.
    reference.force_update(&tracked)?;
    assert!(reference.is_frozen());
    assert!(reference == tracked);
    if !json {
        println!();
        println!("reference force-updated from tracked state; still frozen.");
    }

    Ok(())
}

/// Five-substation toy grid: 3 loads, 2 generators, 1 storage unit, 1 shunt.
fn demo_shape() -> GridShape {
    GridShape {
        name_load:    vec!["load_0".into(), "load_1".into(), "load_2".into()],
        name_gen:     vec!["gen_0".into(), "gen_1".into()],
        name_storage: vec!["storage_0".into()],
        name_shunt:   Some(vec!["shunt_0".into()]),
        load_pos_topo_vect:    vec![0, 1, 2],
        gen_pos_topo_vect:     vec![3, 4],
        storage_pos_topo_vect: vec![5],
        dim_topo: 6,
        n_busbar_per_sub: 2,
        detailed_topo: None,
    }
}

fn initial_observation(shape: &GridShape) -> GridObservation {
    GridObservation {
        load_p:    vec![10.0, 20.0, 30.0],
        load_q:    vec![1.0, 2.0, 3.0],
        gen_p:     vec![40.0, 25.0],
        gen_v:     vec![1.02, 1.01],
        topo_vect: vec![1; shape.dim_topo],
        storage_p: vec![0.0],
        shunt: Some(ShuntObservation {
            p:   vec![0.0],
            q:   vec![-25.0],
            bus: vec![1],
        }),
        switches: None,
    }
}

/// Deterministic setpoint drift so repeated runs are comparable.
fn drift(backend: &mut StaticBackend, step: u64) {
    let wobble = (step as f64 * 0.7).sin();
    for (i, p) in backend.load_p.iter_mut().enumerate() {
        *p = 10.0 * (i as f64 + 1.0) + wobble;
    }
    for (i, p) in backend.gen_p.iter_mut().enumerate() {
        *p = 40.0 - 15.0 * i as f64 + 0.5 * wobble;
    }
    backend.storage_p[0] = 2.0 * wobble;
}

fn parse_arg<T: std::str::FromStr>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
