//! Read-only query interface to the grid backend (the electrical solver).
//!
//! The snapshot never drives the backend; it only pulls the freshly solved
//! setpoints and topology after a step. Anything that can answer these
//! queries can seed a snapshot — the production solver, or the replay
//! [`StaticBackend`] used by tests and grid-runner.

use crate::types::BusCode;

pub trait BackendQuery {
    /// Full topology vector after the last solve.
    fn get_topo_vect(&self) -> Vec<BusCode>;

    /// Per-load (active, reactive) power.
    fn loads_info(&self) -> (Vec<f64>, Vec<f64>);

    /// Per-generator (active power, reactive power, voltage setpoint).
    fn generators_info(&self) -> (Vec<f64>, Vec<f64>, Vec<f64>);

    /// Per-storage-unit active power. Only queried when the grid has
    /// storage units.
    fn storages_info(&self) -> Vec<f64>;

    /// Whether this backend can report shunt setpoints at all.
    fn shunts_available(&self) -> bool;

    /// Per-shunt (active power, reactive power, bus). Only queried when
    /// [`shunts_available`](Self::shunts_available) returns true.
    fn shunt_setpoint(&self) -> (Vec<f64>, Vec<f64>, Vec<BusCode>);
}

/// A backend that replays pre-recorded arrays. Fields are public so tests
/// and the runner can rewrite them between update cycles.
#[derive(Debug, Clone, Default)]
pub struct StaticBackend {
    pub topo_vect: Vec<BusCode>,
    pub load_p:    Vec<f64>,
    pub load_q:    Vec<f64>,
    pub gen_p:     Vec<f64>,
    pub gen_q:     Vec<f64>,
    pub gen_v:     Vec<f64>,
    pub storage_p: Vec<f64>,
    /// (p, q, bus) per shunt; `None` models a backend without shunt support.
    pub shunts:    Option<(Vec<f64>, Vec<f64>, Vec<BusCode>)>,
}

impl BackendQuery for StaticBackend {
    fn get_topo_vect(&self) -> Vec<BusCode> {
        self.topo_vect.clone()
    }

    fn loads_info(&self) -> (Vec<f64>, Vec<f64>) {
        (self.load_p.clone(), self.load_q.clone())
    }

    fn generators_info(&self) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
        (self.gen_p.clone(), self.gen_q.clone(), self.gen_v.clone())
    }

    fn storages_info(&self) -> Vec<f64> {
        self.storage_p.clone()
    }

    fn shunts_available(&self) -> bool {
        self.shunts.is_some()
    }

    fn shunt_setpoint(&self) -> (Vec<f64>, Vec<f64>, Vec<BusCode>) {
        self.shunts
            .clone()
            .expect("shunt_setpoint queried on a backend without shunt support")
    }
}
