//! Damped spring solver.
//!
//! Every relation is a spring pulling a node toward its neighbor's current position. Forces are
//! computed for all nodes from the positions at the start of a round, integrated into velocities,
//! then each row resolves the resulting movements against its ordering and gap constraints (see
//! `blocks`). A node's velocity after a round is the movement it actually made, so a node pushed
//! against an obstacle loses its momentum instead of building it up.

use crate::error::{Error, Result};
use crate::estimate::Estimator;
use crate::graph::Graph;
use serde::{Deserialize, Serialize};

mod blocks;
mod compact;

pub use compact::compact_isolated;

/// Tolerance used for the per-round invariant check.
pub const INVARIANT_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverOptions {
    /// Spring constant of above/below relations.
    pub vertical_stiffness: f64,
    /// Spring constant of partner relations.
    pub partner_stiffness: f64,
    /// Spring stretch is divided by this to get an acceleration.
    pub stiffness_to_mass: f64,
    /// Velocity multiplier applied every round.
    pub damping: f64,
    /// Acceleration magnitude is capped at `max(acceleration_ratio * |v|, acceleration_floor)`.
    pub acceleration_ratio: f64,
    /// Smallest value the acceleration cap can take, so a node at rest can still start moving.
    pub acceleration_floor: f64,
    pub initial_max_velocity: f64,
    /// Factor applied to the velocity cap after `stall_rounds` rounds without a new best shift.
    pub velocity_decay: f64,
    /// Scaled shift under which a round counts as quiet.
    pub threshold: f64,
    /// Consecutive quiet rounds required to stop.
    pub quiet_rounds: usize,
    pub stall_rounds: usize,
    pub max_rounds: usize,
    /// Return the unsettled layout instead of [`Error::NotConverged`] when `max_rounds` runs out.
    pub allow_unconverged: bool,
    /// Pack isolated nodes against their neighbors once converged.
    pub compact_isolated: bool,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            vertical_stiffness: 1.0,
            partner_stiffness: 10.0,
            stiffness_to_mass: 1000.0,
            damping: 0.99,
            acceleration_ratio: 1.2,
            acceleration_floor: 10.0,
            initial_max_velocity: 1000.0,
            velocity_decay: 0.9,
            threshold: 0.001,
            quiet_rounds: 100,
            stall_rounds: 100,
            max_rounds: 200_000,
            allow_unconverged: false,
            compact_isolated: true,
        }
    }
}

impl SolverOptions {
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("vertical_stiffness", self.vertical_stiffness),
            ("partner_stiffness", self.partner_stiffness),
            ("stiffness_to_mass", self.stiffness_to_mass),
            ("acceleration_ratio", self.acceleration_ratio),
            ("acceleration_floor", self.acceleration_floor),
            ("initial_max_velocity", self.initial_max_velocity),
            ("threshold", self.threshold),
        ];
        for (name, v) in positive {
            if !(v.is_finite() && v > 0.0) {
                return Err(Error::InvalidOptions {
                    message: format!("`{name}` must be a positive finite number, got {v}"),
                });
            }
        }
        for (name, v) in [("damping", self.damping), ("velocity_decay", self.velocity_decay)] {
            if !(v.is_finite() && v > 0.0 && v <= 1.0) {
                return Err(Error::InvalidOptions {
                    message: format!("`{name}` must be in (0, 1], got {v}"),
                });
            }
        }
        if self.quiet_rounds == 0 || self.stall_rounds == 0 || self.max_rounds == 0 {
            return Err(Error::InvalidOptions {
                message: "`quiet_rounds`, `stall_rounds` and `max_rounds` must be at least 1"
                    .to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolveReport {
    pub rounds: usize,
    pub converged: bool,
    /// Scaled largest movement of the last round.
    pub final_shift: f64,
    /// Velocity cap at the end of the run.
    pub max_velocity: f64,
    /// Isolated nodes moved by compaction.
    pub compacted: usize,
    /// Largest distance between a node and its ideal position.
    pub residual: f64,
}

/// Multiplier for a round's largest movement.
///
/// Grows with the number of rows so that a quiet round means the accumulated misalignment from
/// the top row to the bottom row stays below one unit.
pub fn shift_factor(rows: usize) -> f64 {
    ((rows as f64 / 102.0) * 2048.0).max(1.0)
}

impl Graph {
    /// Runs the spring solver to convergence. See [`solve`].
    pub fn solve(&mut self, opts: &SolverOptions) -> Result<SolveReport> {
        solve(self, opts)
    }
}

/// Moves every node until the layout settles.
///
/// On [`Error::NotConverged`] the graph still satisfies every positional invariant; it just has
/// not settled yet. Compaction only runs on a converged layout.
pub fn solve(graph: &mut Graph, opts: &SolverOptions) -> Result<SolveReport> {
    opts.validate()?;
    let factor = shift_factor(graph.row_count());
    let mut est = Estimator::new();
    let mut desired = vec![0.0; graph.node_count()];

    let mut max_v = opts.initial_max_velocity;
    let mut best = f64::INFINITY;
    let mut stall = 0usize;
    let mut quiet = 0usize;
    let mut rounds = 0usize;
    let mut last_shift = 0.0;

    let mut converged = true;
    while graph.node_count() > 0 {
        if rounds == opts.max_rounds {
            tracing::debug!(rounds, last_shift, max_v, "spring solver hit the round cap");
            if !opts.allow_unconverged {
                return Err(Error::NotConverged { rounds, last_shift });
            }
            converged = false;
            break;
        }
        rounds += 1;

        let g: &Graph = graph;
        for node in g.nodes() {
            let force =
                est.spring_force(g, node.id(), opts.vertical_stiffness, opts.partner_stiffness);
            let limit = (opts.acceleration_ratio * node.velocity.abs())
                .max(opts.acceleration_floor);
            let accel = (force / opts.stiffness_to_mass).clamp(-limit, limit);
            let v = ((node.velocity + accel) * opts.damping).clamp(-max_v, max_v);
            desired[node.id().index()] = v;
        }

        let mut shift: f64 = 0.0;
        let mut block_count = 0usize;
        for r in 0..graph.row_count() {
            let ids = graph.row(r).to_vec();
            let current = graph.row_positions(r);
            let want: Vec<f64> = ids.iter().map(|id| desired[id.index()]).collect();
            let gaps = graph.row_gaps(r);
            let resolved = blocks::resolve_row(&current, &want, &gaps, 0.0);
            block_count += resolved.blocks;
            for (k, &id) in ids.iter().enumerate() {
                let moved = resolved.positions[k] - current[k];
                graph.node_mut(id).velocity = moved;
                shift = shift.max(moved.abs());
            }
            graph.set_row_positions(r, &resolved.positions);
        }
        graph.check_invariants(INVARIANT_TOLERANCE)?;

        let scaled = shift * factor;
        last_shift = scaled;
        tracing::trace!(
            round = rounds,
            shift = scaled,
            max_v,
            blocks = block_count,
            "spring round"
        );

        if scaled < opts.threshold {
            quiet += 1;
            if quiet >= opts.quiet_rounds {
                break;
            }
        } else {
            quiet = 0;
        }

        if scaled < best {
            best = scaled;
            stall = 0;
        } else {
            stall += 1;
            if stall >= opts.stall_rounds {
                max_v *= opts.velocity_decay;
                stall = 0;
                tracing::debug!(round = rounds, max_v, best, "no progress; lowering velocity cap");
            }
        }
    }

    graph.reset_velocities();

    let compacted = if converged && opts.compact_isolated {
        let moved = compact_isolated(graph);
        graph.check_invariants(INVARIANT_TOLERANCE)?;
        moved
    } else {
        0
    };

    let g: &Graph = graph;
    let residual = g
        .nodes()
        .iter()
        .map(|n| (est.ideal_position(g, n.id()) - n.position()).abs())
        .fold(0.0, f64::max);

    let (hits, misses) = est.cache_stats();
    tracing::debug!(
        rounds,
        shift = last_shift,
        max_v,
        compacted,
        residual,
        cache_hits = hits,
        cache_misses = misses,
        converged,
        "spring solver finished"
    );

    Ok(SolveReport {
        rounds,
        converged,
        final_shift: last_shift,
        max_velocity: max_v,
        compacted,
        residual,
    })
}
