#![forbid(unsafe_code)]

//! Horizontal alignment of ordered rows in a layered graph.
//!
//! Rows keep their left-to-right order; the solver only moves nodes sideways so that every node
//! sits close to its neighbors above, below and beside it while adjacent nodes keep a minimum gap.
//! The result is exported as per-node offsets for a renderer.
//!
//! ```
//! use rowalign::{AlignOptions, NodeDescriptor, align};
//!
//! let rows = vec![
//!     vec![NodeDescriptor::boxed().with_below([0])],
//!     vec![NodeDescriptor::boxed().with_above([0])],
//! ];
//! let out = align(&rows, &AlignOptions::default()).unwrap();
//! assert!(out.report.converged);
//! assert_eq!(out.rows.len(), 2);
//! ```

pub mod descriptor;
pub mod error;
pub mod estimate;
pub mod graph;
pub mod project;
pub mod solver;

pub use descriptor::{NodeDescriptor, NodeKind, parse_rows, parse_rows_str};
pub use error::{Error, Result};
pub use estimate::{Estimator, GroupMean};
pub use graph::{Graph, Node, NodeId, Relation};
pub use project::{Offset, ProjectOptions, project};
pub use solver::{SolveReport, SolverOptions, compact_isolated, shift_factor, solve};

use serde::{Deserialize, Serialize};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignOptions {
    pub solver: SolverOptions,
    pub project: ProjectOptions,
}

impl AlignOptions {
    pub fn validate(&self) -> Result<()> {
        self.solver.validate()?;
        self.project.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alignment {
    pub report: SolveReport,
    pub rows: Vec<Vec<Offset>>,
}

/// Builds, solves and projects in one call.
pub fn align(rows: &[Vec<NodeDescriptor>], opts: &AlignOptions) -> Result<Alignment> {
    Graph::new(rows)?.align(opts)
}

impl Graph {
    /// Solves in place and projects, leaving the solved positions readable on the graph.
    ///
    /// Options are checked before any node moves.
    pub fn align(&mut self, opts: &AlignOptions) -> Result<Alignment> {
        opts.validate()?;
        let report = self.solve(&opts.solver)?;
        Ok(Alignment {
            report,
            rows: project(self, &opts.project),
        })
    }
}
