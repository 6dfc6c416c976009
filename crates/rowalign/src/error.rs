use crate::graph::{NodeId, Relation};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("row {row} node {index}: {relation} index {target} is out of range (row has {len} nodes)")]
    IndexOutOfRange {
        row: usize,
        index: usize,
        relation: Relation,
        target: usize,
        len: usize,
    },

    #[error(
        "row {row} node {index}: {relation} reference to {target} is reciprocated {count} times (expected exactly once)"
    )]
    Unreciprocated {
        row: usize,
        index: usize,
        relation: Relation,
        target: usize,
        count: usize,
    },

    #[error("row {row} node {index} lists itself as a partner")]
    SelfPartner { row: usize, index: usize },

    #[error("row {row} node {index}: {relation} references a row that does not exist")]
    RelationBeyondEdge {
        row: usize,
        index: usize,
        relation: Relation,
    },

    #[error("malformed descriptor at {path}: {message}")]
    Malformed { path: String, message: String },

    #[error("descriptor at {path} is missing required field `{field}`")]
    MissingField { path: String, field: &'static str },

    #[error("node {node} reached a non-finite position ({position})")]
    NonFinitePosition { node: NodeId, position: f64 },

    #[error("node {node} reached a negative position ({position})")]
    NegativePosition { node: NodeId, position: f64 },

    #[error("row {row}: nodes {index} and {} are {gap} apart (need at least {required})", .index + 1)]
    GapViolation {
        row: usize,
        index: usize,
        gap: f64,
        required: f64,
    },

    #[error("layout did not converge within {rounds} rounds (last scaled shift {last_shift})")]
    NotConverged { rounds: usize, last_shift: f64 },

    #[error("invalid options: {message}")]
    InvalidOptions { message: String },
}

impl Error {
    /// Structural problems with the input; raised before any solving happens.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::IndexOutOfRange { .. }
                | Error::Unreciprocated { .. }
                | Error::SelfPartner { .. }
                | Error::RelationBeyondEdge { .. }
                | Error::Malformed { .. }
        )
    }

    pub fn is_missing_field(&self) -> bool {
        matches!(self, Error::MissingField { .. })
    }

    /// Internal invariant breaches in the solver. These indicate a defect, not bad input.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Error::NonFinitePosition { .. }
                | Error::NegativePosition { .. }
                | Error::GapViolation { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
