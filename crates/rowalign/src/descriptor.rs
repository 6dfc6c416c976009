//! Input descriptors.
//!
//! A graph is described as an array of rows, each an array of node descriptors. Neighbor lists are
//! indices into the adjacent row (`above`/`below`) or the node's own row (`partners`), as the rows
//! exist at construction time.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// A wide box (a person card).
    Box,
    /// A narrow connection point.
    Point,
}

impl NodeKind {
    /// Half of the minimum gap this node keeps to each row neighbor.
    pub fn buffer(self) -> f64 {
        match self {
            NodeKind::Box => 2.5,
            NodeKind::Point => 0.5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Box => "box",
            NodeKind::Point => "point",
        }
    }
}

impl std::str::FromStr for NodeKind {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "box" => Ok(Self::Box),
            "point" => Ok(Self::Point),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDescriptor {
    pub kind: NodeKind,
    #[serde(default)]
    pub above: Vec<usize>,
    #[serde(default)]
    pub below: Vec<usize>,
    #[serde(default)]
    pub partners: Vec<usize>,
}

impl NodeDescriptor {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            above: Vec::new(),
            below: Vec::new(),
            partners: Vec::new(),
        }
    }

    pub fn boxed() -> Self {
        Self::new(NodeKind::Box)
    }

    pub fn point() -> Self {
        Self::new(NodeKind::Point)
    }

    pub fn with_above(mut self, above: impl IntoIterator<Item = usize>) -> Self {
        self.above.extend(above);
        self
    }

    pub fn with_below(mut self, below: impl IntoIterator<Item = usize>) -> Self {
        self.below.extend(below);
        self
    }

    pub fn with_partners(mut self, partners: impl IntoIterator<Item = usize>) -> Self {
        self.partners.extend(partners);
        self
    }
}

pub fn parse_rows_str(text: &str) -> Result<Vec<Vec<NodeDescriptor>>> {
    let value: Value = serde_json::from_str(text).map_err(|err| Error::Malformed {
        path: "$".to_string(),
        message: err.to_string(),
    })?;
    parse_rows(&value)
}

/// Parses a JSON array of rows.
///
/// Unlike a plain `serde_json::from_value`, this reports which descriptor is at fault and keeps a
/// missing `kind` distinct from a value of the wrong shape.
pub fn parse_rows(value: &Value) -> Result<Vec<Vec<NodeDescriptor>>> {
    let rows = value.as_array().ok_or_else(|| Error::Malformed {
        path: "$".to_string(),
        message: "expected an array of rows".to_string(),
    })?;

    let mut out = Vec::with_capacity(rows.len());
    for (r, row) in rows.iter().enumerate() {
        let nodes = row.as_array().ok_or_else(|| Error::Malformed {
            path: format!("$[{r}]"),
            message: "expected an array of node descriptors".to_string(),
        })?;
        let mut parsed = Vec::with_capacity(nodes.len());
        for (i, node) in nodes.iter().enumerate() {
            parsed.push(parse_node(node, &format!("$[{r}][{i}]"))?);
        }
        out.push(parsed);
    }
    Ok(out)
}

fn parse_node(value: &Value, path: &str) -> Result<NodeDescriptor> {
    let obj = value.as_object().ok_or_else(|| Error::Malformed {
        path: path.to_string(),
        message: "expected an object".to_string(),
    })?;

    let kind = match obj.get("kind") {
        None | Some(Value::Null) => {
            return Err(Error::MissingField {
                path: path.to_string(),
                field: "kind",
            });
        }
        Some(Value::String(s)) => s.parse::<NodeKind>().map_err(|_| Error::Malformed {
            path: format!("{path}.kind"),
            message: format!("unknown node kind `{s}` (expected `box` or `point`)"),
        })?,
        Some(_) => {
            return Err(Error::Malformed {
                path: format!("{path}.kind"),
                message: "expected a string".to_string(),
            });
        }
    };

    Ok(NodeDescriptor {
        kind,
        above: parse_indices(obj.get("above"), path, "above")?,
        below: parse_indices(obj.get("below"), path, "below")?,
        partners: parse_indices(obj.get("partners"), path, "partners")?,
    })
}

fn parse_indices(value: Option<&Value>, path: &str, field: &str) -> Result<Vec<usize>> {
    let Some(value) = value else {
        return Ok(Vec::new());
    };
    if value.is_null() {
        return Ok(Vec::new());
    }
    let items = value.as_array().ok_or_else(|| Error::Malformed {
        path: format!("{path}.{field}"),
        message: "expected an array of indices".to_string(),
    })?;
    items
        .iter()
        .enumerate()
        .map(|(k, v)| {
            v.as_u64()
                .and_then(|n| usize::try_from(n).ok())
                .ok_or_else(|| Error::Malformed {
                    path: format!("{path}.{field}[{k}]"),
                    message: format!("expected a nonnegative integer, got {v}"),
                })
        })
        .collect()
}
