use super::Relation;
use crate::descriptor::NodeDescriptor;
use crate::error::{Error, Result};

/// Every reference must be in range and answered by exactly one reference back.
pub(super) fn validate(rows: &[Vec<NodeDescriptor>]) -> Result<()> {
    for (r, row) in rows.iter().enumerate() {
        for (i, desc) in row.iter().enumerate() {
            for relation in Relation::ALL {
                let targets = list(desc, relation);
                if targets.is_empty() {
                    continue;
                }
                let Some(target_row) = target_row(rows, r, relation) else {
                    return Err(Error::RelationBeyondEdge {
                        row: r,
                        index: i,
                        relation,
                    });
                };
                for &t in targets {
                    if relation == Relation::Partners && t == i {
                        return Err(Error::SelfPartner { row: r, index: i });
                    }
                    let Some(other) = target_row.get(t) else {
                        return Err(Error::IndexOutOfRange {
                            row: r,
                            index: i,
                            relation,
                            target: t,
                            len: target_row.len(),
                        });
                    };
                    let count = list(other, relation.reciprocal())
                        .iter()
                        .filter(|&&back| back == i)
                        .count();
                    if count != 1 {
                        return Err(Error::Unreciprocated {
                            row: r,
                            index: i,
                            relation,
                            target: t,
                            count,
                        });
                    }
                }
            }
        }
    }
    Ok(())
}

fn list(desc: &NodeDescriptor, relation: Relation) -> &[usize] {
    match relation {
        Relation::Above => &desc.above,
        Relation::Below => &desc.below,
        Relation::Partners => &desc.partners,
    }
}

fn target_row(
    rows: &[Vec<NodeDescriptor>],
    r: usize,
    relation: Relation,
) -> Option<&[NodeDescriptor]> {
    let tr = match relation {
        Relation::Above => r.checked_sub(1)?,
        Relation::Below => r + 1,
        Relation::Partners => r,
    };
    rows.get(tr).map(Vec::as_slice)
}
