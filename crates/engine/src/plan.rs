//! Predicate-to-index compilation
//!
//! [`candidates`] walks a negation-normal-form predicate and computes a rid
//! set from the per-attribute indices:
//!
//! - `==` → point lookup, `<` `<=` `>` `>=` → range scan, membership →
//!   bucket union, `!=` → everything in the index minus the point bucket
//! - `And` intersects child sets, `Or` unions them
//!
//! Leaves the indices cannot answer — deep attribute chains, negated
//! membership, and `== null` (which must match records *lacking* the
//! attribute, which no index bucket holds) — contribute the full rid set
//! and mark the result inexact. An inexact result over-approximates: the
//! executor re-evaluates the full predicate against each candidate, and
//! exact results skip that residual pass entirely.

use crate::store::StoreState;
use lode_core::{CmpOp, Predicate, Rid};
use rustc_hash::FxHashSet;
use std::ops::Bound;

/// Candidate rid set plus whether it is exactly the matching set
pub(crate) struct Candidates {
    pub rids: FxHashSet<Rid>,
    /// When false, the set over-approximates and the full predicate must be
    /// re-evaluated per candidate
    pub exact: bool,
}

impl Candidates {
    fn exact(rids: FxHashSet<Rid>) -> Self {
        Candidates { rids, exact: true }
    }

    fn residual(state: &StoreState) -> Self {
        Candidates {
            rids: state.all_rids(),
            exact: false,
        }
    }
}

/// Compute the candidate rid set for a normalized predicate
pub(crate) fn candidates(pred: &Predicate, state: &StoreState) -> Candidates {
    match pred {
        Predicate::True => Candidates::exact(state.all_rids()),
        Predicate::False => Candidates::exact(FxHashSet::default()),

        Predicate::And(lhs, rhs) => {
            let a = candidates(lhs, state);
            // An empty left side decides the conjunction outright.
            if a.rids.is_empty() && a.exact {
                return a;
            }
            let b = candidates(rhs, state);
            let (small, large) = if a.rids.len() <= b.rids.len() {
                (&a.rids, &b.rids)
            } else {
                (&b.rids, &a.rids)
            };
            let rids = small.iter().filter(|r| large.contains(*r)).cloned().collect();
            Candidates {
                rids,
                exact: a.exact && b.exact,
            }
        }

        Predicate::Or(lhs, rhs) => {
            let mut a = candidates(lhs, state);
            let b = candidates(rhs, state);
            a.rids.extend(b.rids);
            Candidates {
                rids: a.rids,
                exact: a.exact && b.exact,
            }
        }

        // Post-normalization the only surviving negation wraps Member,
        // which has no index form.
        Predicate::Not(_) => Candidates::residual(state),

        Predicate::Compare { path, op, value } => {
            let Some(attr) = path.as_attr() else {
                // Deep chains are not index-assisted.
                return Candidates::residual(state);
            };
            if *op == CmpOp::Eq && value.is_null() {
                // `attr == null` also matches records lacking the attribute,
                // which no bucket of the index holds.
                return Candidates::residual(state);
            }
            let Some(index) = state.indexer.index(attr) else {
                // No record carries the attribute: nothing can match any
                // comparison that requires presence.
                return Candidates::exact(FxHashSet::default());
            };
            let rids = match op {
                CmpOp::Eq => index.point(value),
                CmpOp::Ne => index.all_except(value),
                CmpOp::Lt => index.range(Bound::Unbounded, Bound::Excluded(value)),
                CmpOp::Le => index.range(Bound::Unbounded, Bound::Included(value)),
                CmpOp::Gt => index.range(Bound::Excluded(value), Bound::Unbounded),
                CmpOp::Ge => index.range(Bound::Included(value), Bound::Unbounded),
            };
            Candidates::exact(rids)
        }

        Predicate::Member { path, values } => {
            let Some(attr) = path.as_attr() else {
                return Candidates::residual(state);
            };
            let Some(index) = state.indexer.index(attr) else {
                return Candidates::exact(FxHashSet::default());
            };
            Candidates::exact(index.membership(values.iter()))
        }
    }
}
