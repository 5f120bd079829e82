//! Solution type for query results
//!
//! A `Solution` is a mapping from variable to bound term - the unit flowing
//! through every operator.
//!
//! # Invariants
//!
//! - A variable is either bound (present with a value) or unbound (absent);
//!   there is no explicit null-valued entry.
//! - Bindings are kept sorted by `VarId`, so equality and hashing are
//!   structural regardless of binding order.
//! - Solutions are immutable once handed to a downstream operator:
//!   `bind` and `merge` return new solutions (copy-on-extend).

use crate::term::Term;
use crate::var_registry::VarId;

/// A solution mapping variables to bound terms
///
/// Backed by a small vec sorted by `VarId`; query solutions typically bind a
/// handful of variables, so linear/binary scans beat a hash map here.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Solution {
    /// Bindings sorted by VarId, no duplicates
    bindings: Vec<(VarId, Term)>,
}

impl Solution {
    /// Create an empty solution (no variables bound)
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bound variables
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Check if no variables are bound
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Get the bound value for a variable, if any
    pub fn get(&self, var: VarId) -> Option<&Term> {
        self.bindings
            .binary_search_by_key(&var, |(v, _)| *v)
            .ok()
            .map(|idx| &self.bindings[idx].1)
    }

    /// Check if a variable is bound
    pub fn is_bound(&self, var: VarId) -> bool {
        self.get(var).is_some()
    }

    /// Return a new solution with `var` bound to `value` (copy-on-extend)
    ///
    /// Returns `None` if `var` is already bound to a *different* value;
    /// rebinding to an equal value returns the solution unchanged.
    #[must_use]
    pub fn bind(&self, var: VarId, value: Term) -> Option<Solution> {
        match self.bindings.binary_search_by_key(&var, |(v, _)| *v) {
            Ok(idx) => {
                if self.bindings[idx].1 == value {
                    Some(self.clone())
                } else {
                    None
                }
            }
            Err(idx) => {
                let mut bindings = self.bindings.clone();
                bindings.insert(idx, (var, value));
                Some(Solution { bindings })
            }
        }
    }

    /// Check compatibility: for every variable bound in both, values agree
    ///
    /// An unbound variable constrains nothing, so a variable bound on only
    /// one side never causes incompatibility.
    pub fn compatible(&self, other: &Solution) -> bool {
        // Both sides are sorted; walk them like a merge.
        let mut a = self.bindings.iter().peekable();
        let mut b = other.bindings.iter().peekable();
        while let (Some((va, ta)), Some((vb, tb))) = (a.peek(), b.peek()) {
            match va.cmp(vb) {
                std::cmp::Ordering::Less => {
                    a.next();
                }
                std::cmp::Ordering::Greater => {
                    b.next();
                }
                std::cmp::Ordering::Equal => {
                    if ta != tb {
                        return false;
                    }
                    a.next();
                    b.next();
                }
            }
        }
        true
    }

    /// Merge two compatible solutions into their union of bindings
    ///
    /// Returns `None` if the solutions disagree on a shared variable.
    #[must_use]
    pub fn merge(&self, other: &Solution) -> Option<Solution> {
        let mut bindings = Vec::with_capacity(self.bindings.len() + other.bindings.len());
        let mut a = self.bindings.iter().peekable();
        let mut b = other.bindings.iter().peekable();
        loop {
            match (a.peek(), b.peek()) {
                (Some((va, _)), Some((vb, _))) => match va.cmp(vb) {
                    std::cmp::Ordering::Less => bindings.push(a.next().unwrap().clone()),
                    std::cmp::Ordering::Greater => bindings.push(b.next().unwrap().clone()),
                    std::cmp::Ordering::Equal => {
                        let (v, ta) = a.next().unwrap();
                        let (_, tb) = b.next().unwrap();
                        if ta != tb {
                            return None;
                        }
                        bindings.push((*v, ta.clone()));
                    }
                },
                (Some(_), None) => bindings.push(a.next().unwrap().clone()),
                (None, Some(_)) => bindings.push(b.next().unwrap().clone()),
                (None, None) => break,
            }
        }
        Some(Solution { bindings })
    }

    /// Iterate over (VarId, Term) bindings in VarId order
    pub fn iter(&self) -> impl Iterator<Item = (VarId, &Term)> {
        self.bindings.iter().map(|(v, t)| (*v, t))
    }

    /// The bound variables, in VarId order
    pub fn variables(&self) -> impl Iterator<Item = VarId> + '_ {
        self.bindings.iter().map(|(v, _)| *v)
    }
}

impl FromIterator<(VarId, Term)> for Solution {
    fn from_iter<I: IntoIterator<Item = (VarId, Term)>>(iter: I) -> Self {
        let mut bindings: Vec<(VarId, Term)> = iter.into_iter().collect();
        bindings.sort_by_key(|(v, _)| *v);
        bindings.dedup_by(|a, b| a.0 == b.0);
        Solution { bindings }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sol(pairs: &[(u16, &str)]) -> Solution {
        pairs
            .iter()
            .map(|(v, t)| (VarId(*v), Term::literal(*t)))
            .collect()
    }

    #[test]
    fn test_bind_and_get() {
        let s = Solution::new();
        assert!(s.is_empty());
        assert!(!s.is_bound(VarId(0)));

        let s = s.bind(VarId(0), Term::literal("a")).unwrap();
        assert_eq!(s.get(VarId(0)), Some(&Term::literal("a")));
        assert!(s.is_bound(VarId(0)));
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn test_bind_conflict() {
        let s = Solution::new().bind(VarId(0), Term::literal("a")).unwrap();

        // Rebinding to an equal value is a no-op
        assert!(s.bind(VarId(0), Term::literal("a")).is_some());
        // Rebinding to a different value is rejected
        assert!(s.bind(VarId(0), Term::literal("b")).is_none());
    }

    #[test]
    fn test_bind_is_copy_on_extend() {
        let s1 = Solution::new().bind(VarId(0), Term::literal("a")).unwrap();
        let s2 = s1.bind(VarId(1), Term::literal("b")).unwrap();

        // Original is untouched
        assert_eq!(s1.len(), 1);
        assert!(!s1.is_bound(VarId(1)));
        assert_eq!(s2.len(), 2);
    }

    #[test]
    fn test_compatible() {
        let a = sol(&[(0, "x"), (1, "y")]);
        let b = sol(&[(1, "y"), (2, "z")]);
        let c = sol(&[(1, "other")]);
        let empty = Solution::new();

        assert!(a.compatible(&b));
        assert!(b.compatible(&a));
        assert!(!a.compatible(&c));
        // Unbound variables constrain nothing
        assert!(a.compatible(&empty));
        assert!(empty.compatible(&a));
    }

    #[test]
    fn test_merge() {
        let a = sol(&[(0, "x"), (1, "y")]);
        let b = sol(&[(1, "y"), (2, "z")]);

        let merged = a.merge(&b).unwrap();
        assert_eq!(merged.len(), 3);
        assert_eq!(merged.get(VarId(0)), Some(&Term::literal("x")));
        assert_eq!(merged.get(VarId(1)), Some(&Term::literal("y")));
        assert_eq!(merged.get(VarId(2)), Some(&Term::literal("z")));

        let c = sol(&[(1, "conflict")]);
        assert!(a.merge(&c).is_none());
    }

    #[test]
    fn test_equality_independent_of_insertion_order() {
        let a = Solution::new()
            .bind(VarId(0), Term::literal("x"))
            .unwrap()
            .bind(VarId(1), Term::literal("y"))
            .unwrap();
        let b = Solution::new()
            .bind(VarId(1), Term::literal("y"))
            .unwrap()
            .bind(VarId(0), Term::literal("x"))
            .unwrap();
        assert_eq!(a, b);

        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }
}
