//! Ordered-merge set operations over canonically sorted entry lists.

use meshdex_commons::MembershipEntry;
use std::cmp::Ordering;

/// Index membership changes needed to move an object from its observed
/// forward record to the desired one.
///
/// Equality is full-entry equality, so changing only the payload of an index
/// shows up as one removal plus one insertion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipDelta {
    /// `desired − observed`
    pub to_insert: Vec<MembershipEntry>,
    /// `observed − desired`
    pub to_remove: Vec<MembershipEntry>,
}

impl MembershipDelta {
    /// Symmetric difference of two canonically sorted, duplicate-free lists in
    /// one linear pass.
    pub fn compute(desired: &[MembershipEntry], observed: &[MembershipEntry]) -> Self {
        let mut to_insert = Vec::new();
        let mut to_remove = Vec::new();
        let (mut i, mut j) = (0, 0);

        while i < desired.len() && j < observed.len() {
            match desired[i].cmp(&observed[j]) {
                Ordering::Less => {
                    to_insert.push(desired[i].clone());
                    i += 1;
                }
                Ordering::Greater => {
                    to_remove.push(observed[j].clone());
                    j += 1;
                }
                Ordering::Equal => {
                    i += 1;
                    j += 1;
                }
            }
        }
        to_insert.extend_from_slice(&desired[i..]);
        to_remove.extend_from_slice(&observed[j..]);

        Self {
            to_insert,
            to_remove,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.to_insert.is_empty() && self.to_remove.is_empty()
    }

    /// Number of reverse-record mutations this delta needs.
    pub fn len(&self) -> usize {
        self.to_insert.len() + self.to_remove.len()
    }
}

/// Entries present in both canonically sorted lists.
pub fn intersect_sorted(a: &[MembershipEntry], b: &[MembershipEntry]) -> Vec<MembershipEntry> {
    let mut out = Vec::with_capacity(a.len().min(b.len()));
    let (mut i, mut j) = (0, 0);

    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                out.push(a[i].clone());
                i += 1;
                j += 1;
            }
        }
    }
    out
}
