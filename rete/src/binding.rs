/*
 * Copyright © 2024 Volodymyr Kadzhaia
 * Copyright © 2024 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Per-rule variable bindings with trail-based backtracking.
//!
//! Every successful [`BindingEnvironment::bind`] of a previously unbound slot
//! is pushed on a trail. [`BindingEnvironment::snapshot`] records the trail
//! height and [`BindingEnvironment::restore`] unbinds exactly the slots bound
//! since that snapshot, leaving earlier bindings untouched.

use shared::terms::{Position, Term, TriplePattern};
use shared::triple::Triple;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingEnvironment {
    values: Vec<Option<u32>>,
    trail: Vec<usize>,
}

impl BindingEnvironment {
    pub fn new(num_vars: usize) -> Self {
        BindingEnvironment {
            values: vec![None; num_vars],
            trail: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<u32> {
        self.values.get(index).copied().flatten()
    }

    pub fn values(&self) -> &[Option<u32>] {
        &self.values
    }

    /// Binds an unbound slot, or checks an already bound one for equality.
    /// Out-of-range ordinals never match.
    pub fn bind(&mut self, index: usize, value: u32) -> bool {
        match self.values.get_mut(index) {
            Some(Some(bound)) => *bound == value,
            Some(slot) => {
                *slot = Some(value);
                self.trail.push(index);
                true
            }
            None => false,
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot(self.trail.len())
    }

    pub fn restore(&mut self, snapshot: Snapshot) {
        while self.trail.len() > snapshot.0 {
            if let Some(index) = self.trail.pop() {
                self.values[index] = None;
            }
        }
    }

    /// Value of a pattern slot under the current bindings, or `None` if the
    /// slot is still open.
    pub fn resolve(&self, term: &Term) -> Option<u32> {
        match term {
            Term::Constant(c) => Some(*c),
            Term::Variable(i) => self.get(*i),
            Term::Wildcard => None,
        }
    }

    /// Matches `triple` against `pattern`, extending the bindings. On failure
    /// the environment may be partially extended; callers restore a snapshot.
    pub fn unify(&mut self, pattern: &TriplePattern, triple: &Triple) -> bool {
        for pos in Position::ALL {
            let value = pos.of(triple);
            let ok = match pattern.term(pos) {
                Term::Constant(c) => *c == value,
                Term::Variable(i) => self.bind(*i, value),
                Term::Wildcard => true,
            };
            if !ok {
                return false;
            }
        }
        true
    }

    /// Copies every slot bound in `other` into `self` after checking that the
    /// two agree on `join_keys`. Returns false, leaving `self` unchanged, on a
    /// join-key mismatch or a conflicting non-key slot.
    pub fn merge(&mut self, other: &BindingEnvironment, join_keys: &[usize]) -> bool {
        for &key in join_keys {
            match (self.get(key), other.get(key)) {
                (Some(a), Some(b)) if a == b => {}
                _ => return false,
            }
        }
        let mark = self.snapshot();
        for (index, value) in other.values.iter().enumerate() {
            if let Some(value) = value {
                if !self.bind(index, *value) {
                    self.restore(mark);
                    return false;
                }
            }
        }
        true
    }

    /// Drops the trail; subsequent snapshots start from the current bindings.
    pub fn commit(&mut self) {
        self.trail.clear();
    }
}
