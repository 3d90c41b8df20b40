/*
 * Copyright © 2024 Volodymyr Kadzhaia
 * Copyright © 2024 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::collections::{HashMap, HashSet};
use crate::network::{NodeId, RuleId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// Fed by the chain built from the earlier clauses.
    Left,
    /// Fed by the clause filter of the newly added clause.
    Right,
}

/// One half of a beta join. The two halves of a pair point at each other
/// through `sibling` and share the same continuation.
#[derive(Debug, Clone)]
pub struct JoinQueue {
    pub rule: RuleId,
    pub side: Side,
    join_keys: Vec<usize>,
    // Body clauses whose matches arrive on this side.
    clauses: Vec<usize>,
    pub(crate) sibling: Option<NodeId>,
    pub(crate) continuation: Option<NodeId>,
}

impl JoinQueue {
    pub fn new(rule: RuleId, side: Side, join_keys: Vec<usize>, clauses: Vec<usize>) -> Self {
        JoinQueue {
            rule,
            side,
            join_keys,
            clauses,
            sibling: None,
            continuation: None,
        }
    }

    pub fn join_keys(&self) -> &[usize] {
        &self.join_keys
    }

    pub fn clauses(&self) -> &[usize] {
        &self.clauses
    }

    pub fn sibling(&self) -> Option<NodeId> {
        self.sibling
    }

    pub fn continuation(&self) -> Option<NodeId> {
        self.continuation
    }
}

/// Per-step queue memories: the partial matches each queue has already
/// accepted while the current triple is being propagated. Cleared between
/// triples, so it never grows with the size of the fact base.
#[derive(Debug, Default)]
pub struct QueueMemory {
    accepted: HashMap<NodeId, HashSet<Vec<Option<u32>>>>,
}

impl QueueMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `bindings` as accepted by `node`. Returns false if the same
    /// partial match already went through that queue in this step.
    pub fn remember(&mut self, node: NodeId, bindings: &[Option<u32>]) -> bool {
        let seen = self.accepted.entry(node).or_default();
        if seen.contains(bindings) {
            return false;
        }
        seen.insert(bindings.to_vec());
        true
    }

    pub fn len(&self) -> usize {
        self.accepted.values().map(HashSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.accepted.clear();
    }
}
