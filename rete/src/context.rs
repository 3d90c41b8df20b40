/*
 * Copyright © 2024 Volodymyr Kadzhaia
 * Copyright © 2024 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::collections::{HashSet, VecDeque};
use shared::triple::Triple;
use crate::network::{QueueMemory, RuleId};

/// State of one propagation run: the worklist of triples still to push
/// through the network and the per-triple scratch (rules already counted,
/// queue memories).
///
/// A context lives for a single `add`, bootstrap or axiom pass. Deletions do
/// not go through it; `ReteEngine::delete` acts on the deduction graph
/// directly since no rule can retract a fact mid-run.
#[derive(Debug, Default)]
pub struct RuleContext {
    adds: VecDeque<Triple>,
    fired: HashSet<RuleId>,
    memory: QueueMemory,
}

impl RuleContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_triple(&mut self, triple: Triple) {
        self.adds.push_back(triple);
    }

    /// Pops the next worklist triple and resets the per-triple scratch.
    pub fn next_triple(&mut self) -> Option<Triple> {
        self.fired.clear();
        self.memory.clear();
        self.adds.pop_front()
    }

    /// Marks `rule` as fired for the current triple. Returns false if it had
    /// already fired.
    pub fn mark_fired(&mut self, rule: RuleId) -> bool {
        self.fired.insert(rule)
    }

    pub fn pending_adds(&self) -> usize {
        self.adds.len()
    }

    pub fn memory_mut(&mut self) -> &mut QueueMemory {
        &mut self.memory
    }
}
