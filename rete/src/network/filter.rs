/*
 * Copyright © 2024 Volodymyr Kadzhaia
 * Copyright © 2024 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use shared::terms::{Position, TriplePattern};
use shared::triple::Triple;
use crate::binding::BindingEnvironment;
use crate::network::{NodeId, RuleId};

/// Alpha node: tests one body clause against one incoming triple.
#[derive(Debug, Clone)]
pub struct ClauseFilter {
    pub rule: RuleId,
    pub clause: usize,
    num_vars: usize,
    // Checked before any variable is bound so mismatches are rejected early.
    constants: Vec<(Position, u32)>,
    variables: Vec<(Position, usize)>,
    pub(crate) continuation: Option<NodeId>,
}

impl ClauseFilter {
    /// Builds the filter for `pattern` and appends the distinct variables it
    /// binds to `clause_vars`, in slot order.
    pub fn compile(
        rule: RuleId,
        clause: usize,
        pattern: &TriplePattern,
        num_vars: usize,
        clause_vars: &mut Vec<usize>,
    ) -> Self {
        // The predicate was already selected through the clause index, so the
        // subject and object constants are the ones worth testing first.
        let mut constants: Vec<(Position, u32)> = pattern.constants().collect();
        constants.sort_by_key(|(pos, _)| *pos == Position::Predicate);

        let variables: Vec<(Position, usize)> = pattern.variables().collect();
        for &(_, v) in &variables {
            if !clause_vars.contains(&v) {
                clause_vars.push(v);
            }
        }

        ClauseFilter {
            rule,
            clause,
            num_vars,
            constants,
            variables,
            continuation: None,
        }
    }

    pub fn continuation(&self) -> Option<NodeId> {
        self.continuation
    }

    /// Returns the bindings produced by matching `triple`, or `None` if any
    /// constant differs or a repeated variable sees two different values.
    pub fn test(&self, triple: &Triple) -> Option<BindingEnvironment> {
        if self.constants.iter().any(|&(pos, c)| pos.of(triple) != c) {
            return None;
        }
        let mut env = BindingEnvironment::new(self.num_vars);
        for &(pos, v) in &self.variables {
            if !env.bind(v, pos.of(triple)) {
                return None;
            }
        }
        env.commit();
        Some(env)
    }
}
