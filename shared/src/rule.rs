/*
 * Copyright © 2024 Volodymyr Kadzhaia
 * Copyright © 2024 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use serde::{Serialize, Deserialize};
use crate::terms::{Term, TriplePattern};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    Forward,
    /// Written as `head <- body`; meant for a backward engine.
    Backward,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RuleError {
    #[error("rule {rule}: variable ?{index} is out of range (rule declares {num_vars} variables)")]
    VariableOutOfRange {
        rule: String,
        index: usize,
        num_vars: usize,
    },
}

/// A forward rule: when every `body` pattern matches, every `head` pattern is
/// asserted. A rule with an empty body is an axiom.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub name: Option<String>,
    pub body: Vec<TriplePattern>,
    pub head: Vec<TriplePattern>,
    pub num_vars: usize,
    pub direction: Direction,
}

impl Rule {
    /// Builds a forward rule, sizing the binding environment from the highest
    /// variable ordinal used.
    pub fn new(body: Vec<TriplePattern>, head: Vec<TriplePattern>) -> Self {
        let num_vars = body
            .iter()
            .chain(head.iter())
            .flat_map(|p| p.variables().map(|(_, v)| v + 1))
            .max()
            .unwrap_or(0);
        Rule {
            name: None,
            body,
            head,
            num_vars,
            direction: Direction::Forward,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn backward(mut self) -> Self {
        self.direction = Direction::Backward;
        self
    }

    pub fn axiom(head: Vec<TriplePattern>) -> Self {
        Rule::new(Vec::new(), head)
    }

    pub fn body_len(&self) -> usize {
        self.body.len()
    }

    pub fn body_element(&self, index: usize) -> Option<&TriplePattern> {
        self.body.get(index)
    }

    pub fn is_axiom(&self) -> bool {
        self.body.is_empty()
    }

    pub fn is_backward(&self) -> bool {
        self.direction == Direction::Backward
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<anonymous>")
    }

    /// Checks every variable ordinal in body and head against `num_vars`.
    pub fn validate(&self) -> Result<(), RuleError> {
        for pattern in self.body.iter().chain(self.head.iter()) {
            for (_, index) in pattern.variables() {
                if index >= self.num_vars {
                    return Err(RuleError::VariableOutOfRange {
                        rule: self.display_name().to_string(),
                        index,
                        num_vars: self.num_vars,
                    });
                }
            }
        }
        Ok(())
    }

    /// Head variables that no body clause binds.
    pub fn unbound_head_variables(&self) -> Vec<usize> {
        let mut bound = vec![false; self.num_vars];
        for (_, v) in self.body.iter().flat_map(|p| p.variables()) {
            if let Some(slot) = bound.get_mut(v) {
                *slot = true;
            }
        }
        let mut unbound: Vec<usize> = self
            .head
            .iter()
            .flat_map(|p| p.variables())
            .map(|(_, v)| v)
            .filter(|v| !bound.get(*v).copied().unwrap_or(false))
            .collect();
        unbound.sort_unstable();
        unbound.dedup();
        unbound
    }

    pub fn has_wildcard_in_head(&self) -> bool {
        self.head.iter().any(|p| {
            matches!(p.subject, Term::Wildcard)
                || matches!(p.predicate, Term::Wildcard)
                || matches!(p.object, Term::Wildcard)
        })
    }
}
