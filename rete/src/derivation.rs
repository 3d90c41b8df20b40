/*
 * Copyright © 2024 Volodymyr Kadzhaia
 * Copyright © 2024 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::collections::HashMap;
use shared::triple::Triple;
use crate::network::RuleId;

/// Why a deduced triple is in the deduction graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Derivation {
    pub rule: RuleId,
    pub rule_name: String,
    pub conclusion: Triple,
    /// The worklist triple being processed when the rule fired; `None` for
    /// axioms.
    pub trigger: Option<Triple>,
    pub bindings: Vec<Option<u32>>,
}

/// Derivations in the order they were recorded, indexed by conclusion.
#[derive(Debug, Default)]
pub struct DerivationLog {
    records: Vec<Derivation>,
    by_conclusion: HashMap<Triple, Vec<usize>>,
}

impl DerivationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, derivation: Derivation) {
        self.by_conclusion
            .entry(derivation.conclusion)
            .or_default()
            .push(self.records.len());
        self.records.push(derivation);
    }

    pub fn all(&self) -> &[Derivation] {
        &self.records
    }

    pub fn for_conclusion(&self, triple: &Triple) -> Vec<&Derivation> {
        self.by_conclusion
            .get(triple)
            .map(|ids| ids.iter().map(|&i| &self.records[i]).collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
