/*
 * Copyright © 2024 Volodymyr Kadzhaia
 * Copyright © 2024 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::collections::BTreeSet;
use shared::rule::Rule;
use crate::clause_index::ClauseIndex;
use crate::compiler::RuleCompiler;
use crate::error::Result;
use crate::network::{Network, RuleId};

/// A compiled rule set: the rules, their network, the clause index, the
/// predicates the bodies use and whether any body clause has a variable
/// predicate. Immutable once built, so engines over the same rules can share
/// one behind an `Arc`.
#[derive(Debug, Clone)]
pub struct RuleStore {
    rules: Vec<Rule>,
    network: Network,
    clause_index: ClauseIndex,
    predicates_used: Option<BTreeSet<u32>>,
    wildcard_rule: bool,
    ignore_backward_rules: bool,
}

impl RuleStore {
    pub(crate) fn new(
        rules: Vec<Rule>,
        network: Network,
        clause_index: ClauseIndex,
        predicates_used: Option<BTreeSet<u32>>,
        wildcard_rule: bool,
        ignore_backward_rules: bool,
    ) -> Self {
        RuleStore {
            rules,
            network,
            clause_index,
            predicates_used,
            wildcard_rule,
            ignore_backward_rules,
        }
    }

    pub fn compile(rules: Vec<Rule>, ignore_backward_rules: bool) -> Result<Self> {
        RuleCompiler::compile(rules, ignore_backward_rules)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn rule(&self, id: RuleId) -> Option<&Rule> {
        self.rules.get(id)
    }

    /// Rules the engine treats as active under this store's backward-rule
    /// setting, with their ids.
    pub fn active_rules(&self) -> impl Iterator<Item = (RuleId, &Rule)> {
        let skip_backward = self.ignore_backward_rules;
        self.rules
            .iter()
            .enumerate()
            .filter(move |(_, rule)| !(skip_backward && rule.is_backward()))
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn clause_index(&self) -> &ClauseIndex {
        &self.clause_index
    }

    /// Predicates appearing in some body clause, or `None` when a wildcard
    /// rule makes every predicate relevant.
    pub fn predicates_used(&self) -> Option<&BTreeSet<u32>> {
        self.predicates_used.as_ref()
    }

    pub fn is_wildcard_rule(&self) -> bool {
        self.wildcard_rule
    }

    pub fn ignores_backward_rules(&self) -> bool {
        self.ignore_backward_rules
    }
}
