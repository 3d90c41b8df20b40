/*
 * Copyright © 2024 Volodymyr Kadzhaia
 * Copyright © 2024 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Turns rule bodies into chains of clause filters joined pairwise by join
//! queues.

use std::collections::BTreeSet;
use log::debug;
use shared::rule::Rule;
use shared::terms::Term;
use crate::clause_index::ClauseIndex;
use crate::error::{ReteError, Result};
use crate::network::{ClauseFilter, JoinQueue, Network, NodeId, ReteNode, RuleId, Side, Terminal};
use crate::rule_store::RuleStore;

#[derive(Debug, Default)]
pub struct RuleCompiler {
    network: Network,
    clause_index: ClauseIndex,
    predicates_used: BTreeSet<u32>,
    wildcard_rule: bool,
}

impl RuleCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn clause_index(&self) -> &ClauseIndex {
        &self.clause_index
    }

    pub fn is_wildcard_rule(&self) -> bool {
        self.wildcard_rule
    }

    /// Compiles one rule body and returns the last node of its chain, the one
    /// a terminal should hang off. Axioms produce no chain.
    pub fn compile_rule(&mut self, rule_id: RuleId, rule: &Rule) -> Result<Option<NodeId>> {
        check_rule(rule)?;

        let num_vars = rule.num_vars;
        let mut seen_var = vec![false; num_vars];
        let mut prior: Option<NodeId> = None;

        for (i, clause) in rule.body.iter().enumerate() {
            let mut clause_vars = Vec::with_capacity(3);
            let filter = ClauseFilter::compile(rule_id, i, clause, num_vars, &mut clause_vars);
            let filter_id = self.network.push(ReteNode::Filter(filter));

            match clause.predicate {
                Term::Constant(predicate) => {
                    self.clause_index.insert(predicate, filter_id);
                    if !self.wildcard_rule {
                        self.predicates_used.insert(predicate);
                    }
                }
                Term::Variable(_) | Term::Wildcard => {
                    self.clause_index.insert_wildcard(filter_id);
                    self.wildcard_rule = true;
                }
            }

            // Variables bound by an earlier clause must be cross matched.
            let mut match_indices = Vec::new();
            for v in clause_vars {
                if seen_var[v] {
                    match_indices.push(v);
                }
                seen_var[v] = true;
            }

            prior = Some(match prior {
                None => filter_id,
                Some(previous) => {
                    let left = self.network.push(ReteNode::Queue(JoinQueue::new(
                        rule_id,
                        Side::Left,
                        match_indices.clone(),
                        (0..i).collect(),
                    )));
                    let right = self.network.push(ReteNode::Queue(JoinQueue::new(
                        rule_id,
                        Side::Right,
                        match_indices,
                        vec![i],
                    )));
                    self.network.pair_queues(left, right)?;
                    self.network.set_continuation(filter_id, right)?;
                    self.network.set_continuation(previous, left)?;
                    left
                }
            });
        }

        Ok(prior)
    }

    /// Compiles a rule and closes its chain with a terminal.
    pub fn add_rule(&mut self, rule_id: RuleId, rule: &Rule) -> Result<Option<NodeId>> {
        let Some(last) = self.compile_rule(rule_id, rule)? else {
            return Ok(None);
        };
        let terminal = self.network.push(ReteNode::Terminal(Terminal::new(rule_id)));
        self.network.set_continuation(last, terminal)?;
        Ok(Some(terminal))
    }

    /// Compiles every rule into a shareable store. Backward rules are skipped
    /// when `ignore_backward_rules` is set; axioms are kept in the rule list
    /// but have no chain.
    pub fn compile(rules: Vec<Rule>, ignore_backward_rules: bool) -> Result<RuleStore> {
        let mut compiler = RuleCompiler::new();
        for (rule_id, rule) in rules.iter().enumerate() {
            if ignore_backward_rules && rule.is_backward() {
                continue;
            }
            compiler.add_rule(rule_id, rule)?;
        }
        debug!(
            "Compiled {} rules into {} nodes ({} clause index entries, wildcard: {})",
            rules.len(),
            compiler.network.len(),
            compiler.clause_index.len(),
            compiler.wildcard_rule
        );
        Ok(compiler.finish(rules, ignore_backward_rules))
    }

    pub fn finish(self, rules: Vec<Rule>, ignore_backward_rules: bool) -> RuleStore {
        let predicates_used = if self.wildcard_rule { None } else { Some(self.predicates_used) };
        RuleStore::new(
            rules,
            self.network,
            self.clause_index,
            predicates_used,
            self.wildcard_rule,
            ignore_backward_rules,
        )
    }
}

/// Configuration errors that must stop compilation.
fn check_rule(rule: &Rule) -> Result<()> {
    rule.validate()?;
    if let Some(&index) = rule.unbound_head_variables().first() {
        return Err(ReteError::UnboundHeadVariable {
            rule: rule.display_name().to_string(),
            index,
        });
    }
    if rule.has_wildcard_in_head() {
        return Err(ReteError::WildcardInHead {
            rule: rule.display_name().to_string(),
        });
    }
    Ok(())
}
