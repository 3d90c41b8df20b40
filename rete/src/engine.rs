/*
 * Copyright © 2024 Volodymyr Kadzhaia
 * Copyright © 2024 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Incremental forward-chaining engine.
//!
//! The engine owns its inference graph and a compiled [`RuleStore`]. Facts
//! are pushed through the network one at a time from a worklist; every fact
//! a rule head produces that is not already known goes into the deduction
//! graph and back onto the worklist, until nothing new comes out.
//!
//! [`ReteEngine::add`] stores the fact it is given in the raw graph unless it
//! is already known, so that later facts can join against it and joins which
//! need the fact twice (e.g. `(?a p ?b) (?b p ?c)` over `(x p x)`) find it.

use std::sync::Arc;
use log::{debug, trace, warn};
use shared::graph::{TripleSink, TripleSource};
use shared::rule::Rule;
use shared::triple::Triple;
use crate::binding::BindingEnvironment;
use crate::config::EngineConfig;
use crate::context::RuleContext;
use crate::derivation::{Derivation, DerivationLog};
use crate::error::{ReteError, Result};
use crate::graph::ForwardInfGraph;
use crate::network::{Activation, Propagation, Terminal};
use crate::rule_store::RuleStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Uninitialized,
    AxiomsProcessed,
    Ready,
}

pub struct ReteEngine<G: ForwardInfGraph> {
    graph: G,
    // Kept until the first `init` compiles them.
    rules: Vec<Rule>,
    store: Option<Arc<RuleStore>>,
    config: EngineConfig,
    state: EngineState,
    n_rules_fired: u64,
    n_axiom_rules_fired: Option<u64>,
    processed_axioms: bool,
    record_derivations: bool,
    derivations: DerivationLog,
}

impl<G: ForwardInfGraph> ReteEngine<G> {
    pub fn new(graph: G, rules: Vec<Rule>, config: EngineConfig) -> Self {
        ReteEngine {
            graph,
            rules,
            store: None,
            record_derivations: config.record_derivations,
            config,
            state: EngineState::Uninitialized,
            n_rules_fired: 0,
            n_axiom_rules_fired: None,
            processed_axioms: false,
            derivations: DerivationLog::new(),
        }
    }

    /// An engine that reuses an already compiled rule store.
    pub fn with_rule_store(graph: G, store: Arc<RuleStore>, config: EngineConfig) -> Self {
        let mut engine = ReteEngine::new(graph, Vec::new(), config);
        engine.store = Some(store);
        engine
    }

    // Bootstrap

    /// Compiles the rules if no store is installed yet, asserts the axioms,
    /// then loads the existing raw facts. On failure the engine is left
    /// `Uninitialized`.
    pub fn init(&mut self, ignore_backward_rules: bool) -> Result<()> {
        let result = self.bootstrap(ignore_backward_rules);
        if result.is_err() {
            self.state = EngineState::Uninitialized;
            self.processed_axioms = false;
        }
        result
    }

    /// `init` with the configured backward-rule setting.
    pub fn init_default(&mut self) -> Result<()> {
        self.init(self.config.ignore_backward_rules)
    }

    fn bootstrap(&mut self, ignore_backward_rules: bool) -> Result<()> {
        if self.store.is_none() {
            let store = RuleStore::compile(self.rules.clone(), ignore_backward_rules)?;
            self.store = Some(Arc::new(store));
        }
        self.find_and_process_axioms()?;
        let fired = self.n_rules_fired;
        let axiom_rules_fired = *self.n_axiom_rules_fired.get_or_insert(fired);
        debug!("Axioms fired {} rules", axiom_rules_fired);
        self.fast_init()
    }

    /// Loads the raw graph into the network. Assumes the rule store is
    /// installed and the axioms were already processed, for instance by the
    /// engine the store was taken from.
    pub fn fast_init(&mut self) -> Result<()> {
        let store = self.store()?;
        let Some(raw) = self.graph.raw_graph() else {
            self.state = EngineState::Ready;
            return Ok(());
        };

        let mut context = RuleContext::new();
        match store.predicates_used() {
            None => {
                for t in raw.find(None, None, None)? {
                    context.add_triple(t);
                }
            }
            Some(predicates) => {
                for &predicate in predicates {
                    for t in raw.find(None, Some(predicate), None)? {
                        context.add_triple(t);
                    }
                }
            }
        }
        debug!(
            "Bootstrap scan queued {} raw triples (wildcard: {})",
            context.pending_adds(),
            store.is_wildcard_rule()
        );

        self.add_set(&store, &mut context)?;
        self.state = EngineState::Ready;
        Ok(())
    }

    /// Asserts every axiom head into the deduction graph and runs closure
    /// over them. Each axiom counts as one firing.
    fn find_and_process_axioms(&mut self) -> Result<()> {
        let store = self.store()?;
        let mut context = RuleContext::new();
        for (id, rule) in store.active_rules().filter(|(_, rule)| rule.is_axiom()) {
            let env = BindingEnvironment::new(rule.num_vars);
            let heads = Terminal::new(id).instantiate(rule, &env)?;
            self.n_rules_fired += 1;
            for t in heads {
                let added = self.graph.deductions_graph_mut().add(&t)?;
                if added && self.record_derivations {
                    self.derivations.record(Derivation {
                        rule: id,
                        rule_name: rule.display_name().to_string(),
                        conclusion: t,
                        trigger: None,
                        bindings: Vec::new(),
                    });
                }
                context.add_triple(t);
            }
        }
        self.add_set(&store, &mut context)?;
        self.processed_axioms = true;
        self.state = EngineState::AxiomsProcessed;
        Ok(())
    }

    // Incremental maintenance

    /// Stores `triple` as a raw fact if it is not known yet, then runs the
    /// rules it triggers and everything they derive.
    pub fn add(&mut self, triple: Triple) -> Result<()> {
        let store = self.store()?;
        if !self.graph.contains(&triple)? {
            self.graph.add_raw(&triple)?;
        }
        let mut context = RuleContext::new();
        context.add_triple(triple);
        self.add_set(&store, &mut context)
    }

    /// Removes `triple` from the deduction graph right away. Facts that were
    /// deduced from it stay in place: there is no truth maintenance. Raw
    /// facts belong to the caller and are left alone.
    pub fn delete(&mut self, triple: Triple) -> Result<()> {
        let removed = self.graph.deductions_graph_mut().delete(&triple)?;
        warn!(
            "Deleted {:?} (deduction: {}); facts derived from it are not retracted",
            triple, removed
        );
        Ok(())
    }

    /// Processes the worklist until it is empty.
    fn add_set(&mut self, store: &RuleStore, context: &mut RuleContext) -> Result<()> {
        while let Some(t) = context.next_triple() {
            if self.tracing() {
                trace!("Processing: {:?}", t);
            }
            let activations = self.match_triple(store, context, &t)?;
            for activation in activations {
                self.fire_terminal(store, context, activation, Some(t))?;
            }
        }
        Ok(())
    }

    /// Runs `t` through the filters the clause index selects for it and
    /// collects the rule bodies it completes. Reads the graph only.
    fn match_triple(
        &self,
        store: &RuleStore,
        context: &mut RuleContext,
        t: &Triple,
    ) -> Result<Vec<Activation>> {
        let propagation = Propagation::new(store, &self.graph);
        let mut activations = Vec::new();
        for filter in store.clause_index().candidates(t.predicate) {
            propagation.fire_filter(filter, t, context.memory_mut(), &mut activations)?;
        }
        Ok(activations)
    }

    /// Instantiates the head of a completed rule body. Conclusions not yet in
    /// raw ∪ deductions go into the deduction graph and onto the worklist.
    /// Returns the new ones.
    fn fire_terminal(
        &mut self,
        store: &RuleStore,
        context: &mut RuleContext,
        activation: Activation,
        trigger: Option<Triple>,
    ) -> Result<Vec<Triple>> {
        let rule = store.rule(activation.rule).ok_or(ReteError::UnknownRule(activation.rule))?;
        let conclusions = Terminal::new(activation.rule).instantiate(rule, &activation.bindings)?;

        if context.mark_fired(activation.rule) {
            self.n_rules_fired += 1;
            if self.tracing() {
                trace!("Fired rule {} on {:?}", rule.display_name(), trigger);
            }
        }

        let mut produced = Vec::new();
        for conclusion in conclusions {
            if self.graph.contains(&conclusion)? {
                continue;
            }
            self.graph.deductions_graph_mut().add(&conclusion)?;
            context.add_triple(conclusion);
            if self.record_derivations {
                self.derivations.record(Derivation {
                    rule: activation.rule,
                    rule_name: rule.display_name().to_string(),
                    conclusion,
                    trigger,
                    bindings: activation.bindings.values().to_vec(),
                });
            }
            if self.tracing() {
                trace!("  deduced {:?}", conclusion);
            }
            produced.push(conclusion);
        }
        Ok(produced)
    }

    /// Fires one triple through the matching filters and their terminals
    /// without running closure on what comes out. Meant for tests.
    pub fn test_triple_insert(&mut self, triple: Triple) -> Result<Vec<Triple>> {
        let store = self.store()?;
        let mut context = RuleContext::new();
        context.add_triple(triple);
        let Some(t) = context.next_triple() else {
            return Ok(Vec::new());
        };
        let activations = self.match_triple(&store, &mut context, &t)?;
        let mut produced = Vec::new();
        for activation in activations {
            produced.extend(self.fire_terminal(&store, &mut context, activation, Some(t))?);
        }
        Ok(produced)
    }

    // Rule store

    pub fn rule_store(&self) -> Option<Arc<RuleStore>> {
        self.store.clone()
    }

    pub fn set_rule_store(&mut self, store: Arc<RuleStore>) {
        self.store = Some(store);
    }

    fn store(&self) -> Result<Arc<RuleStore>> {
        self.store.clone().ok_or(ReteError::NoRuleStore)
    }

    // Statistics and switches

    /// Rule firings since this engine was created, axioms included.
    pub fn n_rules_fired(&self) -> u64 {
        self.n_rules_fired
    }

    /// Firings during the first axiom bootstrap; `None` before it.
    pub fn n_axiom_rules_fired(&self) -> Option<u64> {
        self.n_axiom_rules_fired
    }

    /// False while axioms are being bootstrapped.
    pub fn should_trace(&self) -> bool {
        self.processed_axioms
    }

    fn tracing(&self) -> bool {
        self.config.trace && self.should_trace()
    }

    pub fn set_derivation_logging(&mut self, record_derivations: bool) {
        self.record_derivations = record_derivations;
    }

    pub fn derivations(&self) -> &[Derivation] {
        self.derivations.all()
    }

    pub fn derivations_for(&self, triple: &Triple) -> Vec<&Derivation> {
        self.derivations.for_conclusion(triple)
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn graph(&self) -> &G {
        &self.graph
    }

    /// Writing the deduction graph directly bypasses the engine.
    pub fn graph_mut(&mut self) -> &mut G {
        &mut self.graph
    }
}
