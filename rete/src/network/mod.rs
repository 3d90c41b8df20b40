/*
 * Copyright © 2024 Volodymyr Kadzhaia
 * Copyright © 2024 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! The compiled matching network.
//!
//! Nodes live in a single arena and refer to each other by [`NodeId`]:
//! a clause filter feeds either a join queue or a terminal, each join queue
//! pair feeds the next pair's left side or a terminal. Queues do not keep
//! long-lived memories; a partial match arriving on one side is completed by
//! looking the sibling side's clauses up in the stored graph.

pub mod filter;
pub mod queue;
pub mod terminal;

use std::fmt;
use log::trace;
use shared::rule::Rule;
use shared::triple::Triple;
use crate::binding::BindingEnvironment;
use crate::error::{ReteError, Result};
use crate::graph::ForwardInfGraph;
use crate::rule_store::RuleStore;

pub use filter::ClauseFilter;
pub use queue::{JoinQueue, QueueMemory, Side};
pub use terminal::Terminal;

/// Index of a rule in the rule store's rule list.
pub type RuleId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub enum ReteNode {
    Filter(ClauseFilter),
    Queue(JoinQueue),
    Terminal(Terminal),
}

impl ReteNode {
    pub fn kind(&self) -> &'static str {
        match self {
            ReteNode::Filter(_) => "clause filter",
            ReteNode::Queue(_) => "join queue",
            ReteNode::Terminal(_) => "terminal",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Network {
    nodes: Vec<ReteNode>,
}

impl Network {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn push(&mut self, node: ReteNode) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    pub fn node(&self, id: NodeId) -> Result<&ReteNode> {
        self.nodes.get(id.0).ok_or(ReteError::NodeOutOfRange(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut ReteNode> {
        self.nodes.get_mut(id.0).ok_or(ReteError::NodeOutOfRange(id))
    }

    pub fn filter(&self, id: NodeId) -> Result<&ClauseFilter> {
        match self.node(id)? {
            ReteNode::Filter(f) => Ok(f),
            _ => Err(ReteError::UnexpectedNode { node: id, expected: "clause filter" }),
        }
    }

    pub fn queue(&self, id: NodeId) -> Result<&JoinQueue> {
        match self.node(id)? {
            ReteNode::Queue(q) => Ok(q),
            _ => Err(ReteError::UnexpectedNode { node: id, expected: "join queue" }),
        }
    }

    fn queue_mut(&mut self, id: NodeId) -> Result<&mut JoinQueue> {
        match self.node_mut(id)? {
            ReteNode::Queue(q) => Ok(q),
            _ => Err(ReteError::UnexpectedNode { node: id, expected: "join queue" }),
        }
    }

    /// Wires two queues as a join pair, both ways.
    pub fn pair_queues(&mut self, left: NodeId, right: NodeId) -> Result<()> {
        self.queue_mut(left)?.sibling = Some(right);
        self.queue_mut(right)?.sibling = Some(left);
        Ok(())
    }

    /// Sets where `id` forwards its matches. For a join queue the sibling
    /// gets the same continuation.
    pub fn set_continuation(&mut self, id: NodeId, continuation: NodeId) -> Result<()> {
        let sibling = match self.node_mut(id)? {
            ReteNode::Filter(f) => {
                f.continuation = Some(continuation);
                None
            }
            ReteNode::Queue(q) => {
                q.continuation = Some(continuation);
                q.sibling
            }
            ReteNode::Terminal(_) => {
                return Err(ReteError::UnexpectedNode {
                    node: id,
                    expected: "clause filter or join queue",
                })
            }
        };
        if let Some(sibling) = sibling {
            self.queue_mut(sibling)?.continuation = Some(continuation);
        }
        Ok(())
    }

    /// The sibling of queue `id`, checked to point back at `id`.
    pub fn sibling_of(&self, id: NodeId) -> Result<&JoinQueue> {
        let sibling_id = self.queue(id)?.sibling.ok_or(ReteError::MissingSibling(id))?;
        match self.node(sibling_id)? {
            ReteNode::Queue(sibling) if sibling.sibling == Some(id) => Ok(sibling),
            _ => Err(ReteError::MissingSibling(id)),
        }
    }
}

/// A fully matched rule body waiting for its terminal to fire.
#[derive(Debug, Clone)]
pub struct Activation {
    pub rule: RuleId,
    pub bindings: BindingEnvironment,
}

/// Read-only pass of one triple through the network. Produces activations;
/// firing them (and so mutating the graph) is left to the engine.
pub struct Propagation<'a, G> {
    network: &'a Network,
    rules: &'a [Rule],
    graph: &'a G,
}

impl<'a, G: ForwardInfGraph> Propagation<'a, G> {
    pub fn new(store: &'a RuleStore, graph: &'a G) -> Self {
        Propagation {
            network: store.network(),
            rules: store.rules(),
            graph,
        }
    }

    fn rule(&self, id: RuleId) -> Result<&'a Rule> {
        let rules: &'a [Rule] = self.rules;
        rules.get(id).ok_or(ReteError::UnknownRule(id))
    }

    /// Tests `triple` against a clause filter and, on a match, runs the
    /// bindings down the filter's chain. Returns whether the filter matched.
    pub fn fire_filter(
        &self,
        id: NodeId,
        triple: &Triple,
        memory: &mut QueueMemory,
        out: &mut Vec<Activation>,
    ) -> Result<bool> {
        let filter = self.network.filter(id)?;
        let Some(env) = filter.test(triple) else {
            return Ok(false);
        };
        trace!("{:?} matched clause {} of rule {}", triple, filter.clause, filter.rule);
        let continuation = filter.continuation.ok_or(ReteError::MissingContinuation(id))?;
        self.activate(continuation, env, memory, out)?;
        Ok(true)
    }

    /// Delivers `env` to node `id`.
    pub fn activate(
        &self,
        id: NodeId,
        env: BindingEnvironment,
        memory: &mut QueueMemory,
        out: &mut Vec<Activation>,
    ) -> Result<()> {
        match self.network.node(id)? {
            ReteNode::Terminal(terminal) => {
                out.push(Activation { rule: terminal.rule, bindings: env });
                Ok(())
            }
            ReteNode::Queue(queue) => self.accept(id, queue, env, memory, out),
            ReteNode::Filter(_) => Err(ReteError::UnexpectedNode {
                node: id,
                expected: "join queue or terminal",
            }),
        }
    }

    /// A partial match arrives on one side of a join pair: find every
    /// completion of the sibling side's clauses in the stored graph that
    /// agrees on the join keys, and forward each merged result.
    fn accept(
        &self,
        id: NodeId,
        queue: &JoinQueue,
        env: BindingEnvironment,
        memory: &mut QueueMemory,
        out: &mut Vec<Activation>,
    ) -> Result<()> {
        let sibling = self.network.sibling_of(id)?;
        let continuation = queue.continuation.ok_or(ReteError::MissingContinuation(id))?;
        if !memory.remember(id, env.values()) {
            return Ok(());
        }

        let mut probe = BindingEnvironment::new(env.len());
        for &key in queue.join_keys() {
            let value = env.get(key).ok_or(ReteError::UnboundJoinKey { node: id, key })?;
            probe.bind(key, value);
        }

        let rule = self.rule(queue.rule)?;
        let mut candidates = Vec::new();
        self.match_clauses(rule, sibling.clauses(), &mut probe, &mut candidates)?;

        for candidate in candidates {
            let mut merged = env.clone();
            if merged.merge(&candidate, queue.join_keys()) {
                merged.commit();
                self.activate(continuation, merged, memory, out)?;
            }
        }
        Ok(())
    }

    /// Enumerates, by backtracking over the stored graph, every extension of
    /// `env` that satisfies all of `clauses`. Bound slots narrow each lookup.
    fn match_clauses(
        &self,
        rule: &Rule,
        clauses: &[usize],
        env: &mut BindingEnvironment,
        results: &mut Vec<BindingEnvironment>,
    ) -> Result<()> {
        let Some((&first, rest)) = clauses.split_first() else {
            results.push(env.clone());
            return Ok(());
        };
        let pattern = rule
            .body_element(first)
            .ok_or_else(|| ReteError::UnknownClause {
                rule: rule.display_name().to_string(),
                clause: first,
            })?;

        let found = self.graph.find(
            env.resolve(&pattern.subject),
            env.resolve(&pattern.predicate),
            env.resolve(&pattern.object),
        )?;
        for triple in found {
            let mark = env.snapshot();
            if env.unify(pattern, &triple) {
                self.match_clauses(rule, rest, env, results)?;
            }
            env.restore(mark);
        }
        Ok(())
    }
}
