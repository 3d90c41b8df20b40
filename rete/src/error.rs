/*
 * Copyright © 2024 Volodymyr Kadzhaia
 * Copyright © 2024 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use shared::graph::GraphError;
use shared::rule::RuleError;
use crate::network::NodeId;

#[derive(Debug, thiserror::Error)]
pub enum ReteError {
    /// Malformed rule, reported at compile time.
    #[error(transparent)]
    Rule(#[from] RuleError),
    #[error("rule {rule}: head variable ?{index} is not bound by the body")]
    UnboundHeadVariable { rule: String, index: usize },
    #[error("rule {rule}: wildcard in head pattern")]
    WildcardInHead { rule: String },

    // Network wiring defects. A correct compiler never produces these.
    #[error("join queue {0} has no sibling wired back to it")]
    MissingSibling(NodeId),
    #[error("node {0} has no continuation")]
    MissingContinuation(NodeId),
    #[error("node {node} is not a {expected}")]
    UnexpectedNode { node: NodeId, expected: &'static str },
    #[error("node {0} does not exist")]
    NodeOutOfRange(NodeId),
    #[error("join key ?{key} is unbound at node {node}")]
    UnboundJoinKey { node: NodeId, key: usize },

    #[error("rule {0} is not in the rule store")]
    UnknownRule(usize),
    #[error("rule {rule} has no body clause {clause}")]
    UnknownClause { rule: String, clause: usize },

    #[error("no rule store: call init() or set_rule_store() first")]
    NoRuleStore,
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error("rule syntax error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, ReteError>;
