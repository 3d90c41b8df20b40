/*
 * Copyright © 2024 Volodymyr Kadzhaia
 * Copyright © 2024 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use shared::rule::Rule;
use shared::terms::{Term, TriplePattern};
use shared::triple::Triple;
use crate::binding::BindingEnvironment;
use crate::error::{ReteError, Result};
use crate::network::RuleId;

/// End of a rule's chain: a fully bound environment arriving here fires the
/// rule head.
#[derive(Debug, Clone)]
pub struct Terminal {
    pub rule: RuleId,
}

impl Terminal {
    pub fn new(rule: RuleId) -> Self {
        Terminal { rule }
    }

    /// Substitutes `env` into every head pattern of `rule`.
    pub fn instantiate(&self, rule: &Rule, env: &BindingEnvironment) -> Result<Vec<Triple>> {
        rule.head
            .iter()
            .map(|pattern| instantiate_pattern(rule, pattern, env))
            .collect()
    }
}

pub(crate) fn instantiate_pattern(
    rule: &Rule,
    pattern: &TriplePattern,
    env: &BindingEnvironment,
) -> Result<Triple> {
    let resolve = |term: &Term| match term {
        Term::Constant(c) => Ok(*c),
        Term::Variable(i) => env.get(*i).ok_or_else(|| ReteError::UnboundHeadVariable {
            rule: rule.display_name().to_string(),
            index: *i,
        }),
        Term::Wildcard => Err(ReteError::WildcardInHead {
            rule: rule.display_name().to_string(),
        }),
    };
    Ok(Triple {
        subject: resolve(&pattern.subject)?,
        predicate: resolve(&pattern.predicate)?,
        object: resolve(&pattern.object)?,
    })
}
