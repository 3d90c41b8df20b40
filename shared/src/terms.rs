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
use crate::triple::Triple;

/// One slot of a triple pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Term {
    Constant(u32),
    /// Ordinal into the owning rule's binding environment.
    Variable(usize),
    /// Matches anything and binds nothing.
    Wildcard,
}

impl Term {
    pub fn as_constant(&self) -> Option<u32> {
        match self {
            Term::Constant(c) => Some(*c),
            _ => None,
        }
    }

    pub fn as_variable(&self) -> Option<usize> {
        match self {
            Term::Variable(i) => Some(*i),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Position {
    Subject,
    Predicate,
    Object,
}

impl Position {
    pub const ALL: [Position; 3] = [Position::Subject, Position::Predicate, Position::Object];

    pub fn of(self, triple: &Triple) -> u32 {
        match self {
            Position::Subject => triple.subject,
            Position::Predicate => triple.predicate,
            Position::Object => triple.object,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TriplePattern {
    pub subject: Term,
    pub predicate: Term,
    pub object: Term,
}

impl TriplePattern {
    pub fn new(subject: Term, predicate: Term, object: Term) -> Self {
        TriplePattern { subject, predicate, object }
    }

    pub fn term(&self, position: Position) -> &Term {
        match position {
            Position::Subject => &self.subject,
            Position::Predicate => &self.predicate,
            Position::Object => &self.object,
        }
    }

    /// Variable slots in subject, predicate, object order. A variable repeated
    /// inside the pattern is reported once per slot.
    pub fn variables(&self) -> impl Iterator<Item = (Position, usize)> + '_ {
        Position::ALL
            .into_iter()
            .filter_map(move |pos| self.term(pos).as_variable().map(|v| (pos, v)))
    }

    pub fn constants(&self) -> impl Iterator<Item = (Position, u32)> + '_ {
        Position::ALL
            .into_iter()
            .filter_map(move |pos| self.term(pos).as_constant().map(|c| (pos, c)))
    }

    /// The pattern as a fact, if every slot is a constant.
    pub fn to_triple(&self) -> Option<Triple> {
        Some(Triple {
            subject: self.subject.as_constant()?,
            predicate: self.predicate.as_constant()?,
            object: self.object.as_constant()?,
        })
    }
}
