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
use crate::network::NodeId;

/// Key under which clause filters with a variable (or wildcard) predicate are
/// stored. Dictionary ids never reach this value.
pub const WILDCARD: u32 = u32::MAX;

/// Predicate → clause filters whose pattern has that predicate.
#[derive(Debug, Clone, Default)]
pub struct ClauseIndex {
    entries: HashMap<u32, Vec<NodeId>>,
}

impl ClauseIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, predicate: u32, filter: NodeId) {
        self.entries.entry(predicate).or_default().push(filter);
    }

    pub fn insert_wildcard(&mut self, filter: NodeId) {
        self.insert(WILDCARD, filter);
    }

    pub fn get_all(&self, predicate: u32) -> &[NodeId] {
        self.entries.get(&predicate).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn wildcard(&self) -> &[NodeId] {
        self.get_all(WILDCARD)
    }

    /// Filters to test for a triple with this predicate: the filters indexed
    /// under it, then the wildcard filters.
    pub fn candidates(&self, predicate: u32) -> impl Iterator<Item = NodeId> + '_ {
        let direct = if predicate == WILDCARD { &[][..] } else { self.get_all(predicate) };
        direct.iter().chain(self.wildcard().iter()).copied()
    }

    /// Number of (predicate, filter) entries.
    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
