/*
 * Copyright © 2024 Volodymyr Kadzhaia
 * Copyright © 2024 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use shared::graph::{GraphError, TripleSink, TripleSource};
use shared::index_manager::UnifiedIndex;
use shared::triple::Triple;

/// The graph a forward engine runs against: the raw facts plus a writable
/// graph of deductions. The engine reads raw facts and only ever adds to
/// them through `add_raw`, for facts it is asked to propagate.
pub trait ForwardInfGraph {
    type Raw: TripleSource;
    type Deductions: TripleSink;

    /// `None` when the engine runs over deductions only.
    fn raw_graph(&self) -> Option<&Self::Raw>;
    fn deductions_graph(&self) -> &Self::Deductions;
    fn deductions_graph_mut(&mut self) -> &mut Self::Deductions;

    /// Stores an asserted fact. Returns false if it was already there.
    fn add_raw(&mut self, triple: &Triple) -> Result<bool, GraphError>;

    /// Matches over raw ∪ deductions, sorted and without duplicates.
    fn find(
        &self,
        s: Option<u32>,
        p: Option<u32>,
        o: Option<u32>,
    ) -> Result<Vec<Triple>, GraphError> {
        let mut found = self.deductions_graph().find(s, p, o)?;
        if let Some(raw) = self.raw_graph() {
            found.extend(raw.find(s, p, o)?);
            found.sort_unstable();
            found.dedup();
        }
        Ok(found)
    }

    fn contains(&self, triple: &Triple) -> Result<bool, GraphError> {
        if self.deductions_graph().contains(triple)? {
            return Ok(true);
        }
        match self.raw_graph() {
            Some(raw) => raw.contains(triple),
            None => Ok(false),
        }
    }
}

/// Raw and deduced facts held in two in-memory indexes.
#[derive(Debug, Default)]
pub struct MemoryInfGraph {
    raw: Option<UnifiedIndex>,
    deductions: UnifiedIndex,
}

impl MemoryInfGraph {
    /// A graph with an empty raw index.
    pub fn new() -> Self {
        MemoryInfGraph {
            raw: Some(UnifiedIndex::new()),
            deductions: UnifiedIndex::new(),
        }
    }

    pub fn with_raw(triples: &[Triple]) -> Self {
        MemoryInfGraph {
            raw: Some(UnifiedIndex::from_triples(triples)),
            deductions: UnifiedIndex::new(),
        }
    }

    pub fn without_raw() -> Self {
        MemoryInfGraph::default()
    }

    pub fn remove_raw(&mut self, triple: &Triple) -> bool {
        self.raw.as_mut().map_or(false, |raw| raw.delete(triple))
    }

    pub fn raw(&self) -> Option<&UnifiedIndex> {
        self.raw.as_ref()
    }

    pub fn deductions(&self) -> &UnifiedIndex {
        &self.deductions
    }
}

impl ForwardInfGraph for MemoryInfGraph {
    type Raw = UnifiedIndex;
    type Deductions = UnifiedIndex;

    fn raw_graph(&self) -> Option<&UnifiedIndex> {
        self.raw.as_ref()
    }

    fn deductions_graph(&self) -> &UnifiedIndex {
        &self.deductions
    }

    fn deductions_graph_mut(&mut self) -> &mut UnifiedIndex {
        &mut self.deductions
    }

    /// A deductions-only graph grows a raw index on the first stored fact.
    fn add_raw(&mut self, triple: &Triple) -> Result<bool, GraphError> {
        Ok(self.raw.get_or_insert_with(UnifiedIndex::new).insert(triple))
    }
}
