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
use std::collections::{HashMap, HashSet};
use crate::terms::TriplePattern;
use crate::triple::Triple;

type NestedIndex = HashMap<u32, HashMap<u32, HashSet<u32>>>;

/// In-memory triple set indexed under the three rotations needed to answer
/// any `(s?, p?, o?)` lookup with a single probe: SPO, POS and OSP.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnifiedIndex {
    pub spo: NestedIndex,
    pub pos: NestedIndex,
    pub osp: NestedIndex,
    len: usize,
}

impl UnifiedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_triples(triples: &[Triple]) -> Self {
        let mut index = Self::new();
        index.build_from_triples(triples);
        index
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn contains(&self, triple: &Triple) -> bool {
        self.spo
            .get(&triple.subject)
            .and_then(|pred_map| pred_map.get(&triple.predicate))
            .map_or(false, |objects| objects.contains(&triple.object))
    }

    /// Insert a single triple into every rotation. Returns false if it was
    /// already stored.
    pub fn insert(&mut self, triple: &Triple) -> bool {
        if self.contains(triple) {
            return false;
        }
        let Triple { subject: s, predicate: p, object: o } = *triple;
        self.spo.entry(s).or_default().entry(p).or_default().insert(o);
        self.pos.entry(p).or_default().entry(o).or_default().insert(s);
        self.osp.entry(o).or_default().entry(s).or_default().insert(p);
        self.len += 1;
        true
    }

    /// Delete a single triple from every rotation. Returns false if it was
    /// not stored.
    pub fn delete(&mut self, triple: &Triple) -> bool {
        if !self.contains(triple) {
            return false;
        }
        let Triple { subject: s, predicate: p, object: o } = *triple;
        remove_from_index(&mut self.spo, s, p, o);
        remove_from_index(&mut self.pos, p, o, s);
        remove_from_index(&mut self.osp, o, s, p);
        self.len -= 1;
        true
    }

    /// Bulk-build the index from a list of triples, replacing its contents.
    pub fn build_from_triples(&mut self, triples: &[Triple]) {
        use rayon::prelude::*;

        self.clear();
        if triples.is_empty() {
            return;
        }

        let chunk_size = (triples.len() / rayon::current_num_threads()).max(10_000);
        let partial_indexes: Vec<UnifiedIndex> = triples
            .par_chunks(chunk_size)
            .map(|chunk| {
                let mut local = UnifiedIndex::new();
                for triple in chunk {
                    local.insert(triple);
                }
                local
            })
            .collect();

        for partial in partial_indexes {
            self.merge_from(partial);
        }
    }

    /// Merge another index into this one. Triples present in both are kept once.
    pub fn merge_from(&mut self, other: UnifiedIndex) {
        for (s, pred_map) in other.spo {
            for (p, objects) in pred_map {
                for o in objects {
                    self.insert(&Triple::new(s, p, o));
                }
            }
        }
    }

    /// Query the index; `None` acts as a wildcard. Results are sorted.
    pub fn query(&self, s: Option<u32>, p: Option<u32>, o: Option<u32>) -> Vec<Triple> {
        let mut results = Vec::new();

        match (s, p, o) {
            (Some(ss), Some(pp), Some(oo)) => {
                let triple = Triple::new(ss, pp, oo);
                if self.contains(&triple) {
                    results.push(triple);
                }
            }
            // (S, P, -)
            (Some(ss), Some(pp), None) => {
                if let Some(objects) = self.spo.get(&ss).and_then(|m| m.get(&pp)) {
                    results.extend(objects.iter().map(|&obj| Triple::new(ss, pp, obj)));
                }
            }
            // (S, -, O)
            (Some(ss), None, Some(oo)) => {
                if let Some(predicates) = self.osp.get(&oo).and_then(|m| m.get(&ss)) {
                    results.extend(predicates.iter().map(|&pred| Triple::new(ss, pred, oo)));
                }
            }
            // (-, P, O)
            (None, Some(pp), Some(oo)) => {
                if let Some(subjects) = self.pos.get(&pp).and_then(|m| m.get(&oo)) {
                    results.extend(subjects.iter().map(|&subj| Triple::new(subj, pp, oo)));
                }
            }
            // (S, -, -)
            (Some(ss), None, None) => {
                if let Some(pred_map) = self.spo.get(&ss) {
                    for (&pred, objects) in pred_map {
                        results.extend(objects.iter().map(|&obj| Triple::new(ss, pred, obj)));
                    }
                }
            }
            // (-, P, -)
            (None, Some(pp), None) => {
                if let Some(obj_map) = self.pos.get(&pp) {
                    for (&obj, subjects) in obj_map {
                        results.extend(subjects.iter().map(|&subj| Triple::new(subj, pp, obj)));
                    }
                }
            }
            // (-, -, O)
            (None, None, Some(oo)) => {
                if let Some(subj_map) = self.osp.get(&oo) {
                    for (&subj, predicates) in subj_map {
                        results.extend(predicates.iter().map(|&pred| Triple::new(subj, pred, oo)));
                    }
                }
            }
            (None, None, None) => {
                for (&subj, pred_map) in &self.spo {
                    for (&pred, objects) in pred_map {
                        results.extend(objects.iter().map(|&obj| Triple::new(subj, pred, obj)));
                    }
                }
            }
        }

        results.sort_unstable();
        results
    }

    /// All triples matching the constant slots of `pattern`. Variable and
    /// wildcard slots are left open; repeated variables are not checked here.
    pub fn get_matching_triples(&self, pattern: &TriplePattern) -> Vec<Triple> {
        self.query(
            pattern.subject.as_constant(),
            pattern.predicate.as_constant(),
            pattern.object.as_constant(),
        )
    }

    pub fn clear(&mut self) {
        self.spo.clear();
        self.pos.clear();
        self.osp.clear();
        self.len = 0;
    }
}

/// Remove a value from a nested index and drop collections left empty
#[inline]
fn remove_from_index(index: &mut NestedIndex, key1: u32, key2: u32, value: u32) {
    if let Some(inner_map) = index.get_mut(&key1) {
        if let Some(set) = inner_map.get_mut(&key2) {
            set.remove(&value);
            if set.is_empty() {
                inner_map.remove(&key2);
            }
        }
        if inner_map.is_empty() {
            index.remove(&key1);
        }
    }
}
