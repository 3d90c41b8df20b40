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
use crate::terms::{Term, TriplePattern};
use crate::triple::Triple;

/// Ids at or above this value are reserved (the clause index uses `u32::MAX`
/// as its wildcard key).
pub const MAX_TERM_ID: u32 = u32::MAX - 1;

// Dictionary for encoding and decoding term strings
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Dictionary {
    string_to_id: HashMap<String, u32>,
    id_to_string: HashMap<u32, String>,
    next_id: u32,
}

impl Dictionary {
    pub fn new() -> Self {
        Dictionary {
            string_to_id: HashMap::new(),
            id_to_string: HashMap::new(),
            next_id: 0,
        }
    }

    pub fn encode(&mut self, value: &str) -> u32 {
        if let Some(&id) = self.string_to_id.get(value) {
            return id;
        }
        debug_assert!(self.next_id < MAX_TERM_ID, "dictionary id space exhausted");
        let id = self.next_id;
        self.string_to_id.insert(value.to_string(), id);
        self.id_to_string.insert(id, value.to_string());
        self.next_id += 1;
        id
    }

    /// Id of an already encoded value, without allocating a new one.
    pub fn lookup(&self, value: &str) -> Option<u32> {
        self.string_to_id.get(value).copied()
    }

    pub fn decode(&self, id: u32) -> Option<&str> {
        self.id_to_string.get(&id).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.id_to_string.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_string.is_empty()
    }

    pub fn encode_triple(&mut self, subject: &str, predicate: &str, object: &str) -> Triple {
        Triple {
            subject: self.encode(subject),
            predicate: self.encode(predicate),
            object: self.encode(object),
        }
    }

    pub fn decode_triple(&self, triple: &Triple) -> String {
        let s = self.decode(triple.subject).unwrap_or("unknown");
        let p = self.decode(triple.predicate).unwrap_or("unknown");
        let o = self.decode(triple.object).unwrap_or("unknown");
        format!("{} {} {} .", s, p, o)
    }

    pub fn decode_term(&self, term: &Term) -> String {
        match term {
            Term::Constant(c) => self.decode(*c).unwrap_or("unknown").to_string(),
            Term::Variable(i) => format!("?{}", i),
            Term::Wildcard => "_".to_string(),
        }
    }

    pub fn decode_pattern(&self, pattern: &TriplePattern) -> String {
        format!(
            "({} {} {})",
            self.decode_term(&pattern.subject),
            self.decode_term(&pattern.predicate),
            self.decode_term(&pattern.object)
        )
    }
}
