/*
 * Copyright © 2024 Volodymyr Kadzhaia
 * Copyright © 2024 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Contracts for the stores that hold raw and deduced facts.
//!
//! Any backend (in-memory, SQL, disk) can sit behind these traits. Errors are
//! passed through to whoever drives the store; nothing here retries.

use crate::index_manager::UnifiedIndex;
use crate::triple::Triple;

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store i/o failure: {0}")]
    Io(String),
}

/// A readable set of triples.
pub trait TripleSource {
    /// All stored triples matching the given slots; `None` matches anything.
    /// Implementations return results in ascending `Triple` order.
    fn find(&self, s: Option<u32>, p: Option<u32>, o: Option<u32>)
        -> Result<Vec<Triple>, GraphError>;

    fn contains(&self, triple: &Triple) -> Result<bool, GraphError> {
        Ok(!self
            .find(Some(triple.subject), Some(triple.predicate), Some(triple.object))?
            .is_empty())
    }
}

/// A writable set of triples. Both operations are idempotent and report
/// whether the store changed.
pub trait TripleSink: TripleSource {
    fn add(&mut self, triple: &Triple) -> Result<bool, GraphError>;
    fn delete(&mut self, triple: &Triple) -> Result<bool, GraphError>;
}

impl TripleSource for UnifiedIndex {
    fn find(
        &self,
        s: Option<u32>,
        p: Option<u32>,
        o: Option<u32>,
    ) -> Result<Vec<Triple>, GraphError> {
        Ok(self.query(s, p, o))
    }

    fn contains(&self, triple: &Triple) -> Result<bool, GraphError> {
        Ok(UnifiedIndex::contains(self, triple))
    }
}

impl TripleSink for UnifiedIndex {
    fn add(&mut self, triple: &Triple) -> Result<bool, GraphError> {
        Ok(self.insert(triple))
    }

    fn delete(&mut self, triple: &Triple) -> Result<bool, GraphError> {
        Ok(UnifiedIndex::delete(self, triple))
    }
}
