/*
 * Copyright © 2024 Volodymyr Kadzhaia
 * Copyright © 2024 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

pub mod binding;
pub mod clause_index;
pub mod compiler;
pub mod config;
pub mod context;
pub mod derivation;
pub mod engine;
pub mod error;
pub mod graph;
pub mod network;
pub mod rule_parser;
pub mod rule_store;

pub use config::EngineConfig;
pub use engine::{EngineState, ReteEngine};
pub use error::{ReteError, Result};
pub use graph::{ForwardInfGraph, MemoryInfGraph};
pub use rule_parser::parse_rules;
pub use rule_store::RuleStore;
