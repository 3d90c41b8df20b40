/*
 * Copyright © 2024 Volodymyr Kadzhaia
 * Copyright © 2024 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Record a derivation for every deduced triple from the start
    pub record_derivations: bool,
    /// Log every processed triple and rule firing once bootstrap is over
    pub trace: bool,
    /// Leave rules written in backward notation out of `init_default`
    pub ignore_backward_rules: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            record_derivations: false,
            trace: false,
            ignore_backward_rules: true,
        }
    }
}
