// This file is part of validator-monitor.
// Copyright (C) 2025 Midnight Foundation
// SPDX-License-Identifier: Apache-2.0
// Licensed under the Apache License, Version 2.0 (the "License");
// You may not use this file except in compliance with the License.
// You may obtain a copy of the License at
// http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::domain::{Metric, MetricReading, PerMetric};
use serde::Deserialize;

/// How far from healthy a metric is, as a non-negative integer magnitude. Selected by
/// configuration.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum BadnessPolicy {
    /// Alert when the production percentage falls below a per-metric minimum; badness is the
    /// number of percentage points below the minimum, rounded up.
    MinPercent(PerMetric<f64>),

    /// Alert when the number of missed items reaches a per-metric limit; badness is the number of
    /// missed items.
    MaxMissed(PerMetric<u64>),
}

impl BadnessPolicy {
    pub fn badness(&self, reading: &MetricReading, metric: Metric) -> u64 {
        let production = reading.production(metric);

        match self {
            BadnessPolicy::MinPercent(minimums) => {
                let shortfall = minimums.get(metric) - production.alert_percentage();
                if shortfall > 0.0 {
                    shortfall.ceil() as u64
                } else {
                    0
                }
            }

            BadnessPolicy::MaxMissed(limits) => {
                let missed = production.missed();
                if missed >= *limits.get(metric) {
                    missed
                } else {
                    0
                }
            }
        }
    }

    /// Line of an alert message describing the given metric.
    pub fn describe(&self, reading: &MetricReading, metric: Metric) -> String {
        let production = reading.production(metric);

        match self {
            BadnessPolicy::MinPercent(minimums) => format!(
                "📛 {}: {:.1}% ({}/{}), minimum {}%",
                metric.title(),
                production.alert_percentage(),
                production.produced,
                production.expected,
                minimums.get(metric),
            ),

            BadnessPolicy::MaxMissed(_) => format!(
                "📛 Missed {metric}: {} of {}",
                production.missed(),
                production.expected
            ),
        }
    }
}

impl Default for BadnessPolicy {
    fn default() -> Self {
        BadnessPolicy::MinPercent(PerMetric {
            blocks: 90.0,
            chunks: 90.0,
            endorsements: 90.0,
        })
    }
}
