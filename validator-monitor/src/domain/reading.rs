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

use crate::domain::{AccountId, ValidatorRecord, ValidatorSnapshot};
use derive_more::Display;
use itertools::Itertools;
use serde::Deserialize;
use std::fmt;

/// Yocto units per major unit of stake.
pub(crate) const YOCTO_PER_UNIT: f64 = 1e24;

const WARNING_PERCENTAGE: f64 = 90.0;
const CRITICAL_PERCENTAGE: f64 = 80.0;

/// The monitored production metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Metric {
    #[display("blocks")]
    Blocks,

    #[display("chunks")]
    Chunks,

    #[display("endorsements")]
    Endorsements,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Blocks, Metric::Chunks, Metric::Endorsements];

    /// Capitalized name for reports.
    pub fn title(&self) -> &'static str {
        match self {
            Metric::Blocks => "Blocks",
            Metric::Chunks => "Chunks",
            Metric::Endorsements => "Endorsements",
        }
    }
}

/// One value per [Metric].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct PerMetric<T> {
    pub blocks: T,
    pub chunks: T,
    pub endorsements: T,
}

impl<T> PerMetric<T> {
    pub fn from_fn(mut f: impl FnMut(Metric) -> T) -> Self {
        Self {
            blocks: f(Metric::Blocks),
            chunks: f(Metric::Chunks),
            endorsements: f(Metric::Endorsements),
        }
    }

    pub fn get(&self, metric: Metric) -> &T {
        match metric {
            Metric::Blocks => &self.blocks,
            Metric::Chunks => &self.chunks,
            Metric::Endorsements => &self.endorsements,
        }
    }

    pub fn get_mut(&mut self, metric: Metric) -> &mut T {
        match metric {
            Metric::Blocks => &mut self.blocks,
            Metric::Chunks => &mut self.chunks,
            Metric::Endorsements => &mut self.endorsements,
        }
    }
}

/// Produced and expected counts of a metric within the current epoch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Production {
    pub produced: u64,
    pub expected: u64,
}

impl Production {
    /// Percentage rounded to one decimal place; 0 if nothing was expected yet.
    pub fn display_percentage(&self) -> f64 {
        self.percentage().unwrap_or(0.0)
    }

    /// Percentage rounded to one decimal place; 100 if nothing was expected yet, such that a
    /// fresh epoch is considered healthy.
    pub fn alert_percentage(&self) -> f64 {
        self.percentage().unwrap_or(100.0)
    }

    /// Number of expected but not produced items.
    pub fn missed(&self) -> u64 {
        self.expected.saturating_sub(self.produced)
    }

    pub fn severity(&self) -> Severity {
        let percentage = self.alert_percentage();

        if percentage < CRITICAL_PERCENTAGE {
            Severity::Critical
        } else if percentage < WARNING_PERCENTAGE {
            Severity::Warning
        } else {
            Severity::Normal
        }
    }

    fn percentage(&self) -> Option<f64> {
        (self.expected != 0).then(|| {
            let percentage = 100.0 * self.produced as f64 / self.expected as f64;
            (percentage * 10.0).round() / 10.0
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Normal,
    Warning,
    Critical,
}

impl Severity {
    pub fn marker(&self) -> &'static str {
        match self {
            Severity::Normal => "",
            Severity::Warning => "🟡",
            Severity::Critical => "🔴",
        }
    }
}

/// 1-based position by descending stake among the current validators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rank {
    Position(usize),
    Unknown,
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rank::Position(position) => write!(f, "{position}"),
            Rank::Unknown => write!(f, "unknown"),
        }
    }
}

/// Derived view of the monitored account within a [ValidatorSnapshot].
#[derive(Debug, Clone, PartialEq)]
pub struct MetricReading {
    pub account_id: AccountId,

    /// Stake in major units.
    pub stake: f64,

    pub rank: Rank,

    /// Number of current validators.
    pub validator_count: usize,

    pub production: PerMetric<Production>,
}

impl MetricReading {
    pub fn production(&self, metric: Metric) -> Production {
        *self.production.get(metric)
    }
}

/// Find the given account in any of the current, next and proposals sets, in that order.
pub fn extract(snapshot: &ValidatorSnapshot, account_id: &AccountId) -> Option<MetricReading> {
    snapshot
        .all()
        .find(|record| &record.account_id == account_id)
        .map(|record| reading(snapshot, record))
}

/// Find the given account among the current validators only.
pub fn extract_current(
    snapshot: &ValidatorSnapshot,
    account_id: &AccountId,
) -> Option<MetricReading> {
    snapshot
        .current
        .iter()
        .find(|record| &record.account_id == account_id)
        .map(|record| reading(snapshot, record))
}

/// Rank of the given account among the current validators by descending stake. Validators with
/// equal stake keep their reported order.
pub fn rank(current: &[ValidatorRecord], account_id: &AccountId) -> Rank {
    current
        .iter()
        .sorted_by(|a, b| b.stake.cmp(&a.stake))
        .position(|record| &record.account_id == account_id)
        .map(|index| Rank::Position(index + 1))
        .unwrap_or(Rank::Unknown)
}

fn reading(snapshot: &ValidatorSnapshot, record: &ValidatorRecord) -> MetricReading {
    MetricReading {
        account_id: record.account_id.clone(),
        stake: record.stake as f64 / YOCTO_PER_UNIT,
        rank: rank(&snapshot.current, &record.account_id),
        validator_count: snapshot.current.len(),
        production: PerMetric::from_fn(|metric| record.production(metric)),
    }
}
