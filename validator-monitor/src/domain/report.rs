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

use crate::domain::{
    AccountId, Metric, ValidatorRecord, ValidatorSnapshot, extract, reading::YOCTO_PER_UNIT,
};
use itertools::Itertools;

/// Status report of the given account, or a not-found notice if it is in none of the sets.
pub fn pool_info(snapshot: &ValidatorSnapshot, account_id: &AccountId) -> String {
    let Some(reading) = extract(snapshot, account_id) else {
        return format!("❌ {account_id} not found in any validator set.");
    };

    let header = [
        format!("ℹ Pool Info: {}", reading.account_id),
        format!("Stake: {:.1} Ⓝ", reading.stake),
        format!("Rank by stake: {}/{}", reading.rank, reading.validator_count),
    ];

    let metrics = Metric::ALL.into_iter().map(|metric| {
        let production = reading.production(metric);
        let percentage = if production.expected == 0 {
            "0".to_string()
        } else {
            format!("{:.1}", production.display_percentage())
        };
        let line = format!(
            "{}: {}/{} - {percentage}%",
            metric.title(),
            production.produced,
            production.expected,
        );

        match production.severity().marker() {
            "" => line,
            marker => format!("{line} {marker}"),
        }
    });

    header.into_iter().chain(metrics).join("\n")
}

/// Membership report of the given account within the next validators.
pub fn next_validators(snapshot: &ValidatorSnapshot, account_id: &AccountId) -> String {
    membership(
        &format!("⏩ Next Validators ({} total):", snapshot.next.len()),
        &snapshot.next,
        account_id,
    )
}

/// Membership report of the given account within the current proposals.
pub fn proposals(snapshot: &ValidatorSnapshot, account_id: &AccountId) -> String {
    membership(
        &format!("📬 Proposals ({} total):", snapshot.proposals.len()),
        &snapshot.proposals,
        account_id,
    )
}

fn membership(header: &str, set: &[ValidatorRecord], account_id: &AccountId) -> String {
    let lines = set
        .iter()
        .filter(|record| &record.account_id == account_id)
        .map(|record| {
            let stake = record.stake as f64 / YOCTO_PER_UNIT;
            format!("✅ {} | {stake:.1} Ⓝ", record.account_id)
        })
        .collect::<Vec<_>>();

    if lines.is_empty() {
        "ℹ Your validator is not in this set.".to_string()
    } else {
        [header.to_string()].into_iter().chain(lines).join("\n")
    }
}
