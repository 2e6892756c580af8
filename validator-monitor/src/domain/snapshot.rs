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

use crate::domain::{Metric, Production};
use derive_more::{Display, From};
use serde::Deserialize;
use serde_with::{DisplayFromStr, serde_as};

/// Identifier of an account on the network, e.g. `lux.poolv1.near`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, From, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl From<&str> for AccountId {
    fn from(account_id: &str) -> Self {
        Self(account_id.to_owned())
    }
}

impl AccountId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The validator set as reported by a node for the current epoch. Only ever used for a single
/// monitor cycle or query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ValidatorSnapshot {
    #[serde(rename = "current_validators")]
    pub current: Vec<ValidatorRecord>,

    #[serde(rename = "next_validators")]
    pub next: Vec<ValidatorRecord>,

    #[serde(rename = "current_proposals", default)]
    pub proposals: Vec<ValidatorRecord>,
}

impl ValidatorSnapshot {
    /// All records in the order current, next, proposals.
    pub fn all(&self) -> impl Iterator<Item = &ValidatorRecord> {
        self.current
            .iter()
            .chain(self.next.iter())
            .chain(self.proposals.iter())
    }
}

/// A single validator entry. Entries of the next validators and of the proposals carry no
/// production counters, hence these default to zero.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ValidatorRecord {
    pub account_id: AccountId,

    /// Stake in yocto units.
    #[serde_as(as = "DisplayFromStr")]
    pub stake: u128,

    #[serde(default)]
    pub num_produced_blocks: u64,

    #[serde(default)]
    pub num_expected_blocks: u64,

    #[serde(default)]
    pub num_produced_chunks: u64,

    #[serde(default)]
    pub num_expected_chunks: u64,

    #[serde(default)]
    pub num_produced_endorsements: u64,

    #[serde(default)]
    pub num_expected_endorsements: u64,
}

impl ValidatorRecord {
    pub fn production(&self, metric: Metric) -> Production {
        let (produced, expected) = match metric {
            Metric::Blocks => (self.num_produced_blocks, self.num_expected_blocks),
            Metric::Chunks => (self.num_produced_chunks, self.num_expected_chunks),
            Metric::Endorsements => (
                self.num_produced_endorsements,
                self.num_expected_endorsements,
            ),
        };

        Production { produced, expected }
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::{AccountId, Metric, Production, ValidatorSnapshot};
    use indoc::indoc;

    #[test]
    fn test_deserialize() {
        let json = indoc! {r#"{
            "current_validators": [
                {
                    "account_id": "lux.poolv1.near",
                    "public_key": "ed25519:abc",
                    "is_slashed": false,
                    "stake": "12345678900000000000000000000",
                    "shards": [0],
                    "num_produced_blocks": 17,
                    "num_expected_blocks": 20,
                    "num_produced_chunks": 40,
                    "num_expected_chunks": 40,
                    "num_produced_endorsements": 0,
                    "num_expected_endorsements": 0
                }
            ],
            "next_validators": [
                { "account_id": "other.poolv1.near", "stake": "1", "public_key": "ed25519:def" }
            ],
            "current_proposals": [],
            "epoch_start_height": 1000
        }"#};

        let snapshot = serde_json::from_str::<ValidatorSnapshot>(json).expect("snapshot");
        assert_eq!(snapshot.current.len(), 1);
        assert_eq!(snapshot.next.len(), 1);
        assert!(snapshot.proposals.is_empty());

        let record = &snapshot.current[0];
        assert_eq!(record.account_id, AccountId::from("lux.poolv1.near"));
        assert_eq!(record.stake, 12_345_678_900_000_000_000_000_000_000);
        assert_eq!(
            record.production(Metric::Blocks),
            Production {
                produced: 17,
                expected: 20
            }
        );

        let next = &snapshot.next[0];
        assert_eq!(next.production(Metric::Chunks), Production::default());

        let all = snapshot
            .all()
            .map(|record| record.account_id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(all, vec!["lux.poolv1.near", "other.poolv1.near"]);
    }

    #[test]
    fn test_deserialize_without_proposals() {
        let json = r#"{ "current_validators": [], "next_validators": [] }"#;
        let snapshot = serde_json::from_str::<ValidatorSnapshot>(json).expect("snapshot");
        assert_eq!(snapshot, ValidatorSnapshot::default());
    }
}
