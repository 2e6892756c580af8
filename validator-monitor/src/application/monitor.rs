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

use crate::{
    application::notification::Outbox,
    domain::{
        AccountId, AlertDebouncer, BadnessPolicy, ChatId, FailureCounter, FetchError, Metric,
        Node, PerMetric, ResilientFetcher, ValidatorSnapshot, extract_current,
    },
};
use fastrace::trace;
use itertools::Itertools;
use log::{debug, error, info};
use metrics::gauge;
use monitor_common::error::StdErrorExt;
use std::{sync::Arc, time::Duration};
use tokio::time::{Instant, sleep};

/// Outcome of a single monitor cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    /// The monitored account is not among the current validators.
    AccountNotFound,

    /// Nothing to alert about, either healthy or debounced.
    Quiet,

    /// An alert for the given metrics has been posted.
    Alerted(Vec<Metric>),
}

/// Periodically checks the monitored account and posts debounced alerts. Owns all alerting state,
/// which therefore needs no synchronization.
pub struct Monitor<N> {
    fetcher: ResilientFetcher<N>,
    account_id: AccountId,
    policy: BadnessPolicy,
    debouncers: PerMetric<AlertDebouncer>,
    failures: FailureCounter,
    outbox: Outbox,
    admin_chat_id: ChatId,
    started_at: Instant,
}

impl<N> Monitor<N>
where
    N: Node,
{
    pub fn new(
        fetcher: ResilientFetcher<N>,
        account_id: AccountId,
        policy: BadnessPolicy,
        alert_schedule: Arc<[Duration]>,
        failures: FailureCounter,
        outbox: Outbox,
        admin_chat_id: ChatId,
    ) -> Self {
        Self {
            fetcher,
            account_id,
            policy,
            debouncers: PerMetric::from_fn(|_| AlertDebouncer::new(alert_schedule.clone())),
            failures,
            outbox,
            admin_chat_id,
            started_at: Instant::now(),
        }
    }

    /// Run cycles forever, waiting the given interval after each; a failed cycle is logged and
    /// does not affect the next one. Cancel by dropping the returned future.
    pub async fn run(mut self, interval: Duration) -> anyhow::Result<()> {
        info!(account_id:% = self.account_id, interval:?; "starting monitor");

        loop {
            match self.check().await {
                Ok(outcome) => debug!(outcome:?; "monitor cycle completed"),
                Err(error) => error!(error:% = error.as_chain(); "monitor cycle failed"),
            }

            sleep(interval).await;
        }
    }

    /// Run a single cycle: fetch, extract, debounce and possibly alert.
    #[trace]
    pub async fn check(&mut self) -> Result<CheckOutcome, FetchError<N::Error>> {
        let snapshot = self.fetch().await?;

        let Some(reading) = extract_current(&snapshot, &self.account_id) else {
            info!(account_id:% = self.account_id; "account not among current validators");
            return Ok(CheckOutcome::AccountNotFound);
        };

        let now = self.started_at.elapsed();
        let alerting = Metric::ALL
            .into_iter()
            .filter(|&metric| {
                let badness = self.policy.badness(&reading, metric);
                gauge!("validator_monitor_percentage", "metric" => metric.to_string())
                    .set(reading.production(metric).display_percentage());
                gauge!("validator_monitor_badness", "metric" => metric.to_string())
                    .set(badness as f64);

                self.debouncers.get_mut(metric).observe(badness, now)
            })
            .collect::<Vec<_>>();

        if alerting.is_empty() {
            return Ok(CheckOutcome::Quiet);
        }

        let text = [format!("🚨 ALERT for {} 🚨", self.account_id)]
            .into_iter()
            .chain(
                alerting
                    .iter()
                    .map(|&metric| self.policy.describe(&reading, metric)),
            )
            .join("\n");
        info!(metrics:? = alerting; "posting alert");
        self.outbox.post(self.admin_chat_id, text);

        Ok(CheckOutcome::Alerted(alerting))
    }

    async fn fetch(&mut self) -> Result<ValidatorSnapshot, FetchError<N::Error>> {
        let result = self.fetcher.fetch().await;

        let signal = match &result {
            Ok(_) => self.failures.record_success(),
            Err(FetchError::Exhausted { source, .. }) => self
                .failures
                .record_failure(self.fetcher.pool().len(), source.as_chain()),
        };

        if let Some(signal) = signal {
            info!(signal:?; "connection health changed");
            self.outbox.post(self.admin_chat_id, signal.to_string());
        }

        result
    }
}
