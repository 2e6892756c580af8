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

pub mod monitor;
pub mod notification;
pub mod query;

use crate::{
    application::{monitor::Monitor, notification::Outbox, query::QueryHandler},
    domain::{
        AccountId, BadnessPolicy, Chat, ChatId, DEFAULT_ALERT_SCHEDULE,
        DEFAULT_DOWN_ALERT_THRESHOLD, EndpointPool, FailureCounter, Node, ResilientFetcher,
        RetryConfig,
    },
};
use anyhow::{Context, bail};
use log::{info, warn};
use serde::{Deserialize, Deserializer};
use std::{collections::HashSet, num::NonZeroU32, sync::Arc, time::Duration};
use tokio::{select, signal::unix::Signal, task};

const OUTBOX_CAPACITY: usize = 64;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// The monitored validator account.
    pub account_id: AccountId,

    /// Chat receiving alerts; always allowed to query.
    pub admin_chat_id: ChatId,

    /// Further chats allowed to query.
    #[serde(default)]
    pub allowed_chat_ids: Vec<ChatId>,

    #[serde(with = "humantime_serde", default = "check_interval_default")]
    pub check_interval: Duration,

    #[serde(default)]
    pub alert_policy: BadnessPolicy,

    /// Silence before each successive alert for an unchanged condition.
    #[serde(
        deserialize_with = "deserialize_durations",
        default = "alert_schedule_default"
    )]
    pub alert_schedule: Vec<Duration>,

    /// Number of consecutive failed checks after which the endpoints are reported as down.
    #[serde(default = "down_alert_threshold_default")]
    pub down_alert_threshold: NonZeroU32,

    #[serde(default)]
    pub retry: RetryConfig,
}

pub async fn run(
    config: Config,
    pool: Arc<EndpointPool>,
    node: impl Node,
    chat: impl Chat,
    mut sigterm: Signal,
) -> anyhow::Result<()> {
    let Config {
        account_id,
        admin_chat_id,
        allowed_chat_ids,
        check_interval,
        alert_policy,
        alert_schedule,
        down_alert_threshold,
        retry,
    } = config;

    if alert_schedule.is_empty() {
        bail!("alert schedule must not be empty");
    }

    let (outbox, notifications) = Outbox::channel(OUTBOX_CAPACITY);
    let fetcher = ResilientFetcher::new(node, pool, retry);

    let notification_task = task::spawn(notification::deliver(chat.clone(), notifications));

    let monitor_task = task::spawn({
        let monitor = Monitor::new(
            fetcher.clone(),
            account_id.clone(),
            alert_policy,
            alert_schedule.into(),
            FailureCounter::new(down_alert_threshold),
            outbox.clone(),
            admin_chat_id,
        );

        monitor.run(check_interval)
    });

    let query_task = task::spawn({
        let allowed_chat_ids = allowed_chat_ids
            .into_iter()
            .chain([admin_chat_id])
            .collect::<HashSet<_>>();
        let handler = QueryHandler::new(fetcher, account_id, allowed_chat_ids, outbox);

        handler.run(chat)
    });

    info!("validator monitor started");

    let abort_handles = [
        notification_task.abort_handle(),
        monitor_task.abort_handle(),
        query_task.abort_handle(),
    ];

    let result = select! {
        result = monitor_task => result
            .context("monitor_task panicked")
            .and_then(|r| r.context("monitor_task failed")),

        result = query_task => result
            .context("query_task panicked")
            .and_then(|r| r.context("query_task failed")),

        _ = sigterm.recv() => {
            warn!("SIGTERM received");
            Ok(())
        }

        _ = tokio::signal::ctrl_c() => {
            warn!("SIGINT received");
            Ok(())
        }
    };

    // Cancel in-flight fetches, backoff sleeps and deliveries.
    for handle in abort_handles {
        handle.abort();
    }

    result
}

fn check_interval_default() -> Duration {
    Duration::from_secs(30)
}

fn alert_schedule_default() -> Vec<Duration> {
    DEFAULT_ALERT_SCHEDULE.to_vec()
}

fn deserialize_durations<'de, D>(deserializer: D) -> Result<Vec<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    let durations = Vec::<humantime_serde::Serde<Duration>>::deserialize(deserializer)?;
    Ok(durations.into_iter().map(|d| d.into_inner()).collect())
}

fn down_alert_threshold_default() -> NonZeroU32 {
    DEFAULT_DOWN_ALERT_THRESHOLD
}

#[cfg(test)]
mod tests {
    use crate::{
        application::Config,
        domain::{BadnessPolicy, ChatId, DEFAULT_ALERT_SCHEDULE, PerMetric, RetryConfig},
    };
    use indoc::indoc;
    use std::time::Duration;

    #[test]
    fn test_config_defaults() {
        let config = serde_json::from_str::<Config>(
            r#"{ "account_id": "lux.poolv1.near", "admin_chat_id": 123 }"#,
        )
        .expect("config can be deserialized");

        assert_eq!(config.account_id.as_str(), "lux.poolv1.near");
        assert_eq!(config.admin_chat_id, ChatId(123));
        assert!(config.allowed_chat_ids.is_empty());
        assert_eq!(config.check_interval, Duration::from_secs(30));
        assert_eq!(config.alert_policy, BadnessPolicy::default());
        assert_eq!(config.alert_schedule, DEFAULT_ALERT_SCHEDULE.to_vec());
        assert_eq!(config.down_alert_threshold.get(), 3);
        assert_eq!(config.retry, RetryConfig::default());
    }

    #[test]
    fn test_config() {
        let json = indoc! {r#"{
            "account_id": "lux.poolv1.near",
            "admin_chat_id": -100,
            "allowed_chat_ids": [1, 2],
            "check_interval": "1m",
            "alert_policy": { "mode": "max_missed", "blocks": 1, "chunks": 2, "endorsements": 3 },
            "alert_schedule": ["0s", "2m"],
            "down_alert_threshold": 5,
            "retry": { "attempts": 3, "base_delay": "500ms", "max_delay": "5s" }
        }"#};
        let config = serde_json::from_str::<Config>(json).expect("config can be deserialized");

        assert_eq!(config.admin_chat_id, ChatId(-100));
        assert_eq!(config.allowed_chat_ids, vec![ChatId(1), ChatId(2)]);
        assert_eq!(config.check_interval, Duration::from_secs(60));
        assert_eq!(
            config.alert_policy,
            BadnessPolicy::MaxMissed(PerMetric {
                blocks: 1,
                chunks: 2,
                endorsements: 3
            })
        );
        assert_eq!(
            config.alert_schedule,
            vec![Duration::ZERO, Duration::from_secs(120)]
        );
        assert_eq!(config.down_alert_threshold.get(), 5);
        assert_eq!(config.retry.attempts.get(), 3);
        assert_eq!(config.retry.base_delay, Duration::from_millis(500));
        assert_eq!(config.retry.max_delay, Duration::from_secs(5));
    }
}
