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

use crate::domain::{EndpointPool, Node, ValidatorSnapshot};
use fastrace::trace;
use log::{debug, warn};
use metrics::counter;
use monitor_common::error::StdErrorExt;
use serde::Deserialize;
use std::{num::NonZeroU32, sync::Arc, time::Duration};
use thiserror::Error;
use tokio::time::sleep;

const DEFAULT_ATTEMPTS: NonZeroU32 = NonZeroU32::new(6).unwrap();

/// Retry configuration for fetching the validator set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "attempts_default")]
    pub attempts: NonZeroU32,

    #[serde(with = "humantime_serde", default = "base_delay_default")]
    pub base_delay: Duration,

    #[serde(with = "humantime_serde", default = "max_delay_default")]
    pub max_delay: Duration,
}

impl RetryConfig {
    /// Delay after the given zero-based failed attempt: exponential without jitter, capped.
    pub fn delay(&self, attempt: u32) -> Duration {
        2u32.checked_pow(attempt)
            .and_then(|factor| self.base_delay.checked_mul(factor))
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: attempts_default(),
            base_delay: base_delay_default(),
            max_delay: max_delay_default(),
        }
    }
}

/// Fetches the validator set with bounded retries: after each failed attempt the endpoint pool is
/// rotated and the next attempt is delayed with exponential backoff. Attempts are strictly
/// sequential.
#[derive(Debug, Clone)]
pub struct ResilientFetcher<N> {
    node: N,
    pool: Arc<EndpointPool>,
    retry: RetryConfig,
}

impl<N> ResilientFetcher<N>
where
    N: Node,
{
    pub fn new(node: N, pool: Arc<EndpointPool>, retry: RetryConfig) -> Self {
        Self { node, pool, retry }
    }

    pub fn pool(&self) -> &EndpointPool {
        &self.pool
    }

    #[trace]
    pub async fn fetch(&self) -> Result<ValidatorSnapshot, FetchError<N::Error>> {
        let attempts = self.retry.attempts.get();
        let mut attempt = 0;

        loop {
            let endpoint = self.pool.current();
            counter!("validator_monitor_rpc_attempts_total").increment(1);

            match self.node.validators(&endpoint).await {
                Ok(snapshot) => {
                    debug!(endpoint:%, attempt; "fetched validator set");
                    return Ok(snapshot);
                }

                Err(error) => {
                    counter!("validator_monitor_rpc_failures_total").increment(1);
                    self.pool.rotate();

                    if attempt + 1 == attempts {
                        counter!("validator_monitor_fetches_exhausted_total").increment(1);
                        return Err(FetchError::Exhausted {
                            attempts,
                            source: error,
                        });
                    }

                    let delay = self.retry.delay(attempt);
                    warn!(
                        endpoint:%,
                        attempt,
                        delay:?,
                        error:% = error.as_chain();
                        "cannot fetch validator set, retrying"
                    );
                    sleep(delay).await;

                    attempt += 1;
                }
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum FetchError<E>
where
    E: std::error::Error + 'static,
{
    #[error("cannot fetch validator set within {attempts} attempts")]
    Exhausted {
        attempts: u32,
        #[source]
        source: E,
    },
}

fn attempts_default() -> NonZeroU32 {
    DEFAULT_ATTEMPTS
}

fn base_delay_default() -> Duration {
    Duration::from_secs(1)
}

fn max_delay_default() -> Duration {
    Duration::from_secs(20)
}

#[cfg(test)]
pub(crate) mod tests {
    use crate::domain::{
        Endpoint, EndpointPool, FetchError, Node, ResilientFetcher, RetryConfig,
        ValidatorSnapshot,
    };
    use assert_matches::assert_matches;
    use parking_lot::Mutex;
    use std::{
        num::NonZeroU32,
        sync::{
            Arc,
            atomic::{AtomicUsize, Ordering},
        },
        time::Duration,
    };
    use thiserror::Error;
    use tokio::time::Instant;

    #[derive(Debug, Error)]
    #[error("mock node failure")]
    pub struct MockError;

    /// Fails the given number of calls, then returns the given snapshot.
    #[derive(Debug, Clone, Default)]
    pub struct MockNode {
        pub failures: Arc<AtomicUsize>,
        pub calls: Arc<Mutex<Vec<Endpoint>>>,
        pub snapshot: Arc<Mutex<ValidatorSnapshot>>,
    }

    impl MockNode {
        pub fn failing(failures: usize) -> Self {
            let node = Self::default();
            node.failures.store(failures, Ordering::SeqCst);
            node
        }

        pub fn called(&self) -> Vec<String> {
            self.calls
                .lock()
                .iter()
                .map(|endpoint| endpoint.to_string())
                .collect()
        }
    }

    impl Node for MockNode {
        type Error = MockError;

        async fn validators(&self, endpoint: &Endpoint) -> Result<ValidatorSnapshot, MockError> {
            self.calls.lock().push(endpoint.to_owned());

            let failures = self.failures.load(Ordering::SeqCst);
            if failures > 0 {
                self.failures.store(failures - 1, Ordering::SeqCst);
                Err(MockError)
            } else {
                Ok(self.snapshot.lock().clone())
            }
        }
    }

    pub fn pool(endpoints: &[&str]) -> Arc<EndpointPool> {
        let endpoints = endpoints.iter().map(|&e| Endpoint::from(e)).collect();
        Arc::new(EndpointPool::new(endpoints).expect("pool can be created"))
    }

    #[test]
    fn test_delay() {
        let retry = RetryConfig::default();
        let delays = (0..8).map(|attempt| retry.delay(attempt)).collect::<Vec<_>>();
        let expected = [1, 2, 4, 8, 16, 20, 20, 20]
            .into_iter()
            .map(Duration::from_secs)
            .collect::<Vec<_>>();
        assert_eq!(delays, expected);

        assert_eq!(retry.delay(u32::MAX), Duration::from_secs(20));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_recovers() {
        let node = MockNode::failing(2);
        let pool = pool(&["a", "b", "c"]);
        let fetcher = ResilientFetcher::new(node.clone(), pool.clone(), RetryConfig::default());

        let started_at = Instant::now();
        let snapshot = fetcher.fetch().await;
        assert_matches!(snapshot, Ok(s) if s == ValidatorSnapshot::default());

        // Two rotations and backoffs of 1s and 2s.
        assert_eq!(node.called(), vec!["a", "b", "c"]);
        assert_eq!(pool.cursor(), 2);
        assert_eq!(started_at.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_exhausted() {
        let node = MockNode::failing(usize::MAX);
        let pool = pool(&["a", "b"]);
        let fetcher = ResilientFetcher::new(node.clone(), pool.clone(), RetryConfig::default());

        let started_at = Instant::now();
        let result = fetcher.fetch().await;
        assert_matches!(result, Err(FetchError::Exhausted { attempts: 6, .. }));

        assert_eq!(node.called(), vec!["a", "b", "a", "b", "a", "b"]);
        // Six rotations on a pool of two end where they started.
        assert_eq!(pool.cursor(), 0);
        // No backoff after the last attempt: 1 + 2 + 4 + 8 + 16.
        assert_eq!(started_at.elapsed(), Duration::from_secs(31));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_single_attempt() {
        let node = MockNode::failing(1);
        let retry = RetryConfig {
            attempts: NonZeroU32::MIN,
            ..Default::default()
        };
        let fetcher = ResilientFetcher::new(node.clone(), pool(&["a", "b"]), retry);

        assert_matches!(
            fetcher.fetch().await,
            Err(FetchError::Exhausted { attempts: 1, .. })
        );
        assert_eq!(fetcher.pool().cursor(), 1);
        assert_matches!(fetcher.fetch().await, Ok(_));
        assert_eq!(node.called(), vec!["a", "b"]);
    }
}
