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

use std::{fmt, num::NonZeroU32};

pub const DEFAULT_DOWN_ALERT_THRESHOLD: NonZeroU32 = NonZeroU32::new(3).unwrap();

/// Tracks consecutive failed fetches to signal once when all endpoints seem to be down and once
/// when the connection is restored.
#[derive(Debug, Clone)]
pub struct FailureCounter {
    threshold: NonZeroU32,
    consecutive_failures: u32,
    down_signaled: bool,
}

impl FailureCounter {
    pub fn new(threshold: NonZeroU32) -> Self {
        Self {
            threshold,
            consecutive_failures: 0,
            down_signaled: false,
        }
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Record a successful fetch; signals [HealthSignal::Restored] if preceded by failures.
    pub fn record_success(&mut self) -> Option<HealthSignal> {
        let failures = self.consecutive_failures;
        self.consecutive_failures = 0;
        self.down_signaled = false;

        (failures > 0).then_some(HealthSignal::Restored { failures })
    }

    /// Record a failed fetch; signals [HealthSignal::Down] once the threshold is reached.
    pub fn record_failure(
        &mut self,
        endpoint_count: usize,
        error: impl fmt::Display,
    ) -> Option<HealthSignal> {
        self.consecutive_failures += 1;

        if self.consecutive_failures >= self.threshold.get() && !self.down_signaled {
            self.down_signaled = true;

            Some(HealthSignal::Down {
                endpoint_count,
                failures: self.consecutive_failures,
                error: error.to_string(),
            })
        } else {
            None
        }
    }
}

impl Default for FailureCounter {
    fn default() -> Self {
        Self::new(DEFAULT_DOWN_ALERT_THRESHOLD)
    }
}

/// Edge-triggered connection health change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthSignal {
    Down {
        endpoint_count: usize,
        failures: u32,
        error: String,
    },

    Restored {
        failures: u32,
    },
}

impl fmt::Display for HealthSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthSignal::Down {
                endpoint_count,
                failures,
                error,
            } => write!(
                f,
                "🔥 All {endpoint_count} RPC endpoints are unreachable \
                 ({failures} consecutive failed checks). Last error: {error}"
            ),

            HealthSignal::Restored { failures } => {
                write!(f, "✅ RPC connection restored after {failures} failed checks.")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::{FailureCounter, HealthSignal};
    use assert_matches::assert_matches;

    #[test]
    fn test_down_and_restored() {
        let mut counter = FailureCounter::default();

        assert_eq!(counter.record_failure(2, "boom"), None);
        assert_eq!(counter.record_failure(2, "boom"), None);
        assert_eq!(
            counter.record_failure(2, "boom"),
            Some(HealthSignal::Down {
                endpoint_count: 2,
                failures: 3,
                error: "boom".to_string()
            })
        );
        assert_eq!(counter.record_failure(2, "boom"), None);
        assert_eq!(counter.consecutive_failures(), 4);

        assert_eq!(
            counter.record_success(),
            Some(HealthSignal::Restored { failures: 4 })
        );
        assert_eq!(counter.consecutive_failures(), 0);
        assert_eq!(counter.record_success(), None);

        // Armed again after the restore.
        for _ in 0..2 {
            assert_eq!(counter.record_failure(2, "boom"), None);
        }
        assert_matches!(
            counter.record_failure(2, "boom"),
            Some(HealthSignal::Down { failures: 3, .. })
        );
    }

    #[test]
    fn test_display() {
        let down = HealthSignal::Down {
            endpoint_count: 2,
            failures: 3,
            error: "timeout".to_string(),
        };
        assert_eq!(
            down.to_string(),
            "🔥 All 2 RPC endpoints are unreachable (3 consecutive failed checks). \
             Last error: timeout"
        );

        let restored = HealthSignal::Restored { failures: 3 };
        assert_eq!(
            restored.to_string(),
            "✅ RPC connection restored after 3 failed checks."
        );
    }
}
