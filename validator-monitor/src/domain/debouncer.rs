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

use std::{sync::Arc, time::Duration};

/// Silence before each successive alert while a condition persists unchanged: alert at once,
/// then after one minute, then after five minutes, then never again.
pub const DEFAULT_ALERT_SCHEDULE: [Duration; 3] = [
    Duration::ZERO,
    Duration::from_secs(60),
    Duration::from_secs(300),
];

/// Debounce state of a single metric. Times are offsets from an arbitrary fixed origin, e.g. the
/// start of the monitor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlertState {
    /// Last observed badness.
    pub last_value: u64,

    /// Index into the schedule; equal to the schedule length once saturated.
    pub stage: usize,

    /// Earliest time of the next alert; zero once saturated.
    pub next_eligible: Duration,
}

/// Decides whether to alert for a given badness at a given time: a new or changed badness alerts
/// immediately, an unchanged one is repeated following the schedule and then suppressed until it
/// changes or clears.
#[derive(Debug, Clone)]
pub struct AlertDebouncer {
    schedule: Arc<[Duration]>,
    state: AlertState,
}

impl AlertDebouncer {
    pub fn new(schedule: Arc<[Duration]>) -> Self {
        Self {
            schedule,
            state: AlertState::default(),
        }
    }

    pub fn state(&self) -> AlertState {
        self.state
    }

    /// Observe the given badness at the given time and return whether to alert now.
    pub fn observe(&mut self, value: u64, now: Duration) -> bool {
        if value == 0 {
            self.state = AlertState::default();
            return false;
        }

        if value != self.state.last_value {
            self.state = AlertState {
                last_value: value,
                stage: 0,
                next_eligible: now,
            };
        }

        if self.state.stage >= self.schedule.len() || now < self.state.next_eligible {
            return false;
        }

        self.state.stage += 1;
        match self
            .schedule
            .get(self.state.stage)
            .and_then(|silence| now.checked_add(*silence))
        {
            Some(next_eligible) => self.state.next_eligible = next_eligible,

            // Saturated, also if the next silence is beyond representable time.
            None => {
                self.state.stage = self.schedule.len();
                self.state.next_eligible = Duration::ZERO;
            }
        }

        true
    }
}

impl Default for AlertDebouncer {
    fn default() -> Self {
        Self::new(Arc::new(DEFAULT_ALERT_SCHEDULE))
    }
}
