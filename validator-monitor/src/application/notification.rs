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

use crate::domain::{ChatId, Notifier};
use log::{debug, error, warn};
use metrics::counter;
use monitor_common::error::StdErrorExt;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub chat_id: ChatId,
    pub text: String,
}

/// Sending side of the notification channel; posting never blocks and never fails the caller.
#[derive(Debug, Clone)]
pub struct Outbox(mpsc::Sender<Notification>);

impl Outbox {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Notification>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self(sender), receiver)
    }

    /// Queue the given text for delivery to the given chat; dropped with a warning if the queue
    /// is full or closed.
    pub fn post(&self, chat_id: ChatId, text: impl Into<String>) {
        let notification = Notification {
            chat_id,
            text: text.into(),
        };

        if let Err(error) = self.0.try_send(notification) {
            counter!("validator_monitor_notifications_dropped_total").increment(1);
            warn!(chat_id:%, error:%; "cannot queue notification");
        }
    }
}

/// Deliver queued notifications until all [Outbox]es are dropped. Delivery is best effort:
/// failures are logged and not retried.
pub async fn deliver(notifier: impl Notifier, mut notifications: mpsc::Receiver<Notification>) {
    while let Some(Notification { chat_id, text }) = notifications.recv().await {
        match notifier.send(chat_id, &text).await {
            Ok(()) => {
                counter!("validator_monitor_notifications_sent_total").increment(1);
                debug!(chat_id:%; "notification sent");
            }

            Err(error) => {
                counter!("validator_monitor_notification_failures_total").increment(1);
                error!(chat_id:%, error:% = error.as_chain(); "cannot send notification");
            }
        }
    }

    warn!("notification channel closed");
}
