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
        AccountId, Chat, ChatId, Node, ResilientFetcher, ValidatorSnapshot, next_validators,
        pool_info, proposals,
    },
};
use log::{debug, warn};
use monitor_common::error::StdErrorExt;
use std::{collections::HashSet, time::Duration};
use tokio::time::sleep;

const RECEIVE_RETRY_DELAY: Duration = Duration::from_secs(5);

const POOL_INFO: &str = "ℹ My pool info";
const NEXT: &str = "⏩ Next";
const PROPOSALS: &str = "⏩ Proposals";
const MENU: [&str; 3] = [POOL_INFO, PROPOSALS, NEXT];

/// Chat commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    PoolInfo,
    Next,
    Proposals,
    Unknown,
}

impl Command {
    pub fn parse(text: &str) -> Self {
        match text.trim() {
            "/start" => Command::Start,
            POOL_INFO | "My pool info" => Command::PoolInfo,
            NEXT | "Next" => Command::Next,
            PROPOSALS | "Proposals" => Command::Proposals,
            _ => Command::Unknown,
        }
    }
}

/// Answers chat queries about the monitored account. Shares the endpoint pool with the monitor
/// but not its failure tracking.
pub struct QueryHandler<N> {
    fetcher: ResilientFetcher<N>,
    account_id: AccountId,
    allowed_chat_ids: HashSet<ChatId>,
    outbox: Outbox,
}

impl<N> QueryHandler<N>
where
    N: Node,
{
    pub fn new(
        fetcher: ResilientFetcher<N>,
        account_id: AccountId,
        allowed_chat_ids: HashSet<ChatId>,
        outbox: Outbox,
    ) -> Self {
        Self {
            fetcher,
            account_id,
            allowed_chat_ids,
            outbox,
        }
    }

    /// Receive and answer messages forever; receive errors are logged and retried after a delay.
    pub async fn run(self, mut chat: impl Chat) -> anyhow::Result<()> {
        loop {
            let messages = match chat.receive().await {
                Ok(messages) => messages,

                Err(error) => {
                    warn!(error:% = error.as_chain(); "cannot receive chat messages");
                    sleep(RECEIVE_RETRY_DELAY).await;
                    continue;
                }
            };

            for message in messages {
                if !self.allowed_chat_ids.contains(&message.chat_id) {
                    debug!(chat_id:% = message.chat_id; "ignoring message from unknown chat");
                    continue;
                }

                let command = Command::parse(&message.text);
                debug!(chat_id:% = message.chat_id, command:?; "handling command");

                if command == Command::Start {
                    let result = chat.send_menu(message.chat_id, "Select option:", &MENU).await;
                    if let Err(error) = result {
                        warn!(error:% = error.as_chain(); "cannot send menu");
                    }
                } else {
                    let answer = self.answer(command).await;
                    self.outbox.post(message.chat_id, answer);
                }
            }
        }
    }

    /// Answer the given command; fetch failures are answered with an error text.
    pub async fn answer(&self, command: Command) -> String {
        let report: fn(&ValidatorSnapshot, &AccountId) -> String = match command {
            Command::PoolInfo => pool_info,
            Command::Next => next_validators,
            Command::Proposals => proposals,
            Command::Start | Command::Unknown => return "Unknown command".to_string(),
        };

        self.fetch()
            .await
            .map(|snapshot| report(&snapshot, &self.account_id))
            .unwrap_or_else(|error| format!("Error: {error}"))
    }

    async fn fetch(&self) -> Result<ValidatorSnapshot, String> {
        self.fetcher.fetch().await.map_err(|error| {
            warn!(error:% = error.as_chain(); "cannot answer query");
            error.as_chain().to_string()
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        application::{
            notification::Outbox,
            query::{Command, QueryHandler},
        },
        domain::{
            Chat, ChatId, IncomingMessage, Notifier, ResilientFetcher, RetryConfig,
            ValidatorSnapshot,
            testing::{MockError, MockNode, pool, record},
        },
    };
    use parking_lot::Mutex;
    use std::{
        collections::{HashSet, VecDeque},
        num::NonZeroU32,
        sync::{Arc, atomic::Ordering},
        time::Duration,
    };
    use tokio::time::timeout;

    /// Delivers the given batches of messages, then waits forever.
    #[derive(Debug, Clone, Default)]
    struct MockChat {
        sent: Arc<Mutex<Vec<(ChatId, String)>>>,
        batches: Arc<Mutex<VecDeque<Vec<IncomingMessage>>>>,
        menus: Arc<Mutex<Vec<ChatId>>>,
    }

    impl Notifier for MockChat {
        type Error = MockError;

        async fn send(&self, chat_id: ChatId, text: &str) -> Result<(), MockError> {
            self.sent.lock().push((chat_id, text.to_owned()));
            Ok(())
        }
    }

    impl Chat for MockChat {
        async fn receive(&mut self) -> Result<Vec<IncomingMessage>, MockError> {
            let batch = self.batches.lock().pop_front();
            match batch {
                Some(batch) => Ok(batch),
                None => futures::future::pending().await,
            }
        }

        async fn send_menu(
            &self,
            chat_id: ChatId,
            _text: &str,
            _buttons: &[&str],
        ) -> Result<(), MockError> {
            self.menus.lock().push(chat_id);
            Ok(())
        }
    }

    fn handler(node: &MockNode, outbox: Outbox) -> QueryHandler<MockNode> {
        let retry = RetryConfig {
            attempts: NonZeroU32::MIN,
            ..Default::default()
        };
        let fetcher = ResilientFetcher::new(node.clone(), pool(&["a"]), retry);

        QueryHandler::new(fetcher, "me".into(), HashSet::from([ChatId(1)]), outbox)
    }

    #[test]
    fn test_parse() {
        assert_eq!(Command::parse("/start"), Command::Start);
        assert_eq!(Command::parse("ℹ My pool info"), Command::PoolInfo);
        assert_eq!(Command::parse(" My pool info "), Command::PoolInfo);
        assert_eq!(Command::parse("⏩ Next"), Command::Next);
        assert_eq!(Command::parse("Proposals"), Command::Proposals);
        assert_eq!(Command::parse("🎛 CPU"), Command::Unknown);
    }

    #[tokio::test(start_paused = true)]
    async fn test_answer() {
        let node = MockNode::default();
        *node.snapshot.lock() = ValidatorSnapshot {
            current: vec![record("me", 0)],
            ..Default::default()
        };
        let (outbox, _notifications) = Outbox::channel(8);
        let handler = handler(&node, outbox);

        let answer = handler.answer(Command::PoolInfo).await;
        assert!(answer.starts_with("ℹ Pool Info: me\n"));
        assert!(answer.contains("Rank by stake: 1/1"));

        let answer = handler.answer(Command::Proposals).await;
        assert_eq!(answer, "ℹ Your validator is not in this set.");

        let answer = handler.answer(Command::Unknown).await;
        assert_eq!(answer, "Unknown command");

        node.failures.store(1, Ordering::SeqCst);
        let answer = handler.answer(Command::Next).await;
        assert_eq!(
            answer,
            "Error: cannot fetch validator set within 1 attempts: mock node failure"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_run() {
        let node = MockNode::default();
        let (outbox, mut notifications) = Outbox::channel(8);
        let handler = handler(&node, outbox);

        let chat = MockChat::default();
        chat.batches.lock().push_back(vec![
            IncomingMessage {
                chat_id: ChatId(1),
                text: "/start".to_string(),
            },
            IncomingMessage {
                chat_id: ChatId(2),
                text: "Next".to_string(),
            },
            IncomingMessage {
                chat_id: ChatId(1),
                text: "hello".to_string(),
            },
        ]);

        let result = timeout(Duration::from_secs(60), handler.run(chat.clone())).await;
        assert!(result.is_err());

        assert_eq!(*chat.menus.lock(), vec![ChatId(1)]);
        let notification = notifications.try_recv().expect("answer is posted");
        assert_eq!(notification.chat_id, ChatId(1));
        assert_eq!(notification.text, "Unknown command");
        assert!(notifications.try_recv().is_err());
        assert!(node.called().is_empty());
        assert!(chat.sent.lock().is_empty());
    }
}
