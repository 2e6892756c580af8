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

#[tokio::main]
async fn main() {
    use log::error;
    use monitor_common::telemetry;
    use std::panic;

    telemetry::init_logging();
    panic::set_hook(Box::new(|panic| error!(panic:%; "process panicked")));

    if let Err(error) = run().await {
        let backtrace = error.backtrace();
        let error = format!("{error:#}");
        error!(error, backtrace:%; "process exited with ERROR");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    use anyhow::Context;
    use log::info;
    use monitor_common::{config::ConfigExt, telemetry};
    use std::sync::Arc;
    use tokio::signal::unix::{SignalKind, signal};
    use validator_monitor::{
        application,
        config::Config,
        domain::EndpointPool,
        infra::{self, json_rpc_node::JsonRpcNode, telegram::TelegramChat},
    };

    let sigterm = signal(SignalKind::terminate()).context("register SIGTERM handler")?;
    let config = Config::load().context("load configuration")?;
    info!(config:?; "starting");
    let Config {
        application_config,
        infra_config,
        telemetry_config:
            telemetry::Config {
                tracing_config,
                metrics_config,
            },
    } = config;

    telemetry::init_tracing(tracing_config);
    telemetry::init_metrics(metrics_config).context("initialize metrics")?;

    let infra::Config {
        node_config,
        telegram_config,
    } = infra_config;

    let pool = EndpointPool::new(node_config.endpoints.clone()).context("create endpoint pool")?;
    let node = JsonRpcNode::new(&node_config).context("create JSON-RPC node client")?;
    let chat = TelegramChat::new(telegram_config).context("create Telegram chat")?;

    application::run(application_config, Arc::new(pool), node, chat, sigterm)
        .await
        .context("run validator monitor application")
}
