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

pub mod json_rpc_node;
pub mod telegram;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    #[serde(rename = "node")]
    pub node_config: json_rpc_node::Config,

    #[serde(rename = "telegram")]
    pub telegram_config: telegram::Config,
}
