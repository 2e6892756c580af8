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

mod badness;
mod chat;
mod debouncer;
mod endpoint_pool;
mod fetcher;
mod health;
mod node;
mod reading;
mod report;
mod snapshot;

pub use badness::*;
pub use chat::*;
pub use debouncer::*;
pub use endpoint_pool::*;
pub use fetcher::*;
pub use health::*;
pub use node::*;
pub use reading::*;
pub use report::*;
pub use snapshot::*;
