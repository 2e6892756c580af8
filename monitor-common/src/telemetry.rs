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

use fastrace::collector::{Config as CollectorConfig, ConsoleReporter};
use log::info;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};

/// Telemetry configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(rename = "tracing", default)]
    pub tracing_config: TracingConfig,

    #[serde(rename = "metrics", default)]
    pub metrics_config: MetricsConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TracingConfig {
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "metrics_address_default")]
    pub address: IpAddr,

    #[serde(default = "metrics_port_default")]
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            address: metrics_address_default(),
            port: metrics_port_default(),
        }
    }
}

/// Initialize logging: stdout, filtered by `RUST_LOG`.
pub fn init_logging() {
    logforth::starter_log::stdout().apply();
}

/// Initialize tracing: if enabled, finished spans are reported to the console.
pub fn init_tracing(config: TracingConfig) {
    if config.enabled {
        fastrace::set_reporter(ConsoleReporter, CollectorConfig::default());
        info!("tracing enabled");
    }
}

/// Initialize metrics: if enabled, a Prometheus exporter serves them over HTTP. Must be called
/// within a Tokio runtime.
pub fn init_metrics(config: MetricsConfig) -> Result<(), BuildError> {
    let MetricsConfig {
        enabled,
        address,
        port,
    } = config;

    if enabled {
        PrometheusBuilder::new()
            .with_http_listener((address, port))
            .install()?;
        info!(address:%, port; "metrics exporter listening");
    }

    Ok(())
}

fn metrics_address_default() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn metrics_port_default() -> u16 {
    9000
}

#[cfg(test)]
mod tests {
    use crate::telemetry::{Config, MetricsConfig};
    use figment::{
        Figment,
        providers::{Format, Yaml},
    };
    use std::net::{IpAddr, Ipv4Addr};

    #[test]
    fn test_defaults() {
        let config = Figment::new()
            .merge(Yaml::string("metrics:\n  enabled: true\n"))
            .extract::<Config>()
            .expect("telemetry config can be extracted");

        assert!(!config.tracing_config.enabled);
        let MetricsConfig {
            enabled,
            address,
            port,
        } = config.metrics_config;
        assert!(enabled);
        assert_eq!(address, IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        assert_eq!(port, 9000);
    }
}
