/********************************************************************************
 * Copyright (c) 2026 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

mod config;

use crate::config::Config;
use binding_mqtt::MqttBrokerServer;
use clap::Parser;
use std::error::Error;
use std::fs;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Parser)]
#[command(about = "Runs the MQTT protocol binding from a json5 configuration file")]
struct BindingArgs {
    #[arg(short, long, value_name = "FILE")]
    config: String,
}

fn init_logging(filter: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter.unwrap_or(DEFAULT_LOG_FILTER)));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = BindingArgs::parse();
    let contents = fs::read_to_string(&args.config)
        .map_err(|e| format!("Unable to read config file {}: {e}", args.config))?;
    let config: Config = json5::from_str(&contents)
        .map_err(|e| format!("Unable to parse config file {}: {e}", args.config))?;

    init_logging(config.logging.filter.as_deref());
    info!("Started binding-mqtt-configurable");

    let mut server = MqttBrokerServer::new(config.binding_mqtt)?;
    server.start().await?;
    info!(
        state = ?server.connection_state(),
        address = server.address().unwrap_or("none"),
        port = server.port().unwrap_or_default(),
        "binding ready; press Ctrl-C to stop"
    );

    tokio::signal::ctrl_c().await?;

    info!("Stopping binding-mqtt-configurable");
    server.stop().await?;
    Ok(())
}
