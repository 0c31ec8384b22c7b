// SPDX-License-Identifier: AGPL-3.0
// Mitra Shell - Main entry point
//
// Headless KlikQuick mitra app: the core's session gate, deep links and
// push handling driven from the command line.

mod bridge;
mod cli;
mod commands;
mod platform;
mod state;

use bridge::{AppBridge, LaunchOptions, ShellEvent};
use clap::Parser;
use cli::{Cli, Commands};
use mitra_core::{AppError, BannerEvent, NavigationTarget};
use state::AppState;
use std::process::ExitCode;
use std::thread;

fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mitra_shell=info".parse().unwrap())
                .add_directive("mitra_core=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("{}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), AppError> {
    let state = AppState::new(cli.config_dir, cli.api_url)?;
    let options = commands::launch_options(&cli.command)?;
    let bridge = AppBridge::new(&state, options)?;

    // Spawn event listener thread
    let event_rx = bridge.event_receiver();
    let printer = thread::spawn(move || {
        while let Ok(event) = event_rx.recv_blocking() {
            println!("{}", describe_event(&event));
        }
    });

    let result = match &cli.command {
        Commands::Launch { url, .. } => commands::launch(&bridge, url.clone()),
        Commands::Open { uri } => commands::open(&bridge, uri.clone()),
        Commands::Push {
            json,
            kind,
            press,
            wait,
        } => commands::push(&bridge, &state, json, *kind, *press, *wait),
        other => bridge.block_on(commands::run_service(&state, other)),
    };

    bridge.shutdown();
    let _ = printer.join();
    result
}

fn describe_event(event: &ShellEvent) -> String {
    match event {
        ShellEvent::Navigated(target) => format!("-> {}", describe_target(target)),
        ShellEvent::Banner(BannerEvent::Shown { title, body }) => {
            format!("[banner] {}: {}", title, body)
        }
        ShellEvent::Banner(BannerEvent::Hidden) => "[banner] hidden".to_string(),
        ShellEvent::App(event) => format!("[event] {:?}", event),
    }
}

fn describe_target(target: &NavigationTarget) -> String {
    if target.params.is_empty() {
        return target.route.to_string();
    }
    let params: Vec<String> = target
        .params
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect();
    format!("{} ({})", target.route, params.join(", "))
}
