use std::process;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use sse_stress_engine::core::show_result_with_table::{
    print_json, print_run_header, show_result_with_table,
};
use sse_stress_engine::models::args::Args;
use sse_stress_engine::{ConcurrencyController, RunConfig, RunProgress};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let as_json = args.json;
    let config = match RunConfig::try_from(args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(2);
        }
    };
    if !as_json {
        print_run_header(&config);
    }

    let bar = if as_json {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(config.rounds)
    };
    if let Ok(style) =
        ProgressStyle::with_template("{bar:40} {pos}/{len} done, {msg} in flight [{elapsed}]")
    {
        bar.set_style(style);
    }
    let bar_clone = bar.clone();
    let on_progress = move |p: RunProgress| {
        bar_clone.set_position(p.completed);
        bar_clone.set_message(p.in_flight.to_string());
    };

    let controller = match ConcurrencyController::new(config.clone()) {
        Ok(controller) => controller,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    };
    match controller.run(Some(on_progress)).await {
        Ok(summary) => {
            bar.finish_and_clear();
            let printed = if as_json {
                print_json(&config, &summary)
            } else {
                show_result_with_table(&summary);
                Ok(())
            };
            if let Err(e) = printed {
                eprintln!("Error: {:#}", e);
                process::exit(1);
            }
        }
        Err(e) => {
            bar.abandon();
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}
