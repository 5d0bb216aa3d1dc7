use circle_sampler::config::{RunConfig, THREADS_ENV};
use circle_sampler::{available_workers, SamplingSession, Tally};
use log::info;
use std::env;
use std::time::Instant;

fn print_usage(program: &str) {
    eprintln!("Usage: {} <points> [threads] [batches]", program);
    eprintln!("  points: samples drawn per batch");
    eprintln!(
        "  threads: optional, defaults to ${} or the hardware thread count",
        THREADS_ENV
    );
    eprintln!("  batches: optional, defaults to 1");
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("circle_sampler");

    let config = match RunConfig::from_args(args.get(1..).unwrap_or_default()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{}", err);
            print_usage(program);
            std::process::exit(1);
        }
    };

    println!("Available hardware threads: {}", available_workers());
    info!(
        "Sampling {} points x {} batches with {} requested threads",
        config.points, config.batches, config.threads
    );

    let mut session = SamplingSession::new();
    let mut tally = Tally::default();

    let start = Instant::now();
    for batch in 0..config.batches {
        match session.sample(config.points, config.threads) {
            Ok(samples) => tally.record(&samples),
            Err(err) => {
                eprintln!("Batch {} failed: {}", batch, err);
                std::process::exit(1);
            }
        }
    }
    let elapsed = start.elapsed();

    println!("Effective threads: {}", session.effective_threads().unwrap_or(1));
    println!("Total samples: {}", tally.total);
    println!("Points inside circle: {}", tally.inside);
    println!("Sampling time: {}ms", elapsed.as_millis());
    if elapsed.as_secs_f64() > 0.0 {
        println!(
            "Points per second: {:.0}",
            tally.total as f64 / elapsed.as_secs_f64()
        );
    }
    if let (Some(estimate), Some(error)) = (tally.ratio_estimate(), tally.pi_error()) {
        println!("Pi estimate: {:.6}", estimate);
        println!("Error: {:.6}", error);
    }
}
