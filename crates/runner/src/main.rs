use bastion_clock::SystemClock;
use bastion_runner::{BastionConfig, PaperScenario, PaperSession, SessionReport};
use log::info;
use std::sync::Arc;

fn print_help() {
    eprintln!(
        r#"Bastion - paper trading session for the execution and risk core

USAGE:
    bastion [OPTIONS]

OPTIONS:
    --config <PATH>      Load configuration from JSON file
    --scenario <PATH>    Load the paper scenario from JSON file
    --duration <SECS>    Override how long the risk monitor runs
    --help               Print this help message

ENVIRONMENT VARIABLES:
    RUST_LOG             Log level filter (default: info)

EXAMPLES:
    # Run the built-in demo scenario
    bastion

    # Tighter risk limits on a custom book
    bastion --config bastion.json --scenario book.json

    # Watch the monitor at tick level
    RUST_LOG=bastion_risk_manager=debug bastion --duration 10
"#
    );
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();
    let mut config_path: Option<String> = None;
    let mut scenario_path: Option<String> = None;
    let mut duration: Option<u64> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            flag @ ("--config" | "-c" | "--scenario" | "-s" | "--duration" | "-d") => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Error: {} requires an argument", flag);
                    std::process::exit(1);
                }
                let value = args[i].clone();
                match flag {
                    "--config" | "-c" => config_path = Some(value),
                    "--scenario" | "-s" => scenario_path = Some(value),
                    _ => duration = Some(value.parse()?),
                }
            }
            arg => {
                eprintln!("Unknown argument: {}", arg);
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let config = match config_path {
        Some(path) => {
            info!("[RUNNER] Loading configuration from: {}", path);
            BastionConfig::from_file(&path)?
        }
        None => {
            info!("[RUNNER] Using default configuration");
            BastionConfig::default()
        }
    };

    let mut scenario = match scenario_path {
        Some(path) => {
            info!("[RUNNER] Loading scenario from: {}", path);
            PaperScenario::from_file(&path)?
        }
        None => {
            info!("[RUNNER] Using built-in demo scenario");
            PaperScenario::demo()
        }
    };
    if let Some(secs) = duration {
        scenario.duration_secs = secs;
    }

    let report = PaperSession::new(config, scenario, Arc::new(SystemClock::new()))
        .run()
        .await?;
    print_report(&report);
    Ok(())
}

fn print_report(report: &SessionReport) {
    println!("== Analysis ==");
    for analysis in &report.analyses {
        println!(
            "{:<8} {:?} score={:.3} buy={} sell={}",
            analysis.symbol,
            analysis.recommendation,
            analysis.score,
            analysis.buy_count(),
            analysis.sell_count()
        );
    }

    println!("\n== Orders ==");
    for order in &report.orders {
        println!(
            "{} {} {} x{} {} filled={} avg={}",
            order.id,
            order.side,
            order.symbol,
            order.quantity,
            order.status,
            order.filled_quantity,
            order
                .avg_fill_price
                .map(|p| p.to_string())
                .unwrap_or_else(|| "-".to_string())
        );
    }
    for rejected in &report.rejected {
        println!(
            "REJECTED {} {} x{}: {}",
            rejected.side, rejected.symbol, rejected.quantity, rejected.reason
        );
    }

    println!("\n== Positions ==");
    for position in &report.positions {
        println!(
            "{:<8} qty={} avg_cost={}",
            position.symbol, position.quantity, position.avg_cost
        );
    }

    println!("\n== Risk ==");
    println!("status: {:?}", report.status);
    for alert in &report.alerts {
        println!("[{:?}] {:?}: {}", alert.severity, alert.alert_type, alert.message);
    }
    for record in &report.mitigations {
        println!(
            "{:?} {} x{} @~{} -> {}",
            record.kind, record.symbol, record.quantity, record.reference_price, record.order_id
        );
    }
    println!(
        "checks={} skipped={} emergency_stops={}",
        report.metrics.total_checks, report.metrics.skipped_ticks, report.metrics.emergency_stops
    );
}
