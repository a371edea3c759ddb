//! Scripted emergency flight simulator.
//!
//! Streams telemetry for one scripted flight to the decision server and
//! prints every decision context it produces. With `--auto-decide` the
//! top-ranked option of each new context is submitted as an AI decision.
//!
//! Usage:
//!   cargo run -p divert-cli --bin divert_sim -- --scenario medical --auto-decide

use std::collections::HashSet;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use divert_cli::sim::{build_scenario, ScenarioKind};
use divert_core::DecidedBy;
use divert_sdk::DivertClient;
use tokio::time::{self, Instant};

#[derive(Parser, Debug)]
#[command(author, version, about = "Stream a scripted emergency flight to the decision server")]
struct Args {
    /// Decision server URL
    #[arg(long, default_value = "http://localhost:3000")]
    url: String,

    /// Scenario to fly
    #[arg(long, value_enum, default_value_t = ScenarioKind::Medical)]
    scenario: ScenarioKind,

    /// Flight identifier
    #[arg(long, default_value = "SIM001")]
    flight_id: String,

    /// Seconds before the scenario's first signal
    #[arg(long, default_value_t = 10.0)]
    trigger_after: f64,

    /// Run duration in seconds
    #[arg(long, default_value_t = 90)]
    duration: u64,

    /// Telemetry update rate (Hz)
    #[arg(long, default_value_t = 1.0)]
    rate: f64,

    /// Submit the top-ranked option of every new context as an AI decision
    #[arg(long, default_value_t = false)]
    auto_decide: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let client = DivertClient::new(&args.url);
    client.health().await?;

    let flight = build_scenario(args.scenario, &args.flight_id, args.trigger_after);
    println!(
        "Flying {} ({}) scenario '{}' for {}s, trigger at {:.0}s",
        flight.flight_id, flight.aircraft_type, args.scenario, args.duration, args.trigger_after
    );

    let period = Duration::from_secs_f64(1.0 / args.rate.max(0.1));
    let mut ticker = time::interval(period);
    let start = Instant::now();
    let mut seen = HashSet::new();

    loop {
        ticker.tick().await;
        let t = start.elapsed().as_secs_f64();
        if t > args.duration as f64 {
            break;
        }

        let (state, signals) = flight.frame(t);
        if let Err(e) = client.send_telemetry(&state, &signals).await {
            eprintln!("[{:>5.1}s] telemetry rejected: {}", t, e);
            continue;
        }

        let Some(view) = client.get_context(&flight.flight_id).await? else {
            continue;
        };
        let context = &view.context;
        if !seen.insert(context.id) {
            continue;
        }

        println!(
            "[{:>5.1}s] {} {} context {} ({}s to decide)",
            t,
            context.scenario.severity,
            context.scenario.scenario_type,
            context.id,
            view.seconds_remaining
        );
        for (rank, option) in context.options.iter().enumerate() {
            println!(
                "         {}. {:<18} score {:>5.1}  safety {:>5.1}  feasibility {:>5.1}  cost ${:>9.0}  {:>5.0} min",
                rank + 1,
                option.id.to_string(),
                option.composite_score,
                option.safety_score,
                option.feasibility,
                option.cost_impact,
                option.time_impact_min
            );
        }
        for notice in &context.notices {
            println!("         notice: {:?}", notice);
        }

        if args.auto_decide {
            let Some(best) = context.best() else {
                continue;
            };
            let response_time_s = (f64::from(context.time_to_decision_s)
                - view.seconds_remaining as f64)
                .max(0.0);
            match client
                .submit_decision(&flight.flight_id, context.id, &best.id, DecidedBy::Ai, response_time_s)
                .await
            {
                Ok(decision) => {
                    let outcome = &decision.outcome;
                    println!(
                        "         -> {} (confidence {:.2}, {:?}, actual cost ${:.0})",
                        outcome.option.id, outcome.confidence, outcome.safety_outcome, outcome.actual_cost
                    );
                    for action in &decision.plan.actions {
                        println!("            {:>2}. [{:?}] {}", action.step, action.owner, action.description);
                    }
                }
                Err(e) => eprintln!("         decision rejected: {}", e),
            }
        }
    }

    let history = client.get_history(&flight.flight_id).await?;
    let metrics = history.metrics;
    println!(
        "Done: {} decisions, mean response {:.1}s, {:.0}% excellent/good, mean confidence {:.2}",
        metrics.total_decisions,
        metrics.mean_response_time_s,
        metrics.pct_excellent_or_good,
        metrics.mean_confidence
    );
    Ok(())
}
