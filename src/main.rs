use anyhow::{Context, Result};
use glam_session::core::config::Config;
use glam_session::core::plan::MakeupPlan;
use glam_session::core::state::{SessionOutcome, SessionReport};
use glam_session::services::console::run_console;
use glam_session::services::narrator::{create_narrator, Narrator};
use glam_session::services::session::{GuidedSession, SessionRunner, SessionSettings};
use glam_session::utils::time::format_minutes;
use log::{info, warn};
use std::env;
use std::fs;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    // 1. Load config
    let config = match Config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error loading config: {:#}", e);
            eprintln!("Please check 'config.yml' or remove it to use defaults.");
            return Err(e);
        }
    };

    // 2. Load plan
    let plan_path = env::args().nth(1).unwrap_or_else(|| config.plan_file.clone());
    let plan = MakeupPlan::load(&plan_path)?;
    print_plan(&plan);

    // 3. Narrator and session
    let narrator = create_narrator(&config.narrator)?;
    if !narrator.is_supported() {
        println!("Voice guidance is not available on this system.");
    }
    let steps = plan.shared_steps();
    let session = GuidedSession::new(
        steps.clone(),
        narrator,
        SessionSettings::from(&config.session),
    );
    let (runner, handle) = SessionRunner::new(session);

    // 4. Run the menu alongside the session
    let console = tokio::task::spawn_blocking(move || run_console(handle, steps));
    let report = runner.run().await;
    if let Err(e) = console.await {
        warn!("Console thread ended abnormally: {}", e);
    }

    print_report(&report);
    if let Some(path) = &config.report_file {
        write_report(&report, path)?;
    }

    Ok(())
}

fn print_plan(plan: &MakeupPlan) {
    let summary = plan.summary();
    match &plan.occasion {
        Some(occasion) => println!("Makeup plan for {}", occasion),
        None => println!("Makeup plan"),
    }
    println!(
        "{} steps, about {}",
        summary.step_count,
        format_minutes(summary.total_minutes)
    );
    for (area, numbers) in &summary.areas {
        let numbers: Vec<String> = numbers.iter().map(u32::to_string).collect();
        println!("  {}: steps {}", area.label(), numbers.join(", "));
    }
    if !summary.products_needed.is_empty() {
        println!("You will need: {}", summary.products_needed.join(", "));
    }
}

fn print_report(report: &SessionReport) {
    let verb = match report.outcome {
        SessionOutcome::Finished => "finished",
        SessionOutcome::Closed => "closed",
    };
    println!(
        "\nSession {} after {}: {}/{} steps completed.",
        verb,
        report.elapsed,
        report.completed_steps.len(),
        report.total_steps
    );
    if report.all_steps_completed() {
        println!("Your look is complete!");
    }
}

fn write_report(report: &SessionReport, path: &str) -> Result<()> {
    let content = serde_json::to_string_pretty(report)?;
    fs::write(path, content).with_context(|| format!("Failed to write report to {}", path))?;
    info!("Session report written to {}", path);
    Ok(())
}
