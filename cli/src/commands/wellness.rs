use std::time::Duration;

use anyhow::{Result, bail};
use chrono::NaiveDate;
use tokio::time::{MissedTickBehavior, interval};

use wellnoosh_core::breathing::{
    BreathingPattern, BreathingSession, DailyRecord, SessionEvent, SessionStatus, Tracker,
};
use wellnoosh_core::service::WellnooshService;

use super::helpers::{parse_date, print_json, slot_bar};

pub(crate) fn parse_pattern(s: &str) -> Result<BreathingPattern> {
    match s.trim().replace('-', "").as_str() {
        "478" => Ok(BreathingPattern::four_seven_eight()),
        "424" => Ok(BreathingPattern::four_two_four()),
        _ => bail!("Unknown breathing pattern '{s}'. Use 478 or 424"),
    }
}

/// Slot numbers are shown 1-based.
fn slot_index(slot: usize, tracker: Tracker) -> Result<usize> {
    let goal = tracker.daily_goal();
    if slot < 1 || slot > goal {
        bail!("Slot must be between 1 and {goal}");
    }
    Ok(slot - 1)
}

fn describe(event: SessionEvent, session: &BreathingSession) -> String {
    match event {
        SessionEvent::PhaseChanged(phase) => format!(
            "{} ({}s)  [{}s left]",
            phase.instruction(),
            session.phase_remaining(),
            session.remaining_secs()
        ),
        SessionEvent::CycleCompleted(n) => format!("  cycle {n} done"),
        SessionEvent::Completed => "Session complete".to_string(),
    }
}

fn print_record(record: &DailyRecord, unit: &str) {
    println!(
        "{} {}: {} {}/{} {unit}{}",
        record.date,
        record.tracker.as_str(),
        slot_bar(&record.progress.slots),
        record.completed,
        record.progress.daily_goal,
        if record.progress.is_goal_met() { "  goal met" } else { "" }
    );
    if !record.synced {
        eprintln!("(saved locally; not yet synced)");
    }
}

fn output(record: &DailyRecord, unit: &str, json: bool) -> Result<()> {
    if json {
        print_json(record)
    } else {
        print_record(record, unit);
        Ok(())
    }
}

/// Run a guided session in the terminal. Ctrl-C stops it without recording.
pub(crate) async fn cmd_breathe(service: &WellnooshService, pattern: &str, json: bool) -> Result<()> {
    let pattern = parse_pattern(pattern)?;
    let mut session = BreathingSession::start(pattern);
    eprintln!(
        "{} breathing, {}s. Press Ctrl-C to stop.",
        pattern.name,
        pattern.total_secs()
    );
    eprintln!(
        "{} ({}s)",
        session.phase().instruction(),
        session.phase_remaining()
    );

    let mut ticker = interval(Duration::from_secs(1));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick fires immediately.
    ticker.tick().await;

    while session.status() == SessionStatus::Running {
        tokio::select! {
            _ = ticker.tick() => {
                for event in session.tick() {
                    eprintln!("{}", describe(event, &session));
                }
            }
            _ = tokio::signal::ctrl_c() => {
                session.stop();
            }
        }
    }

    if session.status() == SessionStatus::Stopped {
        if json {
            println!(
                "{}",
                serde_json::json!({ "completed": false, "cycles": session.cycles_completed() })
            );
        } else {
            eprintln!("\nStopped early; session not recorded.");
        }
        return Ok(());
    }

    let today = parse_date(None)?;
    let record = service.record_breathing_completion(today).await?;
    output(&record, "sessions", json)
}

pub(crate) fn cmd_breathing_status(
    service: &WellnooshService,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let record = service.daily_record(Tracker::Breathing, parse_date(date)?)?;
    output(&record, "sessions", json)
}

pub(crate) async fn cmd_breathing_toggle(
    service: &WellnooshService,
    slot: usize,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let index = slot_index(slot, Tracker::Breathing)?;
    let record = service
        .toggle_breathing(parse_date(date)?, index)
        .await?;
    output(&record, "sessions", json)
}

pub(crate) async fn cmd_water_add(
    service: &WellnooshService,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let date: NaiveDate = parse_date(date)?;
    let before = service.daily_record(Tracker::Water, date)?;
    if before.progress.is_goal_met() && !json {
        eprintln!("All {} glasses already logged today.", before.progress.daily_goal);
    }
    let record = service.add_water(date).await?;
    output(&record, "glasses", json)
}

pub(crate) async fn cmd_water_toggle(
    service: &WellnooshService,
    slot: usize,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let index = slot_index(slot, Tracker::Water)?;
    let record = service.toggle_water(parse_date(date)?, index).await?;
    output(&record, "glasses", json)
}

pub(crate) fn cmd_water_status(
    service: &WellnooshService,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let record = service.daily_record(Tracker::Water, parse_date(date)?)?;
    output(&record, "glasses", json)
}
