use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use habit_dose::{
    ChartPeriod, Clock, Habit, HabitId, RecalibrationLevel, Snapshot, StatsPeriod, SystemClock,
    absence, apply_recalibration, calculate_recalibration_dose, completion, config::AppConfig, dose,
    milestones, model, projection, reminder, stats,
};
use serde::Serialize;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(name = "habit-dose")]
#[command(about = "Dose progression, statistics and projections for tracked habits")]
struct Args {
    /// JSON snapshot exported by the storage layer
    #[arg(long, short)]
    data: PathBuf,

    /// Evaluate as of this date instead of the local calendar date
    #[arg(long)]
    today: Option<NaiveDate>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Target dose for a habit on a date
    Dose {
        habit: String,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Completion status of every active habit for a date
    Status {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Global and per-habit absence report
    Absence,
    /// Restart dose for a habit after an extended absence
    Recalibrate {
        habit: String,
        /// Fraction of the gap to close, defaults to the configured level
        #[arg(long)]
        level: Option<f64>,
        /// Re-anchor the habit and write the snapshot back
        #[arg(long)]
        apply: bool,
    },
    /// Aggregate statistics over a period
    Stats {
        #[arg(long, value_enum, default_value_t = PeriodArg::Month)]
        period: PeriodArg,
    },
    /// Daily chart points for one habit
    Chart {
        habit: String,
        #[arg(long, value_enum, default_value_t = PeriodArg::Month)]
        period: PeriodArg,
        /// Emit CSV instead of JSON
        #[arg(long)]
        csv: bool,
    },
    /// Trajectory toward the target for one habit
    Projection { habit: String },
    /// Newly reached milestones for every habit
    Milestones {
        /// Record new milestones in the snapshot
        #[arg(long)]
        record: bool,
    },
    /// Whether the evening reminder should fire now
    Reminder {
        /// Override the current local hour
        #[arg(long)]
        hour: Option<u32>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PeriodArg {
    Week,
    Month,
    Quarter,
    Year,
    All,
}

impl PeriodArg {
    fn stats_period(self) -> StatsPeriod {
        match self {
            PeriodArg::Week => StatsPeriod::Week,
            PeriodArg::Month => StatsPeriod::Month,
            PeriodArg::Quarter => StatsPeriod::Quarter,
            PeriodArg::Year => StatsPeriod::Year,
            PeriodArg::All => StatsPeriod::All,
        }
    }

    fn chart_period(self) -> Result<ChartPeriod> {
        match self {
            PeriodArg::Week => Ok(ChartPeriod::Week),
            PeriodArg::Month => Ok(ChartPeriod::Month),
            PeriodArg::Quarter => Ok(ChartPeriod::Quarter),
            PeriodArg::Year => Ok(ChartPeriod::Year),
            PeriodArg::All => anyhow::bail!("Charts need a bounded period"),
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::builder()
        .with_default_directive(tracing::level_filters::LevelFilter::INFO.into())
        .parse_lossy("habit_dose=debug");

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;
    let clock = SystemClock;
    let today = args.today.unwrap_or_else(|| clock.today());

    let mut snapshot = Snapshot::load(&args.data)?;
    tracing::debug!("Evaluating as of {}", today);

    match args.command {
        Command::Dose { habit, date } => {
            let habit = lookup(&snapshot, &habit)?;
            let date = date.unwrap_or(today);
            let target =
                dose::calculate_target_dose_with_policy(habit, date, config.dose.pause_accrual);
            print_json(&DoseReport {
                habit_id: &habit.id,
                date,
                target_dose: target,
                paused: habit.is_paused_on(date),
            })
        }
        Command::Status { date } => {
            let date = date.unwrap_or(today);
            let rows: Vec<StatusRow> = snapshot
                .habits
                .iter()
                .filter(|h| h.is_active_on(date))
                .map(|h| {
                    let entry = snapshot
                        .entries
                        .iter()
                        .find(|e| e.habit_id == h.id && e.date == date);
                    StatusRow {
                        habit_id: &h.id,
                        status: completion::get_completion_status(entry, h.direction),
                        zero_victory: completion::is_zero_victory(entry, h.direction),
                        target_dose: dose::calculate_target_dose_with_policy(
                            h,
                            date,
                            config.dose.pause_accrual,
                        ),
                        actual_value: entry.map(|e| e.actual_value),
                    }
                })
                .collect();
            print_json(&rows)
        }
        Command::Absence => {
            let cfg = config.absence;
            let report = AbsenceReport {
                global: absence::detect_global_absence_with_config(&snapshot.entries, today, &cfg),
                habits: snapshot
                    .habits
                    .iter()
                    .filter(|h| h.is_active_on(today))
                    .map(|h| {
                        absence::detect_habit_absence_with_config(h, &snapshot.entries, today, &cfg)
                    })
                    .collect(),
                needs_recalibration: snapshot
                    .habits
                    .iter()
                    .filter(|h| h.is_active_on(today))
                    .filter_map(|h| {
                        absence::detect_extended_absence_with_config(
                            h,
                            &snapshot.entries,
                            today,
                            &cfg,
                            config.dose.pause_accrual,
                        )
                    })
                    .collect(),
            };
            print_json(&report)
        }
        Command::Recalibrate {
            habit,
            level,
            apply,
        } => {
            let level = RecalibrationLevel::from_fraction(
                level.unwrap_or(config.recalibration.default_level),
            )?;
            let current = lookup(&snapshot, &habit)?.clone();
            let current_dose =
                dose::calculate_target_dose_with_policy(&current, today, config.dose.pause_accrual);
            let last_actual_value = model::entries_for_habit(&snapshot.entries, &current.id)
                .into_iter()
                .filter(|e| e.date <= today)
                .next_back()
                .map(|e| e.actual_value);
            let new_dose =
                calculate_recalibration_dose(last_actual_value, current_dose, level, &current);

            if apply {
                let updated = apply_recalibration(&current, new_dose, today);
                if let Some(slot) = snapshot.habits.iter_mut().find(|h| h.id == current.id) {
                    *slot = updated;
                }
                snapshot.save(&args.data)?;
                tracing::info!("Recalibrated {} to {} from {}", current.id, new_dose, today);
            }

            print_json(&RecalibrationReport {
                habit_id: &current.id,
                level: level.fraction(),
                last_actual_value,
                current_target_dose: current_dose,
                recalibrated_dose: new_dose,
                applied: apply,
            })
        }
        Command::Stats { period } => {
            let global = stats::get_global_stats_with_config(
                &snapshot.habits,
                &snapshot.entries,
                period.stats_period(),
                today,
                &config.statistics,
            );
            print_json(&global)
        }
        Command::Chart { habit, period, csv } => {
            let habit = lookup(&snapshot, &habit)?;
            let chart = projection::get_chart_data_with_policy(
                habit,
                &snapshot.entries,
                period.chart_period()?,
                today,
                config.dose.pause_accrual,
            );
            if csv {
                chart.write_csv(io::stdout())
            } else {
                print_json(&chart)
            }
        }
        Command::Projection { habit } => {
            let habit = lookup(&snapshot, &habit)?;
            let data = projection::get_projection_with_config(
                habit,
                &snapshot.entries,
                today,
                &config.projection,
            );
            print_json(&data)
        }
        Command::Milestones { record } => {
            let existing = snapshot.milestone_set();
            let found: Vec<model::Milestone> = snapshot
                .habits
                .iter()
                .filter(|h| h.is_active_on(today))
                .flat_map(|h| {
                    let current = model::entries_for_habit(&snapshot.entries, &h.id)
                        .into_iter()
                        .filter(|e| e.date <= today)
                        .next_back()
                        .map(|e| e.actual_value)
                        .unwrap_or(h.start_value);
                    milestones::detect_new_milestones(h, current, &existing, today)
                })
                .collect();

            if record && !found.is_empty() {
                let added = snapshot.record_milestones(found.clone());
                snapshot.save(&args.data)?;
                tracing::info!("Recorded {} new milestone(s)", added);
            }
            print_json(&found)
        }
        Command::Reminder { hour } => {
            let hour = hour.unwrap_or_else(|| clock.hour());
            let pending: Vec<&HabitId> =
                reminder::pending_habits(&snapshot.habits, &snapshot.entries, today)
                    .into_iter()
                    .map(|h| &h.id)
                    .collect();
            let fire =
                config
                    .reminder
                    .should_fire(hour, &snapshot.habits, &snapshot.entries, today);
            print_json(&ReminderReport {
                date: today,
                hour,
                should_fire: fire,
                pending,
            })
        }
    }
}

fn lookup<'a>(snapshot: &'a Snapshot, id: &str) -> Result<&'a Habit> {
    Ok(snapshot.habit(&HabitId::from(id))?)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

// ==================== Output Shapes ====================

#[derive(Serialize)]
struct DoseReport<'a> {
    habit_id: &'a HabitId,
    date: NaiveDate,
    target_dose: f64,
    paused: bool,
}

#[derive(Serialize)]
struct StatusRow<'a> {
    habit_id: &'a HabitId,
    status: completion::CompletionStatus,
    zero_victory: bool,
    target_dose: f64,
    actual_value: Option<f64>,
}

#[derive(Serialize)]
struct AbsenceReport {
    global: absence::GlobalAbsence,
    habits: Vec<absence::HabitAbsence>,
    needs_recalibration: Vec<absence::ExtendedAbsence>,
}

#[derive(Serialize)]
struct RecalibrationReport<'a> {
    habit_id: &'a HabitId,
    level: f64,
    last_actual_value: Option<f64>,
    current_target_dose: f64,
    recalibrated_dose: f64,
    applied: bool,
}

#[derive(Serialize)]
struct ReminderReport<'a> {
    date: NaiveDate,
    hour: u32,
    should_fire: bool,
    pending: Vec<&'a HabitId>,
}
