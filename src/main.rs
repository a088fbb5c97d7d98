mod catalog;
mod chart;
mod domain;
mod error;
mod formulas;
mod handoff;
mod ledger;
mod planner;
mod profile;
mod server;
mod store;
mod watcher;
mod weight_history;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate, Weekday};
use clap::{Args, Parser, Subcommand};
use uuid::Uuid;

use crate::catalog::{activities, ingredients};
use crate::domain::{MealType, weekday_index};
use crate::formulas::{Intensity, PortionUnit, kg_to_lb};
use crate::planner::{
    ExerciseForm, FoodForm, IngredientLine, MealForm, PlannerSession, ProgressView, WeekView,
};
use crate::profile::{ProfileForm, WeightUnit};
use crate::server::{AppState, WsMessage};
use crate::store::FileStore;
use crate::watcher::{WatcherConfig, watch_store};
use crate::weight_history::Projection;

/// Weekly calorie planner with goal projection and exercise tracking.
#[derive(Parser, Debug)]
#[command(name = "weightplan")]
#[command(about = "Plan a calorie deficit week by week and track progress toward a goal weight")]
#[command(version)]
struct Cli {
    /// Path to the JSON store file.
    /// Can also be set via WEIGHTPLAN_STORE environment variable.
    #[arg(long, value_name = "FILE", env = "WEIGHTPLAN_STORE", default_value = "weightplan.json")]
    store: PathBuf,

    /// Email the planner data is kept under. Without it the unkeyed
    /// single-user planner is used.
    /// Can also be set via WEIGHTPLAN_USER environment variable.
    #[arg(long, value_name = "EMAIL", env = "WEIGHTPLAN_USER")]
    user: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the web server with live reload.
    Serve {
        /// Can also be set via WEIGHTPLAN_PORT environment variable.
        #[arg(long, env = "WEIGHTPLAN_PORT", default_value = "8080")]
        port: u16,

        /// Directory with the frontend pages.
        /// Can also be set via WEIGHTPLAN_STATIC environment variable.
        #[arg(long, value_name = "DIR", env = "WEIGHTPLAN_STATIC")]
        static_dir: Option<PathBuf>,
    },
    /// Save the profile and show the derived calorie targets.
    Profile(ProfileArgs),
    /// Start a new week, optionally from a planner query string.
    NewPlan {
        #[arg(long)]
        query: Option<String>,
    },
    /// Log a food entry.
    AddFood {
        #[arg(long, value_parser = parse_day)]
        day: usize,
        #[arg(long)]
        name: String,
        #[arg(long)]
        calories: f64,
        #[arg(long, default_value = "snack")]
        meal_type: MealType,
    },
    /// Log a meal built from ingredients (`name:quantity:unit`).
    AddMeal {
        #[arg(long, value_parser = parse_day)]
        day: usize,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "dinner")]
        meal_type: MealType,
        #[arg(long = "ingredient", value_parser = parse_ingredient_line, required = true)]
        ingredients: Vec<IngredientLine>,
    },
    /// Log an exercise session.
    AddExercise {
        #[arg(long, value_parser = parse_day)]
        day: usize,
        /// Activity from the catalog.
        #[arg(long, conflicts_with = "met")]
        activity: Option<String>,
        /// Raw MET value instead of a catalog activity.
        #[arg(long)]
        met: Option<f64>,
        #[arg(long, default_value = "medium")]
        intensity: Intensity,
        #[arg(long)]
        minutes: f64,
    },
    /// Remove an entry by id, or by position within a meal type.
    Remove {
        #[arg(long, value_parser = parse_day)]
        day: usize,
        #[arg(long, conflicts_with_all = ["meal_type", "index"])]
        id: Option<Uuid>,
        #[arg(long, requires = "index")]
        meal_type: Option<MealType>,
        #[arg(long, requires = "meal_type")]
        index: Option<usize>,
    },
    /// Show the week.
    Week,
    /// Show weekly totals and the expected weight change.
    Summary,
    /// Record a weigh-in.
    Weigh {
        weight: f64,
        #[arg(long, default_value = "kg")]
        unit: WeightUnit,
        /// Defaults to today.
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Show progress toward the goal weight.
    Progress,
    /// List built-in ingredients and activities.
    Catalog,
}

#[derive(Args, Debug)]
struct ProfileArgs {
    #[arg(long)]
    age: Option<String>,
    /// `male` or `female`.
    #[arg(long)]
    sex: Option<String>,
    #[arg(long)]
    weight: Option<String>,
    #[arg(long)]
    weight_unit: Option<String>,
    #[arg(long)]
    height: Option<String>,
    #[arg(long)]
    height_ft: Option<String>,
    #[arg(long)]
    height_in: Option<String>,
    /// `cm` or `ft`.
    #[arg(long)]
    height_unit: Option<String>,
    /// Level name or multiplier (1.2, 1.375, 1.55, 1.725, 1.9).
    #[arg(long)]
    activity: Option<String>,
    #[arg(long)]
    goal_weight: Option<String>,
    #[arg(long)]
    goal_unit: Option<String>,
    #[arg(long)]
    duration: Option<String>,
    /// `weeks` or `months`.
    #[arg(long)]
    duration_unit: Option<String>,
}

impl From<ProfileArgs> for ProfileForm {
    fn from(args: ProfileArgs) -> Self {
        ProfileForm {
            age: args.age,
            sex: args.sex,
            weight: args.weight,
            weight_unit: args.weight_unit,
            height: args.height,
            height_ft: args.height_ft,
            height_in: args.height_in,
            height_unit: args.height_unit,
            activity: args.activity,
            goal_weight: args.goal_weight,
            goal_unit: args.goal_unit,
            duration: args.duration,
            duration_unit: args.duration_unit,
        }
    }
}

/// Accepts `0`-`6` (Monday first) or a weekday name.
fn parse_day(s: &str) -> Result<usize, String> {
    if let Ok(index) = s.parse::<usize>() {
        return if index < 7 {
            Ok(index)
        } else {
            Err(format!("day must be 0-6, got {}", index))
        };
    }
    s.parse::<Weekday>()
        .map(weekday_index)
        .map_err(|_| format!("not a day: {}", s))
}

/// Parses `name:quantity:unit`, e.g. `White rice:1.5:cup`.
fn parse_ingredient_line(s: &str) -> Result<IngredientLine, String> {
    let mut parts = s.rsplitn(3, ':');
    let (Some(unit), Some(quantity), Some(name)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(format!("expected name:quantity:unit, got {}", s));
    };
    Ok(IngredientLine {
        ingredient: name.trim().to_string(),
        base_calories: None,
        base_unit: None,
        quantity: quantity
            .trim()
            .parse()
            .map_err(|_| format!("bad quantity: {}", quantity))?,
        unit: unit.parse::<PortionUnit>().map_err(|e| e.to_string())?,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    let store = FileStore::open(&cli.store)
        .with_context(|| format!("Failed to open store: {}", cli.store.display()))?;
    let mut session = PlannerSession::open(store, cli.user.clone());
    let today = Local::now().date_naive();

    match cli.command {
        Command::Serve { port, static_dir } => {
            let static_dir = match static_dir {
                Some(dir) => dir,
                None => find_static_dir(),
            };
            serve(session, port, static_dir).await?;
        }
        Command::Profile(args) => {
            let outcome = session.submit_profile(&args.into(), today)?;
            let m = outcome.metrics;
            println!("BMR:         {:5} kcal ({} kJ)", m.bmr, m.bmr_kj);
            println!("TDEE:        {:5} kcal ({} kJ)", m.tdee, m.tdee_kj);
            println!("Deficit:     {:5} kcal ({} kJ)", m.daily_deficit, m.daily_deficit_kj);
            println!("Daily goal:  {:5} kcal ({} kJ)", m.daily_goal, m.daily_goal_kj);
            println!();
            println!("Planner: ?{}", outcome.planner_query);
        }
        Command::NewPlan { query } => {
            let params = query
                .as_deref()
                .map(handoff::PlannerParams::from_query)
                .transpose()
                .context("Invalid planner query")?;
            session.new_plan(params);
            print_week(&session.week_view()?);
        }
        Command::AddFood {
            day,
            name,
            calories,
            meal_type,
        } => {
            let id = session.add_food(
                day,
                &FoodForm {
                    name,
                    calories,
                    meal_type,
                },
            )?;
            println!("Added {}", id);
        }
        Command::AddMeal {
            day,
            name,
            meal_type,
            ingredients,
        } => {
            let form = MealForm {
                name,
                meal_type,
                ingredients,
            };
            let calories = planner::meal_calories(&form)?;
            let id = session.add_meal(day, &form)?;
            println!("Added {} ({:.0} kcal)", id, calories);
        }
        Command::AddExercise {
            day,
            activity,
            met,
            intensity,
            minutes,
        } => {
            let (id, burned) = session.add_exercise(
                day,
                &ExerciseForm {
                    activity,
                    met,
                    intensity,
                    minutes,
                },
            )?;
            println!("Added {} ({:.0} kcal burned)", id, burned);
        }
        Command::Remove {
            day,
            id,
            meal_type,
            index,
        } => {
            let removed = match (id, meal_type, index) {
                (Some(id), _, _) => session.remove_entry(day, id)?,
                (None, Some(meal_type), Some(index)) => {
                    session.remove_by_type_index(day, meal_type, index)?
                }
                _ => bail!("Pass --id, or --meal-type with --index"),
            };
            println!("Removed {} ({:.0} kcal)", removed.name, removed.cal.abs());
        }
        Command::Week => print_week(&session.week_view()?),
        Command::Summary => {
            let view = session.summary()?;
            let s = view.summary;
            println!("Daily goal:      {:7} kcal", view.targets.daily_goal);
            println!("Total intake:    {:7.0} kcal", s.total_intake);
            println!("Exercise burn:   {:7.0} kcal", s.total_exercise_burn);
            println!(
                "Weekly outcome:  {:7.0} kcal ({})",
                s.weekly_outcome,
                if s.is_deficit() { "deficit" } else { "surplus" }
            );
            println!(
                "Expected change: {:7.2} kg lost ({:.0} kcal vs. maintenance)",
                view.estimate.weight_change_kg, view.estimate.weekly_deficit
            );
        }
        Command::Weigh { weight, unit, date } => {
            session.record_weight(date.unwrap_or(today), weight, unit)?;
            print_progress(&session.progress(today)?, unit);
        }
        Command::Progress => {
            let unit = session
                .profile()
                .map(|p| p.weight_unit)
                .unwrap_or_default();
            if let Some(profile) = session.profile() {
                println!("Remaining:   {:.1} kg", profile.remaining_kg());
            }
            print_progress(&session.progress(today)?, unit);
        }
        Command::Catalog => {
            println!("=== Ingredients ===");
            for i in ingredients() {
                println!("{:20} {:6.0} kcal per {:?}", i.name, i.base_calories, i.base_unit);
            }
            println!();
            println!("=== Activities ===");
            for a in activities() {
                println!("{:20} MET {:.1}", a.name, a.met);
            }
        }
    }

    Ok(())
}

async fn serve(session: PlannerSession<FileStore>, port: u16, static_dir: PathBuf) -> Result<()> {
    match session.user() {
        Some(user) => println!("User: {}", user),
        None => println!("User: (unkeyed planner)"),
    }
    let state = Arc::new(AppState::new(session));
    println!("Store: {}", state.store_path.display());
    println!("Static files: {}", static_dir.display());

    // Reload when another process writes the store
    let watcher_state = state.clone();
    tokio::spawn(async move {
        let config = WatcherConfig::default();
        let retry_config = config.clone();
        let path = watcher_state.store_path.clone();

        if let Err(e) = watch_store(&path, config, move || {
            let state = watcher_state.clone();
            let config = retry_config.clone();
            tokio::spawn(async move {
                reload_with_retry(&state, &config).await;
            });
        })
        .await
        {
            log::error!("Store watcher error: {}", e);
        }
    });

    println!();
    println!("Live reload enabled - watching for store changes");
    server::run_server(state, port, static_dir).await
}

/// Re-reads the store, retrying while the file is mid-write.
async fn reload_with_retry(state: &AppState, config: &WatcherConfig) {
    let mut last_error = None;

    for attempt in 0..config.retry_attempts {
        let mut session = state.session.write().await;
        match session.store_mut().reload() {
            Ok(()) => {
                session.reload_state();
                drop(session);
                log::info!("Store reloaded");
                let _ = state.ws_broadcast.send(WsMessage::DataUpdated);
                return;
            }
            Err(e) => {
                drop(session);
                log::warn!("Reload attempt {} failed: {}", attempt + 1, e);
                last_error = Some(e);
                tokio::time::sleep(config.retry_delay).await;
            }
        }
    }

    if let Some(e) = last_error {
        log::error!(
            "Failed to reload store after {} attempts: {}",
            config.retry_attempts,
            e
        );
        let _ = state
            .ws_broadcast
            .send(WsMessage::Error("Failed to reload planner data".into()));
    }
}

/// Finds the static directory for serving frontend files.
fn find_static_dir() -> PathBuf {
    let cwd_static = PathBuf::from("static");
    if cwd_static.is_dir() {
        return cwd_static;
    }

    if let Ok(exe_path) = std::env::current_exe()
        && let Some(exe_dir) = exe_path.parent()
    {
        let exe_static = exe_dir.join("static");
        if exe_static.is_dir() {
            return exe_static;
        }
    }

    cwd_static
}

fn print_week(view: &WeekView) {
    println!("Daily goal: {} kcal", view.daily_goal);
    for day in &view.days {
        println!();
        println!(
            "{} ({})  in {:.0}  out {:.0}  net {:.0}  remaining {:.0}{}",
            day.label,
            day.index,
            day.consumed,
            day.burned,
            day.net,
            day.remaining,
            if day.remaining < 0.0 { "  OVER" } else { "" }
        );
        for meal_type in MealType::all() {
            for entry in day.entries.iter().filter(|e| e.meal_type == *meal_type) {
                let sign = if entry.is_burn() { "-" } else { "+" };
                println!(
                    "  {:10} {}{:<6.0} {}  [{}]",
                    meal_type.display_name(),
                    sign,
                    entry.cal.abs(),
                    entry.name,
                    entry.id
                );
            }
        }
    }
}

fn print_progress(progress: &ProgressView, unit: WeightUnit) {
    let show = |kg: f64| match unit {
        WeightUnit::Kg => format!("{:.1} kg", kg),
        WeightUnit::Lb => format!("{:.1} lb", kg_to_lb(kg)),
    };
    println!("Goal:        {}", show(progress.goal_weight));
    if let Some(start) = progress.start_weight {
        println!("Start:       {}", show(start));
    }
    if let Some(latest) = progress.latest_weight {
        println!("Latest:      {}", show(latest));
    }
    match &progress.projection {
        Ok(Projection::GoalReached { .. }) => println!("Goal reached"),
        Ok(Projection::OnTrack {
            weekly_rate_kg,
            projected_date,
            ..
        }) => println!(
            "Losing {}/week, goal expected {}",
            show(*weekly_rate_kg),
            projected_date
        ),
        Ok(Projection::NotLosing { time_span_days, .. }) => {
            println!("No loss over the last {} days", time_span_days)
        }
        Ok(Projection::Unprojectable { weekly_rate_kg, .. }) => println!(
            "Losing {}/week, too slow to project a goal date",
            show(*weekly_rate_kg)
        ),
        Err(e) => println!("{}", e),
    }
}
