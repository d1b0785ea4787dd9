use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use fitlog_core::daily::{day_of, start_of_day_in};
use fitlog_core::export::{self, ExportKind, ExportScope};
use fitlog_core::logbook::{today_totals_in, SaveOutcome};
use fitlog_core::lookup;
use fitlog_core::*;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "fitlog")]
#[command(about = "Personal food, exercise and journal log", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Use this config file instead of the default one
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show today's food and exercise totals (default)
    Today,

    /// Log, list and delete food entries
    Food {
        #[command(subcommand)]
        action: FoodAction,
    },

    /// Log, list and delete exercise entries
    Exercise {
        #[command(subcommand)]
        action: ExerciseAction,
    },

    /// Manage the food and exercise lookup tables
    Lookup {
        #[command(subcommand)]
        table: LookupTable,
    },

    /// Write, list and delete journal entries
    Journal {
        #[command(subcommand)]
        action: JournalAction,
    },

    /// Per-day totals, averages and maxima over a date range
    Summary {
        #[arg(value_enum)]
        log: LogChoice,

        #[arg(long)]
        start: NaiveDate,

        #[arg(long)]
        end: NaiveDate,

        /// all_entries or in_range (overrides config)
        #[arg(long)]
        average_scope: Option<AverageScope>,
    },

    /// Export a log to CSV
    Export {
        #[arg(value_enum)]
        log: LogChoice,

        /// First day to export (requires --end); omit both to export everything
        #[arg(long, requires = "end")]
        start: Option<NaiveDate>,

        #[arg(long, requires = "start")]
        end: Option<NaiveDate>,

        /// Output directory (defaults to the configured export dir)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Fold the WAL into the snapshot
    Compact {
        /// Remove processed WAL files afterwards
        #[arg(long)]
        cleanup: bool,
    },

    /// Create or show the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write a config file with default values (and --data-dir, if given)
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the configuration in effect
    Show,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogChoice {
    Food,
    Exercise,
}

/// Answer to "save as a new lookup item?" given up front
#[derive(Args)]
struct LookupAnswer {
    /// Add a new name to the lookup table without asking
    #[arg(long, conflicts_with = "no_save_lookup")]
    save_lookup: bool,

    /// Never add a new name to the lookup table
    #[arg(long)]
    no_save_lookup: bool,
}

#[derive(Subcommand)]
enum FoodAction {
    /// Log a food entry
    Log {
        #[arg(long)]
        name: String,
        #[arg(long)]
        calories: Option<i32>,
        #[arg(long)]
        protein: Option<i32>,
        #[arg(long)]
        cholesterol: Option<i32>,
        #[arg(long)]
        saturated_fat: Option<i32>,
        #[arg(long)]
        serving_size: Option<i32>,
        #[arg(long)]
        unit: Option<String>,
        #[arg(long, default_value = "")]
        comments: String,
        /// Day to log against (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
        #[command(flatten)]
        answer: LookupAnswer,
    },
    /// List one day's entries
    List {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Delete an entry by id
    Delete { id: Uuid },
}

#[derive(Subcommand)]
enum ExerciseAction {
    /// Log an exercise entry
    Log {
        #[arg(long)]
        muscle_group: String,
        #[arg(long)]
        name: String,
        #[arg(long, default_value_t = 0.0)]
        weight: f64,
        #[arg(long, default_value_t = 0)]
        reps: i32,
        /// Minutes
        #[arg(long, default_value_t = 0)]
        time: i32,
        #[arg(long)]
        date: Option<NaiveDate>,
        #[command(flatten)]
        answer: LookupAnswer,
    },
    /// List one day's entries grouped by exercise
    List {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Delete an entry by id
    Delete { id: Uuid },
}

#[derive(Subcommand)]
enum LookupTable {
    Food {
        #[command(subcommand)]
        action: FoodLookupAction,
    },
    Exercise {
        #[command(subcommand)]
        action: ExerciseLookupAction,
    },
}

#[derive(Subcommand)]
enum FoodLookupAction {
    Add {
        #[arg(long)]
        name: String,
        #[arg(long, default_value_t = 0)]
        calories: i32,
        #[arg(long, default_value_t = 0)]
        protein: i32,
        #[arg(long, default_value_t = 0)]
        cholesterol: i32,
        #[arg(long, default_value_t = 0)]
        saturated_fat: i32,
        #[arg(long, default_value_t = 0)]
        serving_size: i32,
        #[arg(long, default_value = "")]
        unit: String,
    },
    List,
    Remove { id: Uuid },
    /// Suggest food names containing QUERY
    Search { query: String },
}

#[derive(Subcommand)]
enum ExerciseLookupAction {
    Add {
        #[arg(long)]
        muscle_group: String,
        #[arg(long)]
        name: String,
    },
    List,
    Remove { id: Uuid },
    /// Suggest muscle groups containing QUERY, or exercise names within --muscle-group
    Search {
        query: String,
        #[arg(long)]
        muscle_group: Option<String>,
    },
}

#[derive(Subcommand)]
enum JournalAction {
    Add {
        #[arg(long, default_value = "")]
        subject: String,
        #[arg(long, default_value = "")]
        content: String,
        #[arg(long, default_value = "")]
        tags: String,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    List {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    Delete { id: Uuid },
}

fn main() {
    fitlog_core::logging::init_with_level("warn");

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        match &e {
            Error::Validation(message) => eprintln!("{}", message),
            Error::NotFound { .. } => eprintln!("{}", e),
            _ => {
                tracing::error!("{}", e);
                eprintln!("Error: {}", e);
            }
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let command = cli.command.unwrap_or(Commands::Today);

    // Runs before loading, since the file may not exist yet
    if let Commands::Config {
        action: ConfigAction::Init { force },
    } = command
    {
        return cmd_config_init(cli.config.as_deref(), cli.data_dir, force);
    }

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(dir) = cli.data_dir {
        config.data.data_dir = dir;
    }
    let data_dir = config.data.data_dir.clone();
    let open_store = || FileStore::open(&data_dir);

    match command {
        Commands::Today => cmd_today(&open_store()?),
        Commands::Food { action } => cmd_food(&mut open_store()?, action),
        Commands::Exercise { action } => cmd_exercise(&mut open_store()?, action),
        Commands::Lookup { table } => cmd_lookup(&mut open_store()?, table),
        Commands::Journal { action } => cmd_journal(&mut open_store()?, action),
        Commands::Summary {
            log,
            start,
            end,
            average_scope,
        } => {
            let scope = average_scope.unwrap_or(config.summary.average_scope);
            cmd_summary(&open_store()?, log, DateRange::new(start, end), scope)
        }
        Commands::Export {
            log,
            start,
            end,
            out,
        } => {
            let scope = match (start, end) {
                (Some(start), Some(end)) => ExportScope::Range(DateRange::new(start, end)),
                _ => ExportScope::All,
            };
            let out_dir = out.unwrap_or_else(|| config.export_dir());
            cmd_export(&open_store()?, log, scope, &out_dir)
        }
        Commands::Compact { cleanup } => cmd_compact(&mut open_store()?, &data_dir, cleanup),
        Commands::Config { .. } => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

// ============================================================================
// Commands
// ============================================================================

fn cmd_today(store: &FileStore) -> Result<()> {
    let now = Utc::now();
    let totals = today_totals_in(store, now, &Local);

    println!("Today ({})", day_of(now, &Local));
    println!("  Calories:      {}", totals.food.calories);
    println!("  Protein:       {} g", totals.food.protein);
    println!("  Weight lifted: {:.2} lbs", totals.exercise.weight_lifted);
    println!("  Reps:          {}", totals.exercise.reps);
    Ok(())
}

fn cmd_food(store: &mut FileStore, action: FoodAction) -> Result<()> {
    let mut log = FoodLog::new(store);

    match action {
        FoodAction::Log {
            name,
            calories,
            protein,
            cholesterol,
            saturated_fat,
            serving_size,
            unit,
            comments,
            date,
            answer,
        } => {
            let mut draft = FoodDraft {
                food: name,
                comments,
                timestamp: Some(timestamp_for(date)),
                ..Default::default()
            };

            let any_values = calories.is_some()
                || protein.is_some()
                || cholesterol.is_some()
                || saturated_fat.is_some()
                || serving_size.is_some()
                || unit.is_some();
            if !any_values && log.prefill(&mut draft) {
                println!("Using values from lookup item '{}'", draft.food);
            } else {
                draft.calories = calories.unwrap_or(0);
                draft.protein = protein.unwrap_or(0);
                draft.cholesterol = cholesterol.unwrap_or(0);
                draft.saturated_fat = saturated_fat.unwrap_or(0);
                draft.serving_size = serving_size.unwrap_or(0);
                draft.unit_of_measure = unit.unwrap_or_default();
            }

            let outcome = log.check_and_save(&draft, prompt_for(&answer).as_mut())?;
            report_saved(&outcome);
            println!("  Day total: {} kcal", log.totals_on(local_day(date), &Local).calories);
        }
        FoodAction::List { date } => {
            let day = local_day(date);
            let entries = log.entries_on(day, &Local);
            let totals = log.totals_on(day, &Local);

            println!("Food log for {}", day);
            println!("  Total calories: {}  Total protein: {}", totals.calories, totals.protein);
            if entries.is_empty() {
                println!("  (no entries)");
            }
            for entry in entries {
                println!(
                    "  {}  {}  {} kcal  {} g protein  {} {}  {}",
                    entry.id,
                    entry.food,
                    entry.calories,
                    entry.protein,
                    entry.serving_size,
                    entry.unit_of_measure,
                    entry.comments
                );
            }
        }
        FoodAction::Delete { id } => {
            let removed = log.delete(id)?;
            println!("✓ Deleted food entry '{}'", removed.food);
        }
    }
    Ok(())
}

fn cmd_exercise(store: &mut FileStore, action: ExerciseAction) -> Result<()> {
    let mut log = ExerciseLog::new(store);

    match action {
        ExerciseAction::Log {
            muscle_group,
            name,
            weight,
            reps,
            time,
            date,
            answer,
        } => {
            let draft = ExerciseDraft {
                muscle_group,
                exercise_name: name,
                weight,
                reps,
                time,
                timestamp: Some(timestamp_for(date)),
            };
            let outcome = log.check_and_save(&draft, prompt_for(&answer).as_mut())?;
            report_saved(&outcome);

            let totals = log.totals_on(local_day(date), &Local);
            println!(
                "  Day total: {:.2} lbs lifted, {} reps",
                totals.weight_lifted, totals.reps
            );
        }
        ExerciseAction::List { date } => {
            let day = local_day(date);
            let totals = log.totals_on(day, &Local);
            let groups = log.grouped_on(day, &Local);

            println!("Exercise log for {}", day);
            println!(
                "  Total weight lifted: {:.2} lbs  Total reps: {}",
                totals.weight_lifted, totals.reps
            );
            if groups.is_empty() {
                println!("  (no entries)");
            }
            for (name, entries) in groups {
                println!("  {}", name);
                for entry in entries {
                    println!(
                        "    {}  {:.2} lbs x {}  {} min",
                        entry.id, entry.weight, entry.reps, entry.time
                    );
                }
            }
        }
        ExerciseAction::Delete { id } => {
            let removed = log.delete(id)?;
            println!("✓ Deleted exercise entry '{}'", removed.exercise_name);
        }
    }
    Ok(())
}

fn cmd_lookup(store: &mut FileStore, table: LookupTable) -> Result<()> {
    let mut tables = LookupTables::new(store);

    match table {
        LookupTable::Food { action } => match action {
            FoodLookupAction::Add {
                name,
                calories,
                protein,
                cholesterol,
                saturated_fat,
                serving_size,
                unit,
            } => {
                let item = FoodLookupItem {
                    id: Uuid::new_v4(),
                    food: name,
                    calories,
                    protein,
                    cholesterol,
                    saturated_fat,
                    serving_size,
                    unit_of_measure: unit,
                };
                let name = item.food.clone();
                tables.add_food_item(item)?;
                println!("✓ Added food item '{}'", name);
            }
            FoodLookupAction::List => {
                for item in tables.food_items() {
                    println!(
                        "{}  {}  {} kcal  {} g protein  {} sat. fat  {} cholesterol  {} {}",
                        item.id,
                        item.food,
                        item.calories,
                        item.protein,
                        item.saturated_fat,
                        item.cholesterol,
                        item.serving_size,
                        item.unit_of_measure
                    );
                }
            }
            FoodLookupAction::Remove { id } => {
                let removed = tables.remove_food_item(id)?;
                println!("✓ Removed food item '{}'", removed.food);
            }
            FoodLookupAction::Search { query } => {
                let names: Vec<String> = tables.food_items().into_iter().map(|i| i.food).collect();
                print_suggestions(lookup::filter_candidates(&query, &names));
            }
        },
        LookupTable::Exercise { action } => match action {
            ExerciseLookupAction::Add { muscle_group, name } => {
                tables.add_exercise_item(&muscle_group, &name)?;
                println!("✓ Added exercise item '{}' ({})", name, muscle_group);
            }
            ExerciseLookupAction::List => {
                for (group, items) in tables.exercise_items_by_group() {
                    println!("{}", group);
                    for item in items {
                        println!("  {}  {}", item.id, item.exercise_name);
                    }
                }
            }
            ExerciseLookupAction::Remove { id } => {
                let removed = tables.remove_exercise_item(id)?;
                println!("✓ Removed exercise item '{}'", removed.exercise_name);
            }
            ExerciseLookupAction::Search {
                query,
                muscle_group,
            } => {
                let items = tables.exercise_items();
                let candidates = match muscle_group {
                    Some(group) => lookup::exercise_names_for(&items, &group),
                    None => lookup::muscle_groups(&items),
                };
                print_suggestions(lookup::filter_candidates(&query, &candidates));
            }
        },
    }
    Ok(())
}

fn cmd_journal(store: &mut FileStore, action: JournalAction) -> Result<()> {
    let mut journal = Journal::new(store);

    match action {
        JournalAction::Add {
            subject,
            content,
            tags,
            date,
        } => {
            let draft = JournalDraft {
                subject,
                content,
                tags,
                timestamp: Some(timestamp_for(date)),
            };
            let id = journal.add(&draft)?;
            println!("✓ Journal entry saved ({})", id);
        }
        JournalAction::List { date } => {
            let day = local_day(date);
            let groups = journal.entries_on(day, &Local);

            println!("Journal for {}", day);
            if groups.is_empty() {
                println!("  (no entries)");
            }
            for (subject, entries) in groups {
                println!("  {}", subject);
                for entry in entries {
                    println!("    {}  [{}]  {}", entry.id, entry.tags, entry.content);
                }
            }
        }
        JournalAction::Delete { id } => {
            let removed = journal.delete(id)?;
            println!("✓ Deleted journal entry '{}'", removed.subject);
        }
    }
    Ok(())
}

fn cmd_summary(
    store: &FileStore,
    log: LogChoice,
    range: DateRange,
    scope: AverageScope,
) -> Result<()> {
    let summarizer = RangeSummarizer::new(scope);

    match log {
        LogChoice::Food => {
            let entries: Vec<FoodLogEntry> = store.fetch_all(SortKey::Timestamp, true);
            let summary = summarizer.summarize(&entries, range)?;

            println!("Food summary {} to {}", range.start, range.end);
            for (day, totals) in &summary.series {
                println!(
                    "  {}  calories: {}  protein: {}",
                    day, totals.calories, totals.protein
                );
            }
            println!(
                "  Average calories: {:.1}  Average protein: {:.1}",
                summary.mean.calories, summary.mean.protein
            );
            println!(
                "  Max calories/day: {}  Max protein/day: {}",
                summary.max.calories, summary.max.protein
            );
        }
        LogChoice::Exercise => {
            let entries: Vec<ExerciseLogEntry> = store.fetch_all(SortKey::Timestamp, true);
            let summary = summarizer.summarize(&entries, range)?;

            println!("Exercise summary {} to {}", range.start, range.end);
            for (day, totals) in &summary.series {
                println!(
                    "  {}  weight lifted: {:.2}  reps: {}",
                    day, totals.weight_lifted, totals.reps
                );
            }
            println!(
                "  Average weight lifted: {:.1}  Average reps: {:.1}",
                summary.mean.weight_lifted, summary.mean.reps
            );
            println!(
                "  Max weight lifted/day: {:.2}  Max reps/day: {}",
                summary.max.weight_lifted, summary.max.reps
            );
        }
    }
    Ok(())
}

fn cmd_export(store: &FileStore, log: LogChoice, scope: ExportScope, out_dir: &Path) -> Result<()> {
    let (kind, count, csv) = match log {
        LogChoice::Food => {
            let all: Vec<FoodLogEntry> = store.fetch_all(SortKey::Timestamp, true);
            let entries = export::select(&all, scope);
            (ExportKind::Food, entries.len(), export::food_csv(&entries)?)
        }
        LogChoice::Exercise => {
            let all: Vec<ExerciseLogEntry> = store.fetch_all(SortKey::Timestamp, true);
            let entries = export::select(&all, scope);
            (ExportKind::Exercise, entries.len(), export::exercise_csv(&entries)?)
        }
    };

    let path = export::export_to_dir(out_dir, kind, &csv)?;
    println!("✓ Exported {} entries to {}", count, path.display());
    Ok(())
}

fn cmd_compact(store: &mut FileStore, data_dir: &Path, cleanup: bool) -> Result<()> {
    let count = store.compact()?;
    println!("✓ Compacted store ({} records)", count);

    if cleanup {
        let cleaned = fitlog_core::compact::cleanup_processed_wals(data_dir)?;
        if cleaned > 0 {
            println!("✓ Cleaned up {} processed WAL files", cleaned);
        }
    }
    Ok(())
}

fn cmd_config_init(path: Option<&Path>, data_dir: Option<PathBuf>, force: bool) -> Result<()> {
    let mut config = Config::default();
    if let Some(dir) = data_dir {
        config.data.data_dir = dir;
    }

    let target = path
        .map(Path::to_path_buf)
        .unwrap_or_else(Config::default_config_path);
    if target.exists() && !force {
        return Err(Error::Validation(format!(
            "Config file {} already exists (use --force to overwrite)",
            target.display()
        )));
    }

    match path {
        Some(path) => config.save_to(path)?,
        None => config.save()?,
    }
    println!("✓ Wrote config to {}", target.display());
    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

fn local_day(date: Option<NaiveDate>) -> NaiveDate {
    date.unwrap_or_else(|| Local::now().date_naive())
}

/// Now, moved onto `date` if one was given
fn timestamp_for(date: Option<NaiveDate>) -> DateTime<Utc> {
    let now = Local::now();
    match date {
        Some(day) => Local
            .from_local_datetime(&day.and_time(now.time()))
            .earliest()
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(|| start_of_day_in(day, &Local)),
        None => now.with_timezone(&Utc),
    }
}

fn prompt_for(answer: &LookupAnswer) -> Box<dyn NewItemPrompt> {
    if answer.save_lookup {
        Box::new(FixedAnswer(true))
    } else if answer.no_save_lookup {
        Box::new(FixedAnswer(false))
    } else {
        Box::new(StdinPrompt)
    }
}

fn report_saved(outcome: &SaveOutcome) {
    if let Some(id) = outcome.new_lookup_id {
        println!("✓ Added lookup item ({})", id);
    }
    println!("✓ Entry logged ({})", outcome.entry_id);
}

fn print_suggestions<S: AsRef<str>>(matches: Vec<&S>) {
    if matches.is_empty() {
        println!("No matches");
    }
    for candidate in matches {
        println!("{}", candidate.as_ref());
    }
}

/// Asks on stdin; end of input counts as "no"
struct StdinPrompt;

impl StdinPrompt {
    fn ask(question: &str) -> bool {
        print!("{} [y/N] ", question);
        if io::stdout().flush().is_err() {
            return false;
        }

        let mut input = String::new();
        match io::stdin().read_line(&mut input) {
            Ok(_) => matches!(input.trim().to_lowercase().as_str(), "y" | "yes"),
            Err(e) => {
                tracing::warn!("Failed to read answer: {}", e);
                false
            }
        }
    }
}

impl NewItemPrompt for StdinPrompt {
    fn confirm_new_food(&mut self, food: &str) -> bool {
        Self::ask(&format!(
            "The food item '{}' is not in the lookup list. Save it for future use?",
            food
        ))
    }

    fn confirm_new_exercise(&mut self, muscle_group: &str, exercise_name: &str) -> bool {
        Self::ask(&format!(
            "The exercise item '{}' for muscle group '{}' is not in the lookup list. Save it for future use?",
            exercise_name, muscle_group
        ))
    }
}
