use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use uuid::Uuid;
use vivarium_core::records::{JOURNAL_FILE, RESTRICTIONS_FILE};
use vivarium_core::*;

#[derive(Parser)]
#[command(name = "vivarium")]
#[command(about = "Water-restriction welfare tracking for laboratory subjects", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Subject nickname (directory under the data directory)
    #[arg(short, long, global = true)]
    subject: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the welfare summary for a date (default today)
    Status {
        /// Date to report on (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Print the day-by-day welfare ledger
    Ledger {
        /// First day of the range (YYYY-MM-DD); defaults to the first record
        #[arg(long)]
        start: Option<NaiveDate>,

        /// Last day of the range (YYYY-MM-DD); defaults to today
        #[arg(long)]
        end: Option<NaiveDate>,

        /// Emit CSV instead of a table
        #[arg(long)]
        csv: bool,
    },

    /// Journal a new weighing
    LogWeighing {
        /// Body weight in grams
        grams: f64,

        /// Timestamp (RFC 3339 or YYYY-MM-DD); defaults to now
        #[arg(long)]
        at: Option<String>,
    },

    /// Journal a new water administration
    LogWater {
        /// Volume in millilitres
        millilitres: f64,

        /// Session id if the water was earned during a session
        #[arg(long)]
        session: Option<Uuid>,

        /// Timestamp (RFC 3339 or YYYY-MM-DD); defaults to now
        #[arg(long)]
        at: Option<String>,
    },

    /// Open a new water-restriction period
    Restrict {
        /// Start timestamp (RFC 3339 or YYYY-MM-DD); defaults to now
        #[arg(long)]
        start: Option<String>,

        /// Reference weight in grams to record for the period
        #[arg(long)]
        reference_weight: Option<f64>,
    },

    /// Close the currently open water-restriction period
    EndRestriction {
        /// End timestamp (RFC 3339 or YYYY-MM-DD); defaults to now
        #[arg(long)]
        at: Option<String>,
    },

    /// Roll up journalled events into the CSV archives
    Rollup {
        /// Clean up processed journal files after rollup
        #[arg(long)]
        cleanup: bool,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    vivarium_core::logging::init();

    let cli = Cli::parse();

    let config = Config::load()?;
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());
    let subject = cli
        .subject
        .ok_or_else(|| Error::Config("--subject is required".into()))?;
    let subject_dir = data_dir.join(&subject);

    match cli.command {
        Commands::Status { date } => cmd_status(&subject_dir, &config, date),
        Commands::Ledger { start, end, csv } => cmd_ledger(&subject_dir, &config, start, end, csv),
        Commands::LogWeighing { grams, at } => cmd_log_weighing(&subject_dir, grams, at),
        Commands::LogWater {
            millilitres,
            session,
            at,
        } => cmd_log_water(&subject_dir, millilitres, session, at),
        Commands::Restrict {
            start,
            reference_weight,
        } => cmd_restrict(&subject_dir, &config, start, reference_weight),
        Commands::EndRestriction { at } => cmd_end_restriction(&subject_dir, &config, at),
        Commands::Rollup { cleanup } => cmd_rollup(&subject_dir, cleanup),
    }
}

/// Resolve an optional CLI timestamp, defaulting to now
fn timestamp_or_now(at: Option<&str>) -> Result<DateTime<Utc>> {
    match at {
        Some(s) => records::parse_timestamp(s),
        None => Ok(Utc::now()),
    }
}

fn cmd_status(subject_dir: &Path, config: &Config, date: Option<NaiveDate>) -> Result<()> {
    let store = load_subject(subject_dir, &config.lab)?;
    let day = date.unwrap_or_else(|| store.today());
    let probe = store.noon(day);
    let profile = store.profile();

    println!("{} on {}", profile.nickname, day);

    let weight = store.weight(probe);
    let percentage = classify::percentage_weight(&store, probe);
    let (min, max) = classify::expected_weight_range(&store, probe);
    println!("  weight:          {weight:.1} g");
    if percentage > 0.0 {
        println!("  of reference:    {percentage:.1}%");
        println!("  expected range:  {min:.1} - {max:.1} g");
        println!("  minimum weight:  {:.1} g", classify::min_weight(&store, probe));
    } else {
        println!("  of reference:    - (no reference weight applies)");
    }
    println!("  status:          {}", classify::status(&store, probe));
    match restriction::active_period_at(&store, probe) {
        Some(period) => {
            let end = restriction::effective_end(period, Utc::now());
            println!(
                "  restricted:      yes (since {}, through {})",
                period.start.date_naive(),
                end.date_naive()
            );
        }
        None => println!("  restricted:      no"),
    }

    println!(
        "  water given:     {:.2} mL (reward {:.2}, supplement {:.2})",
        balance::given_water_total(&store, probe),
        balance::given_water_reward(&store, probe),
        balance::given_water_supplement(&store, probe),
    );
    println!("  water expected:  {:.2} mL", balance::expected_water(&store, probe));
    println!("  water remaining: {:.2} mL", balance::remaining_water(&store, probe));
    if let Some(last) = store.last_administration_before(probe) {
        println!("  last water:      {:.2} mL at {}", last.millilitres, last.at);
    }

    let ref_weight = reference::reference_weight_at(&store, probe);
    if ref_weight > 0.0 && !store.thresholds().is_empty() {
        let bands: Vec<String> = store
            .thresholds()
            .iter()
            .map(|t| {
                format!(
                    "{:.0}% = {:.1} g",
                    t.fraction * 100.0,
                    classify::implant_adjusted(&store, ref_weight, t.fraction)
                )
            })
            .collect();
        println!("  thresholds:      {}", bands.join(", "));
    }

    let age = growth::age_weeks(profile.birth_date, day);
    if let Some(point) = default_table().lookup(profile.sex, age) {
        println!(
            "  growth curve:    {:.1} g +/- {:.1} at {age} weeks",
            point.mean, point.std
        );
    }

    Ok(())
}

fn cmd_ledger(
    subject_dir: &Path,
    config: &Config,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    csv_output: bool,
) -> Result<()> {
    let store = load_subject(subject_dir, &config.lab)?;
    let rows = ledger::build(&store, start, end);

    if csv_output {
        let mut writer = csv::Writer::from_writer(std::io::stdout());
        for row in &rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        return Ok(());
    }

    println!(
        "{:<12} {:>8} {:>7} {:>8} {:>8} {:>8} {:>7}",
        "date", "weight", "pct", "given", "expect", "excess", "restr"
    );
    for row in &rows {
        println!(
            "{:<12} {:>8.1} {:>6.1}% {:>8.2} {:>8.2} {:>8.2} {:>7}",
            row.date.to_string(),
            row.weighing_at,
            row.percentage_weight,
            row.given_water_total,
            row.expected_water,
            row.excess_water,
            if row.is_water_restricted { "yes" } else { "no" },
        );
    }
    println!("{} rows", rows.len());

    Ok(())
}

fn cmd_log_weighing(subject_dir: &Path, grams: f64, at: Option<String>) -> Result<()> {
    let at = timestamp_or_now(at.as_deref())?;
    let mut sink = JsonlSink::new(subject_dir.join(JOURNAL_FILE));
    sink.append(&JournalEvent::Weighing { at, grams })?;
    println!("Weighing logged: {grams:.1} g at {at}");
    Ok(())
}

fn cmd_log_water(
    subject_dir: &Path,
    millilitres: f64,
    session: Option<Uuid>,
    at: Option<String>,
) -> Result<()> {
    let at = timestamp_or_now(at.as_deref())?;
    let mut sink = JsonlSink::new(subject_dir.join(JOURNAL_FILE));
    sink.append(&JournalEvent::WaterAdministration {
        at,
        millilitres,
        session,
    })?;
    let kind = if session.is_some() { "reward" } else { "supplement" };
    println!("Water logged: {millilitres:.2} mL ({kind}) at {at}");
    Ok(())
}

fn cmd_restrict(
    subject_dir: &Path,
    config: &Config,
    start: Option<String>,
    reference_weight: Option<f64>,
) -> Result<()> {
    let start = timestamp_or_now(start.as_deref())?;
    let mut store = load_subject(subject_dir, &config.lab)?;

    store.add_restriction_period(start, None, reference_weight.unwrap_or(0.0))?;
    records::save_restrictions(&subject_dir.join(RESTRICTIONS_FILE), store.restrictions())?;

    println!("Restriction opened at {start}");
    Ok(())
}

fn cmd_end_restriction(subject_dir: &Path, config: &Config, at: Option<String>) -> Result<()> {
    let at = timestamp_or_now(at.as_deref())?;
    let mut store = load_subject(subject_dir, &config.lab)?;

    match store.close_restriction(at) {
        Ok(()) => {
            records::save_restrictions(&subject_dir.join(RESTRICTIONS_FILE), store.restrictions())?;
            println!("Restriction closed at {at}");
            Ok(())
        }
        Err(Error::NoOpenRestriction) => {
            // recoverable: report and leave the archives untouched
            tracing::warn!(
                "{} is not currently under water restriction",
                store.profile().nickname
            );
            println!("No open restriction to close");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

fn cmd_rollup(subject_dir: &Path, cleanup: bool) -> Result<()> {
    let journal_path = subject_dir.join(JOURNAL_FILE);
    let count = rollup::journal_to_csv_and_archive(&journal_path, subject_dir)?;
    println!("Rolled up {count} events");

    if cleanup {
        if let Some(journal_dir) = journal_path.parent() {
            let removed = rollup::cleanup_processed_journals(journal_dir)?;
            println!("Removed {removed} processed journal files");
        }
    }

    Ok(())
}
