// Std
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

// Crates
use anyhow::{anyhow, Context, Result};
use chrono::{Duration, NaiveDate};
use clap::{crate_version, value_parser, Arg, ArgAction, ArgMatches, Command};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::error;

// Local
use timegist::clock::{Clock, DefaultClock};
use timegist::config::{self, KeyValueFile, Settings};
use timegist::{export, stopwatch, telemetry, view};
use timegist::{Filter, GistStore, NewEntry, SyncController, SyncPolicy};

static DATE_FORMAT: &str = "%Y-%m-%d";

fn cli() -> Command {
    Command::new("timegist")
        .version(crate_version!())
        .author("Samuel Vanderwaal")
        .about("A time-tracking command line program backed by a GitHub gist.")
        .arg(
            Arg::new("entry")
                .short('e')
                .long("entry")
                .value_name("DATE|PROJECT|HOURS|NOTES")
                .help("Add a new time entry. DATE is 'today', 'yesterday' or YYYY-MM-DD."),
        )
        .arg(
            Arg::new("list")
                .short('l')
                .long("list")
                .value_name("PROJECT")
                .num_args(0..=1)
                .default_missing_value("all")
                .help("List entries and their total, optionally for one project."),
        )
        .arg(
            Arg::new("delete")
                .short('d')
                .long("delete")
                .value_name("ID")
                .value_parser(value_parser!(i64))
                .help("Delete an entry by id."),
        )
        .arg(
            Arg::new("yes")
                .short('y')
                .long("yes")
                .action(ArgAction::SetTrue)
                .help("Use with '-d'. Skip the confirmation prompt."),
        )
        .arg(
            Arg::new("timer")
                .short('t')
                .long("timer")
                .action(ArgAction::SetTrue)
                .help("Start the stopwatch. Press Enter to stop and log the time."),
        )
        .arg(
            Arg::new("list_projects")
                .short('p')
                .long("list-projects")
                .action(ArgAction::SetTrue)
                .help("List all projects."),
        )
        .arg(
            Arg::new("add_project")
                .short('a')
                .long("add-project")
                .value_name("NAME")
                .help("Add a new project."),
        )
        .arg(
            Arg::new("delete_project")
                .long("delete-project")
                .value_name("NAME")
                .help("Delete a project. Its entries are kept."),
        )
        .arg(
            Arg::new("export")
                .short('x')
                .long("export")
                .value_name("PROJECT")
                .num_args(0..=1)
                .default_missing_value("all")
                .help("Export entries to CSV, optionally for one project."),
        )
        .arg(
            Arg::new("out")
                .short('o')
                .long("out")
                .value_name("DIR")
                .value_parser(value_parser!(PathBuf))
                .default_value(".")
                .help("Use with '-x'. Directory for the CSV file."),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("TOKEN|GIST_ID")
                .help("Save the access token and gist id."),
        )
        .arg(
            Arg::new("show_config")
                .long("show-config")
                .action(ArgAction::SetTrue)
                .help("Print the current settings."),
        )
        .arg(
            Arg::new("trust_local")
                .long("trust-local")
                .action(ArgAction::SetTrue)
                .help("Write without re-reading the gist first."),
        )
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = telemetry::get_subscriber("timegist".into(), "warn".into(), io::stderr);
    telemetry::init_subscriber(subscriber)?;

    let matches = cli().get_matches();
    let (settings, mut settings_file) = Settings::load()?;

    if let Some(value) = matches.get_one::<String>("config") {
        let (token, gist_id) = value
            .split_once('|')
            .ok_or_else(|| anyhow!("Expected TOKEN|GIST_ID"))?;
        config::save_credentials(&mut settings_file, token, gist_id)?;
        println!("Settings saved to {}.", settings_file.path().display());
        return Ok(());
    }

    if matches.get_flag("show_config") {
        print_settings(&settings, &settings_file);
        return Ok(());
    }

    let policy = if matches.get_flag("trust_local") {
        SyncPolicy::TrustLocal
    } else {
        settings.policy
    };
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let store = GistStore::new(settings.gist_config()?)?;
    let mut sync = SyncController::with_clock(store, policy, clock.clone());

    run(&matches, &mut sync, clock.as_ref()).await
}

async fn run(
    matches: &ArgMatches,
    sync: &mut SyncController<GistStore>,
    clock: &dyn Clock,
) -> Result<()> {
    if let Some(value) = matches.get_one::<String>("entry") {
        let new_entry = parse_entry(value, clock)?;
        let entry = sync
            .add_entry(new_entry)
            .await
            .context("Error writing entry")?;
        println!("Entry {} submitted.", entry.id);
        return Ok(());
    }

    if matches.get_flag("timer") {
        return timer_entry(sync, clock).await;
    }

    if let Some(id) = matches.get_one::<i64>("delete") {
        if !matches.get_flag("yes") && !confirm(&format!("Delete entry {}?", id))? {
            println!("Nothing deleted.");
            return Ok(());
        }
        let removed = sync.delete_entry(*id).await.context("Error deleting entry")?;
        if removed {
            println!("Entry deleted.");
        } else {
            println!("No entry with id {}.", id);
        }
        return Ok(());
    }

    if let Some(value) = matches.get_one::<String>("list") {
        let filter = load_filter(sync, value).await;
        let entries = view::entry_view(sync.state().entries(), &filter);
        view::entry_table(&entries).printstd();
        return Ok(());
    }

    if let Some(value) = matches.get_one::<String>("export") {
        let filter = load_filter(sync, value).await;
        let entries = view::entry_view(sync.state().entries(), &filter);
        let dir = matches
            .get_one::<PathBuf>("out")
            .cloned()
            .unwrap_or_else(|| PathBuf::from("."));
        let path = export::write_csv(&dir, &filter, &entries.rows)?;
        println!("Exported {} entries to {}.", entries.rows.len(), path.display());
        return Ok(());
    }

    if matches.get_flag("list_projects") {
        load_or_exit(sync).await;
        let options = view::project_options(sync.state().projects(), &Filter::All);
        view::project_table(&options).printstd();
        return Ok(());
    }

    if let Some(name) = matches.get_one::<String>("add_project") {
        sync.add_project(name).await.context("Error adding project")?;
        println!("Project saved.");
        return Ok(());
    }

    if let Some(name) = matches.get_one::<String>("delete_project") {
        if sync.remove_project(name).await.context("Error deleting project")? {
            println!("Project deleted.");
        } else {
            println!("No project named {}.", name);
        }
        return Ok(());
    }

    cli().print_help()?;
    Ok(())
}

/// Loads the gist and resolves the requested filter against its projects.
async fn load_filter(sync: &mut SyncController<GistStore>, value: &str) -> Filter {
    load_or_exit(sync).await;

    let requested = Filter::parse(value);
    let options = view::project_options(sync.state().projects(), &requested);
    if options.selected != requested {
        eprintln!("No project named {}; showing all entries.", requested);
    }
    options.selected
}

/// Every read failure ends the same way: the error table and exit code 1.
async fn load_or_exit(sync: &mut SyncController<GistStore>) {
    if let Err(e) = sync.refresh().await {
        connection_failed(&e);
    }
}

fn connection_failed(e: &timegist::SyncError) -> ! {
    error!(error = %e, "failed to load gist");
    view::error_table(&e.to_string()).printstd();
    std::process::exit(1);
}

fn parse_entry(value: &str, clock: &dyn Clock) -> Result<NewEntry> {
    let values: Vec<&str> = value.splitn(4, '|').collect();
    if values.len() < 3 {
        return Err(anyhow!("Expected DATE|PROJECT|HOURS|NOTES"));
    }

    let hours = values[2]
        .trim()
        .parse::<f64>()
        .with_context(|| format!("Hours must be a number, got '{}'", values[2]))?;

    Ok(NewEntry {
        date: parse_date(values[0], clock)?,
        project: values[1].to_string(),
        hours,
        notes: values.get(3).map(|s| s.to_string()).unwrap_or_default(),
    })
}

fn parse_date(value: &str, clock: &dyn Clock) -> Result<Option<NaiveDate>> {
    let date = match value.trim() {
        "" | "today" => clock.today(),
        "yesterday" => clock.today() - Duration::days(1),
        other => NaiveDate::parse_from_str(other, DATE_FORMAT)
            .with_context(|| format!("Dates look like 2024-01-31, got '{}'", other))?,
    };
    Ok(Some(date))
}

async fn timer_entry(sync: &mut SyncController<GistStore>, clock: &dyn Clock) -> Result<()> {
    println!("Timer running. Press Enter to stop.");
    let stop = async {
        let mut line = String::new();
        let _ = BufReader::new(tokio::io::stdin()).read_line(&mut line).await;
    };
    let elapsed = stopwatch::run_until(clock, stop, |display| {
        print!("\r{}", display);
        let _ = io::stdout().flush();
    })
    .await;

    let hours = stopwatch::hours_field(elapsed);
    println!("{} -> {} hours", stopwatch::format_elapsed(elapsed), hours);

    load_or_exit(sync).await;
    let projects = sync.state().projects().to_vec();
    let default_project = projects.first().cloned().unwrap_or_default();
    println!("Projects: {}", projects.join(", "));

    let project = prompt("Project", &default_project)?;
    let hours = prompt("Hours", &hours)?;
    let notes = prompt("Notes", "")?;

    if !confirm("Commit entry?")? {
        println!("Entry discarded.");
        return Ok(());
    }

    let new_entry = NewEntry {
        date: Some(clock.today()),
        project,
        hours: hours
            .parse::<f64>()
            .with_context(|| format!("Hours must be a number, got '{}'", hours))?,
        notes,
    };
    let entry = sync
        .add_entry(new_entry)
        .await
        .context("Error writing entry")?;
    println!("Entry {} submitted.", entry.id);
    Ok(())
}

fn read_line() -> Result<String> {
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn prompt(label: &str, default: &str) -> Result<String> {
    if default.is_empty() {
        print!("{}: ", label);
    } else {
        print!("{} [{}]: ", label, default);
    }
    io::stdout().flush()?;

    let answer = read_line()?;
    if answer.is_empty() {
        return Ok(default.to_string());
    }
    Ok(answer)
}

fn confirm(question: &str) -> Result<bool> {
    print!("{} [y/N] ", question);
    io::stdout().flush()?;
    let answer = read_line()?.to_ascii_lowercase();
    Ok(answer == "y" || answer == "yes")
}

fn print_settings(settings: &Settings, file: &KeyValueFile) {
    let token = settings
        .token
        .as_deref()
        .map(config::mask_token)
        .unwrap_or_else(|| "(not set)".to_string());
    println!("Settings file: {}", file.path().display());
    println!("Token:         {}", token);
    println!(
        "Gist id:       {}",
        settings.gist_id.as_deref().unwrap_or("(not set)")
    );
    println!("API:           {}", settings.api_url);
    println!("Sync policy:   {}", settings.policy);
    println!("If-Match:      {}", settings.conditional_writes);
}
