//! desk-runner: headless driver for the civicdesk engines.
//!
//! Usage:
//!   desk-runner --seed 12345 --count 200 --db desk.db
//!   desk-runner --input complaints.json --data-dir ./data
//!   desk-runner --seed 12345 --ipc-mode

use anyhow::{Context, Result};
use chrono::{Local, Utc};
use civicdesk_core::{
    complaint::Complaint,
    config::DeskConfig,
    engine::{DeskEngine, DeskView},
    query::{Filter, SortSpec},
    sample::SampleGenerator,
    snapshot::ComplaintSnapshot,
    stats::Summary,
    store::ComplaintStore,
    zone::ZoneReport,
};
use std::env;
use std::io::{self, BufRead, Write};

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    GetState,
    Query {
        #[serde(default)]
        filter: Filter,
        #[serde(default)]
        sort: SortSpec,
    },
    Quit,
}

#[derive(serde::Serialize)]
struct UiState<'a> {
    evaluated_at: String,
    summary: &'a Summary,
    zones: &'a ZoneReport,
    transitions: usize,
    issues: usize,
}

#[derive(serde::Serialize)]
struct QueryResult<'a> {
    count: usize,
    complaints: Vec<&'a Complaint>,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let count = parse_arg(&args, "--count", 200usize);
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let db = string_arg(&args, "--db").unwrap_or(":memory:");
    let data_dir = string_arg(&args, "--data-dir").unwrap_or("./data");
    let input = string_arg(&args, "--input");

    if !ipc_mode {
        println!("civicdesk — desk-runner");
        println!("  seed:      {seed}");
        println!("  count:     {count}");
        println!("  db:        {db}");
        println!("  data_dir:  {data_dir}");
        println!();
    }

    let config = DeskConfig::load(data_dir)?;
    let engine = DeskEngine::new(&config)?;

    let mut store = if db == ":memory:" {
        ComplaintStore::in_memory()?
    } else {
        ComplaintStore::open(db)?
    };
    store.migrate()?;

    let now = Utc::now();
    let complaints = match input {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Cannot read {path}"))?;
            let snapshot = ComplaintSnapshot::from_json(&json)?;
            if !snapshot.rejected.is_empty() {
                log::warn!("{} records in {path} could not be decoded", snapshot.rejected.len());
            }
            snapshot.complaints
        }
        None if store.complaint_count()? > 0 => store.load_complaints()?,
        None => SampleGenerator::new(seed).generate(count, engine.registry(), now)?,
    };

    // Dashboards read "today" in the operator's local timezone.
    let view = engine.refresh(&complaints, &now.with_timezone(&Local));
    persist(&mut store, &view)?;

    if ipc_mode {
        run_ipc_loop(&engine, &view)?;
    } else {
        print_summary(&view);
    }
    Ok(())
}

fn persist(store: &mut ComplaintStore, view: &DeskView) -> Result<()> {
    store.upsert_all(&view.complaints)?;
    for event in &view.transitions {
        store.append_escalation_event(event)?;
    }
    Ok(())
}

fn run_ipc_loop(engine: &DeskEngine, view: &DeskView) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                let err_json = serde_json::json!({ "error": e.to_string() });
                writeln!(stdout, "{}", err_json)?;
                stdout.flush()?;
                continue;
            }
        };

        match cmd {
            IpcCommand::Quit => break,
            IpcCommand::GetState => {
                let state = UiState {
                    evaluated_at: view.evaluated_at.to_rfc3339(),
                    summary: &view.summary,
                    zones: &view.zones,
                    transitions: view.transitions.len(),
                    issues: view.issues.len(),
                };
                writeln!(stdout, "{}", serde_json::to_string(&state)?)?;
            }
            IpcCommand::Query { filter, sort } => {
                let complaints = engine.query(&view.complaints, &filter, &sort);
                let result = QueryResult {
                    count: complaints.len(),
                    complaints,
                };
                writeln!(stdout, "{}", serde_json::to_string(&result)?)?;
            }
        }
        stdout.flush()?;
    }
    Ok(())
}

fn print_summary(view: &DeskView) {
    let s = &view.summary;
    println!("=== SUMMARY @ {} ===", view.evaluated_at.to_rfc3339());
    println!("  complaints:     {}", s.total);
    println!("  active:         {}", s.active);
    println!("  resolved today: {}", s.resolved_today);
    println!("  overdue yellow: {}", s.overdue_yellow);
    println!("  overdue red:    {}", s.overdue_red);
    println!("  undated:        {}", s.undated);
    println!("  transitions:    {}", view.transitions.len());
    println!("  issues:         {}", view.issues.len());

    println!();
    println!("=== ZONES ===");
    for (id, zone) in view.zones.ranked() {
        println!(
            "  {:<12} {:>4} ({:>5.1}%) {:?}",
            id, zone.count, zone.percentage, zone.density
        );
    }
    let unmatched = &view.zones.unmatched;
    println!(
        "  {:<12} {:>4} ({:>5.1}%)",
        "(unmatched)", unmatched.count, unmatched.percentage
    );
    println!();
    println!(
        "  map points: {} plotted, {} without coordinates",
        view.map.points.len(),
        view.map.skipped
    );
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

fn string_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}
