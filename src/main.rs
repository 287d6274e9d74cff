//! Offline war simulator
//!
//! Builds a demo kingdom war, drives it through `WarManager` scheduling
//! passes until it concludes, and prints a summary. `--runs N` simulates
//! N consecutive seeds in parallel.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use clap::Parser;
use rayon::prelude::*;
use serde::Serialize;

use kingdom_wars::battle::{
    CombatEventKind, CounterTable, Morale, PatrolZone, StatTable, Unit, UnitStance, UnitType,
    Victor, WarKind,
};
use kingdom_wars::core::{EngineConfig, GridPos, KingdomId, ResolverKind, UnitId, WarId};
use kingdom_wars::war::{BackupSink, InMemoryStore, JsonlBackup, MemoryBackup, SystemClock};
use kingdom_wars::{Result, WarError, WarManager};

/// Kingdom war simulator
#[derive(Parser, Debug)]
#[command(name = "war_sim")]
#[command(about = "Run seeded kingdom wars to conclusion and report scores")]
struct Args {
    /// Engine config TOML (defaults apply to missing fields)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Counter table TOML with [[counter]] rows
    #[arg(long)]
    counters: Option<PathBuf>,

    /// Unit stat overrides TOML
    #[arg(long)]
    stats: Option<PathBuf>,

    /// Combat resolver: simplified or full
    #[arg(long)]
    resolver: Option<String>,

    /// Grid width override
    #[arg(long)]
    width: Option<u32>,

    /// Grid height override
    #[arg(long)]
    height: Option<u32>,

    /// Starting castle hit points
    #[arg(long, default_value_t = 200)]
    castle_hp: u32,

    /// Random seed for the first run
    #[arg(long)]
    seed: Option<u64>,

    /// Number of runs (consecutive seeds, simulated in parallel)
    #[arg(long, default_value_t = 1)]
    runs: u32,

    /// Append tick backups to this JSONL file
    #[arg(long)]
    backup: Option<PathBuf>,

    /// Output format: json or text
    #[arg(long, default_value = "json")]
    format: String,
}

#[derive(Debug, Serialize)]
struct RunSummary {
    seed: u64,
    ticks: u64,
    status: String,
    castle_hp: u32,
    attacker_score: u64,
    defender_score: u64,
    victor: Option<Victor>,
    attacks: usize,
    deaths: usize,
    sieges: usize,
    survivors: usize,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kingdom_wars=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = build_config(&args)?;

    let counters = match &args.counters {
        Some(path) => CounterTable::from_toml_str(&std::fs::read_to_string(path)?)?,
        None => CounterTable::standard(),
    };
    let stats = match &args.stats {
        Some(path) => StatTable::from_toml_str(&std::fs::read_to_string(path)?)?,
        None => StatTable::new(),
    };

    let backup: Arc<dyn BackupSink> = match &args.backup {
        Some(path) => Arc::new(JsonlBackup::open(path)?),
        None => Arc::new(MemoryBackup::new()),
    };

    let first_seed = args.seed.unwrap_or_else(rand::random);
    let counters = Arc::new(counters);

    let results: Vec<Result<RunSummary>> = (0..args.runs.max(1))
        .into_par_iter()
        .map(|i| {
            let seed = first_seed.wrapping_add(u64::from(i));
            simulate(&config, &stats, counters.clone(), backup.clone(), args.castle_hp, seed)
        })
        .collect();

    let summaries = results.into_iter().collect::<Result<Vec<_>>>()?;

    match args.format.as_str() {
        "text" => print_text(&summaries),
        "json" => print_json(&summaries)?,
        other => {
            eprintln!("Unknown format '{}', defaulting to json", other);
            print_json(&summaries)?;
        }
    }

    Ok(())
}

fn build_config(args: &Args) -> Result<EngineConfig> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::new(),
    };

    if let Some(resolver) = &args.resolver {
        config.resolver = match resolver.as_str() {
            "simplified" => ResolverKind::Simplified,
            "full" => ResolverKind::Full,
            other => {
                return Err(WarError::Config(format!("unknown resolver '{}'", other)));
            }
        };
    }
    if let Some(width) = args.width {
        config.grid_width = width;
    }
    if let Some(height) = args.height {
        config.grid_height = height;
    }

    config.validate()?;
    Ok(config)
}

fn simulate(
    config: &EngineConfig,
    stats: &StatTable,
    counters: Arc<CounterTable>,
    backup: Arc<dyn BackupSink>,
    castle_hp: u32,
    seed: u64,
) -> Result<RunSummary> {
    let manager = WarManager::new(
        config.clone(),
        Arc::new(InMemoryStore::new()),
        backup,
        Arc::new(SystemClock),
    )
    .with_stats(stats.clone())
    .with_counter_source(counters);

    let war = WarId(seed);
    let kind = WarKind::Kingdom {
        attacker: KingdomId(1),
        defender: KingdomId(2),
    };
    manager.create_war(war, kind, demo_roster(config), castle_hp, seed)?;
    manager.activate_war(war)?;

    // Each pass applies at most one tick; bounded in case a tick keeps failing
    for _ in 0..=config.max_battle_ticks {
        let report = manager.run_due_wars()?;
        if report.applied.is_empty() {
            break;
        }
    }

    let state = manager.war(war)?;
    let score = manager.score(war)?.unwrap_or_default();
    let log = manager.combat_log(war)?;
    let count = |kind: CombatEventKind| log.iter().filter(|e| e.kind == kind).count();

    Ok(RunSummary {
        seed,
        ticks: state.tick,
        status: state.status.as_str().to_string(),
        castle_hp: state.castle_hp,
        attacker_score: score.attacker_score,
        defender_score: score.defender_score,
        victor: score.victor,
        attacks: count(CombatEventKind::Attack),
        deaths: count(CombatEventKind::Death),
        sieges: count(CombatEventKind::Siege),
        survivors: state.units.len(),
    })
}

/// Attackers march on the castle from the west, defenders hold the east side
fn demo_roster(config: &EngineConfig) -> Vec<Unit> {
    let w = config.grid_width as i32;
    let mid = config.grid_height as i32 / 2;
    let front = GridPos::new(w * 2 / 3, mid);
    let attacker = KingdomId(1);
    let defender = KingdomId(2);

    vec![
        Unit::new(UnitId(1), attacker, UnitType::Siege, 4, GridPos::new(1, mid)),
        Unit::new(UnitId(2), attacker, UnitType::Swordsman, 20, GridPos::new(2, mid - 1))
            .with_stance(UnitStance::AdvanceEngage)
            .with_path([GridPos::new(w / 3, mid), front]),
        Unit::new(UnitId(3), attacker, UnitType::Cavalry, 10, GridPos::new(2, mid + 1))
            .with_stance(UnitStance::AdvanceEngage)
            .with_path([GridPos::new(w / 2, mid + 1), front])
            .with_target_priority(vec![UnitType::Archer, UnitType::Siege])
            .with_fallback(GridPos::new(0, mid), Morale::new(30)),
        Unit::new(UnitId(4), attacker, UnitType::Engineer, 5, GridPos::new(1, mid + 2))
            .with_stance(UnitStance::AdvanceEngage)
            .with_path([front]),
        Unit::new(UnitId(10), defender, UnitType::Spearman, 15, front),
        Unit::new(UnitId(11), defender, UnitType::Archer, 12, GridPos::new(front.x + 2, mid))
            .with_target_priority(vec![UnitType::Swordsman]),
        Unit::new(UnitId(12), defender, UnitType::Scout, 4, GridPos::new(front.x, mid - 3))
            .with_stance(UnitStance::PatrolZone)
            .with_patrol_zone(PatrolZone::new(
                GridPos::new(front.x - 5, mid - 5),
                GridPos::new(front.x + 5, mid + 5),
            )),
    ]
}

fn print_json(summaries: &[RunSummary]) -> Result<()> {
    let json = if summaries.len() == 1 {
        serde_json::to_string_pretty(&summaries[0])?
    } else {
        serde_json::to_string_pretty(summaries)?
    };
    println!("{}", json);
    Ok(())
}

fn print_text(summaries: &[RunSummary]) {
    println!("War Simulation ({})", Utc::now().format("%Y-%m-%d %H:%M:%S"));
    println!("==============");
    for s in summaries {
        println!(
            "seed {:>20}  ticks {:>3}  {:<10}  castle {:>4}  score {}-{}  victor {:?}",
            s.seed,
            s.ticks,
            s.status,
            s.castle_hp,
            s.attacker_score,
            s.defender_score,
            s.victor,
        );
        println!(
            "    attacks {}  deaths {}  sieges {}  survivors {}",
            s.attacks, s.deaths, s.sieges, s.survivors
        );
    }
}
