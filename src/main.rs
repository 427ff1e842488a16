//! Headless skirmish runner
//!
//! Resolves a battle between two stock armies and prints the result as
//! text or JSON. Seeded runs replay identically.

use clap::Parser;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use warhost::battle::{ArmyRoster, Battle, CastleRecord, Commander, MemorySink, UnitRecord};
use warhost::catalog::{UnitKind, UnitTypeCatalog};
use warhost::core::config::EngineConfig;
use warhost::core::error::Result;

/// Headless skirmish runner - resolve one battle between stock armies
#[derive(Parser, Debug)]
#[command(name = "warhost")]
#[command(about = "Resolve a skirmish between two armies")]
struct Args {
    /// Attacking infantry quantity
    #[arg(long, default_value_t = 100)]
    attackers: u32,

    /// Attacking archer quantity
    #[arg(long, default_value_t = 30)]
    attacker_archers: u32,

    /// Defending infantry quantity
    #[arg(long, default_value_t = 80)]
    defenders: u32,

    /// Defending archer quantity
    #[arg(long, default_value_t = 20)]
    defender_archers: u32,

    /// Warfare skill of the attacking general, if any
    #[arg(long)]
    general: Option<u32>,

    /// Give the defenders a castle of this level
    #[arg(long)]
    castle_level: Option<u32>,

    /// Random seed for deterministic runs
    #[arg(long)]
    seed: Option<u64>,

    /// Engine config TOML file
    #[arg(long)]
    config: Option<std::path::PathBuf>,

    /// Unit stat override TOML file
    #[arg(long)]
    stats: Option<std::path::PathBuf>,

    /// Output format: text or json
    #[arg(long, default_value = "text")]
    format: String,
}

/// JSON output structure
#[derive(Serialize)]
struct SkirmishResult {
    outcome: String,
    rounds: u32,
    attacker_survivors: u32,
    attacker_losses: u32,
    defender_survivors: u32,
    defender_losses: u32,
    seed: u64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let seed = args.seed.unwrap_or_else(rand::random);

    let config = match &args.config {
        Some(path) => EngineConfig::from_toml_str(&std::fs::read_to_string(path)?)?,
        None => EngineConfig::default(),
    };
    let catalog = match &args.stats {
        Some(path) => UnitTypeCatalog::with_overrides(&std::fs::read_to_string(path)?)?,
        None => UnitTypeCatalog::standard(),
    };

    let mut attacker = ArmyRoster::new("Attacker");
    attacker.owner = Some(Uuid::new_v4());
    attacker.general = args.general.map(|warfare| Commander::new("General", warfare));
    if args.attackers > 0 {
        attacker
            .units
            .push(UnitRecord::new(UnitKind::Infantry.id(), args.attackers));
    }
    if args.attacker_archers > 0 {
        attacker
            .units
            .push(UnitRecord::new(UnitKind::Archers.id(), args.attacker_archers));
    }

    let mut defender = ArmyRoster::new("Defender");
    if args.defenders > 0 {
        defender
            .units
            .push(UnitRecord::new(UnitKind::Infantry.id(), args.defenders));
    }
    if args.defender_archers > 0 {
        defender
            .units
            .push(UnitRecord::new(UnitKind::Archers.id(), args.defender_archers));
    }
    if let Some(level) = args.castle_level {
        defender.castle = Some(CastleRecord {
            level,
            defended_position: vec![0, 6, 0],
        });
    }

    let mut battle = Battle::new(
        &[attacker],
        &[defender],
        &catalog,
        config,
        ChaCha8Rng::seed_from_u64(seed),
    )?;
    let sink = MemorySink::new();
    battle.set_attacker_sink(Box::new(sink.clone()));
    battle.set_defender_sink(Box::new(sink.clone()));
    let outcome = battle.run();

    let (attacker_survivors, attacker_losses) = side_totals(&battle, warhost::core::types::Side::Attacker);
    let (defender_survivors, defender_losses) = side_totals(&battle, warhost::core::types::Side::Defender);

    let result = SkirmishResult {
        outcome: format!("{:?}", outcome),
        rounds: battle.round,
        attacker_survivors,
        attacker_losses,
        defender_survivors,
        defender_losses,
        seed,
    };

    match args.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&result).unwrap()),
        _ => {
            for report in &battle.reports {
                println!("{}", report.render());
            }
            println!("Outcome: {}", result.outcome);
            println!("Rounds: {}", result.rounds);
            println!(
                "Attacker survivors: {} (losses {})",
                result.attacker_survivors, result.attacker_losses
            );
            println!(
                "Defender survivors: {} (losses {})",
                result.defender_survivors, result.defender_losses
            );
            println!("Seed: {}", result.seed);
        }
    }
    Ok(())
}

fn side_totals(battle: &Battle, side: warhost::core::types::Side) -> (u32, u32) {
    battle
        .units
        .iter()
        .filter(|u| u.side == side)
        .fold((0, 0), |(survivors, losses), unit| {
            (survivors + unit.quantity, losses + unit.losses)
        })
}
