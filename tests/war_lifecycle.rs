//! War lifecycle integration tests: creation through conclusion

use std::sync::Arc;

use chrono::Utc;

use kingdom_wars::battle::{
    AllianceMember, CombatEventKind, CounterTable, Side, Unit, UnitType, Victor, WarKind,
    WarStatus,
};
use kingdom_wars::core::{
    AllianceId, EngineConfig, GridPos, KingdomId, TieBreak, UnitId, WarId,
};
use kingdom_wars::war::{InMemoryStore, LogTable, ManualClock, MemoryBackup, WarStore};
use kingdom_wars::WarManager;

fn manager_with(config: EngineConfig) -> (WarManager, Arc<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::new());
    let manager = WarManager::new(
        config,
        store.clone(),
        Arc::new(MemoryBackup::new()),
        Arc::new(ManualClock::new(Utc::now())),
    );
    (manager, store)
}

fn kingdom_war() -> WarKind {
    WarKind::Kingdom {
        attacker: KingdomId(1),
        defender: KingdomId(2),
    }
}

fn run_until_idle(manager: &WarManager) -> usize {
    let mut passes = 0;
    while !manager.run_due_wars().unwrap().applied.is_empty() {
        passes += 1;
        assert!(passes <= 100, "war never concluded");
    }
    passes
}

#[test]
fn test_siege_war_runs_to_conclusion() {
    let (manager, store) = manager_with(EngineConfig::default());
    let roster = vec![
        Unit::new(UnitId(1), KingdomId(1), UnitType::Siege, 3, GridPos::new(0, 0)),
        Unit::new(UnitId(2), KingdomId(1), UnitType::Swordsman, 10, GridPos::new(1, 0)),
        Unit::new(UnitId(3), KingdomId(2), UnitType::Spearman, 4, GridPos::new(55, 15)),
    ];
    manager.create_war(WarId(1), kingdom_war(), roster, 40, 42).unwrap();
    manager.activate_war(WarId(1)).unwrap();

    assert_eq!(run_until_idle(&manager), 3);

    let state = manager.war(WarId(1)).unwrap();
    assert_eq!(state.status, WarStatus::Concluded);
    assert_eq!(state.castle_hp, 0);
    assert_eq!(state.tick, 3);

    let score = manager.score(WarId(1)).unwrap().unwrap();
    assert_eq!(score.attacker_score, 13);
    assert_eq!(score.defender_score, 4);
    assert_eq!(score.victor, Some(Victor::Attacker));

    let log = manager.combat_log(WarId(1)).unwrap();
    assert_eq!(log.iter().filter(|e| e.kind == CombatEventKind::Siege).count(), 3);
    assert_eq!(log.iter().filter(|e| e.kind == CombatEventKind::VisionUpdate).count(), 3);
    assert!(log.windows(2).all(|w| w[0].tick <= w[1].tick));

    assert!(!store.in_combat(KingdomId(1)).unwrap());
    assert!(!store.in_combat(KingdomId(2)).unwrap());
}

#[test]
fn test_stalemate_hits_max_ticks_and_draws() {
    let config = EngineConfig {
        tie_break: TieBreak::Draw,
        ..EngineConfig::default()
    };
    let (manager, _) = manager_with(config);
    let roster = vec![
        Unit::new(UnitId(1), KingdomId(1), UnitType::Swordsman, 8, GridPos::new(0, 0)),
        Unit::new(UnitId(2), KingdomId(2), UnitType::Swordsman, 8, GridPos::new(59, 19)),
    ];
    manager.create_war(WarId(7), kingdom_war(), roster, 500, 3).unwrap();
    manager.activate_war(WarId(7)).unwrap();

    run_until_idle(&manager);

    let state = manager.war(WarId(7)).unwrap();
    assert_eq!(state.tick, 12);
    assert_eq!(state.status, WarStatus::Concluded);
    assert_eq!(manager.score(WarId(7)).unwrap().unwrap().victor, Some(Victor::Draw));
}

#[test]
fn test_alliance_war_uses_alliance_tables() {
    let (manager, store) = manager_with(EngineConfig::default());
    let kind = WarKind::Alliance {
        attacker: AllianceId(10),
        defender: AllianceId(20),
        members: vec![
            AllianceMember {
                kingdom_id: KingdomId(1),
                alliance_id: AllianceId(10),
            },
            AllianceMember {
                kingdom_id: KingdomId(2),
                alliance_id: AllianceId(10),
            },
            AllianceMember {
                kingdom_id: KingdomId(3),
                alliance_id: AllianceId(20),
            },
        ],
    };
    let cell = GridPos::new(10, 10);
    let roster = vec![
        Unit::new(UnitId(1), KingdomId(1), UnitType::Swordsman, 5, cell),
        Unit::new(UnitId(2), KingdomId(2), UnitType::Archer, 5, cell),
        Unit::new(UnitId(3), KingdomId(3), UnitType::Spearman, 30, cell),
    ];
    manager.create_war(WarId(3), kind, roster, 100, 5).unwrap();
    manager.activate_war(WarId(3)).unwrap();
    assert!(store.in_combat(KingdomId(3)).unwrap());

    manager.run_due_wars().unwrap();

    let alliance_log = store.combat_log(LogTable::Alliance, WarId(3)).unwrap();
    assert!(store.combat_log(LogTable::Kingdom, WarId(3)).unwrap().is_empty());

    // Allies never strike each other
    for entry in alliance_log.iter().filter(|e| e.kind == CombatEventKind::Attack) {
        let pair = (entry.attacker.unwrap(), entry.defender.unwrap());
        assert!(pair != (UnitId(1), UnitId(2)) && pair != (UnitId(2), UnitId(1)));
    }

    let state = manager.war(WarId(3)).unwrap();
    let score = manager.score(WarId(3)).unwrap().unwrap();
    assert_eq!(score.attacker_score, state.damage_dealt.attacker);
    assert_eq!(score.defender_score, state.damage_dealt.defender);
    assert!(score.attacker_score > 0);
    assert!(score.victor.is_none());
}

#[test]
fn test_surrender_ends_war_and_blocks_ticks() {
    let (manager, store) = manager_with(EngineConfig::default());
    let roster = vec![Unit::new(UnitId(1), KingdomId(1), UnitType::Knight, 10, GridPos::new(0, 0))];
    manager.create_war(WarId(2), kingdom_war(), roster, 100, 8).unwrap();
    manager.activate_war(WarId(2)).unwrap();
    manager.run_due_wars().unwrap();

    let score = manager.surrender(WarId(2), Side::Attacker).unwrap();
    assert_eq!(score.victor, Some(Victor::Defender));
    assert!(!store.in_combat(KingdomId(1)).unwrap());

    let report = manager.run_due_wars().unwrap();
    assert_eq!(report.total(), 0);
    assert_eq!(manager.war(WarId(2)).unwrap().tick, 1);
}

#[test]
fn test_same_seed_same_terrain() {
    let (manager, _) = manager_with(EngineConfig::default());
    manager.create_war(WarId(1), kingdom_war(), Vec::new(), 10, 77).unwrap();
    manager.create_war(WarId(2), kingdom_war(), Vec::new(), 10, 77).unwrap();
    manager.create_war(WarId(3), kingdom_war(), Vec::new(), 10, 78).unwrap();

    let a = manager.war(WarId(1)).unwrap().grid;
    let b = manager.war(WarId(2)).unwrap().grid;
    let c = manager.war(WarId(3)).unwrap().grid;
    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_eq!(a.tile_count(), 60 * 20);
}

#[test]
fn test_counter_swap_invalidates_cache() {
    let (mut manager, store) = manager_with(EngineConfig::default());
    let roster = || {
        vec![
            Unit::new(UnitId(1), KingdomId(1), UnitType::Swordsman, 2, GridPos::new(4, 4)),
            Unit::new(UnitId(2), KingdomId(2), UnitType::Swordsman, 50, GridPos::new(4, 4)),
        ]
    };
    let first_hit = |war: WarId| {
        store
            .combat_log(LogTable::Kingdom, war)
            .unwrap()
            .into_iter()
            .find(|e| e.kind == CombatEventKind::Attack && e.attacker == Some(UnitId(1)))
            .map(|e| e.damage)
            .unwrap()
    };

    manager.create_war(WarId(1), kingdom_war(), roster(), 100, 1).unwrap();
    manager.activate_war(WarId(1)).unwrap();
    manager.run_due_wars().unwrap();
    assert_eq!(first_hit(WarId(1)), 20);

    let mut table = CounterTable::standard();
    table.set(UnitType::Swordsman, UnitType::Swordsman, 3.0);
    manager.set_counter_source(Arc::new(table));

    manager.create_war(WarId(2), kingdom_war(), roster(), 100, 1).unwrap();
    manager.activate_war(WarId(2)).unwrap();
    let report = manager.run_due_wars().unwrap();
    assert!(report.applied.contains(&WarId(2)));
    assert_eq!(first_hit(WarId(2)), 60);
}

#[test]
fn test_shipped_data_files_load() {
    use kingdom_wars::battle::CounterSource;
    use std::path::Path;

    let root = Path::new(env!("CARGO_MANIFEST_DIR"));
    let config = EngineConfig::load(&root.join("data/engine.toml")).unwrap();
    assert_eq!(config.max_battle_ticks, 12);

    let contents = std::fs::read_to_string(root.join("data/counters.toml")).unwrap();
    let table = CounterTable::from_toml_str(&contents).unwrap();
    let standard = CounterTable::standard();
    assert_eq!(table.len(), standard.len());
    for attacker in UnitType::ALL {
        for defender in UnitType::ALL {
            assert_eq!(table.lookup(attacker, defender), standard.lookup(attacker, defender));
        }
    }
}
