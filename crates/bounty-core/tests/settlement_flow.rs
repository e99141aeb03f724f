use bounty_core::host::AccountId;
use bounty_core::memory::{MemoryBroadcast, MemoryDirectory, MemoryEconomy, MemoryStore};
use bounty_core::{BountyEngine, SettlementOutcome};
use contracts::{BountyConfig, KillEvent, KillParticipant, PlayerId, PlayerRef, TransferCause};

fn player(id: &str, name: &str) -> PlayerRef {
    PlayerRef::new(PlayerId::new(id), name)
}

struct World {
    engine: BountyEngine,
    store: MemoryStore,
    economy: MemoryEconomy,
    broadcast: MemoryBroadcast,
    directory: MemoryDirectory,
}

fn world_with(players: &[PlayerRef], starting_balance: i64) -> World {
    let directory = MemoryDirectory::new();
    let store = MemoryStore::new("bounty");
    let economy = MemoryEconomy::default();
    let broadcast = MemoryBroadcast::new();
    for player in players {
        directory.add_player(player);
        economy.seed_account(player, starting_balance);
    }
    let mut engine = BountyEngine::new(
        BountyConfig::default(),
        Box::new(store.clone()),
        Box::new(directory.clone()),
        Box::new(economy.clone()),
        Box::new(broadcast.clone()),
    );
    engine.rebuild_cache();
    World {
        engine,
        store,
        economy,
        broadcast,
        directory,
    }
}

fn kill_by(victim: PlayerRef, killer: PlayerRef) -> KillEvent {
    KillEvent::new(victim, vec![KillParticipant::primary(killer)])
}

#[test]
fn fresh_world_reads_zero_for_every_resolved_player() {
    let players = [
        player("p:alice", "Alice"),
        player("p:bob", "Bob"),
        player("p:carol", "Carol"),
    ];
    let mut world = world_with(&players, 100);

    for p in &players {
        assert_eq!(world.engine.bounty(&p.player_id), Ok(0));
        assert_eq!(
            world.store.persisted(&p.player_id),
            Some(0),
            "zero entry materialized for {}",
            p.player_id
        );
    }
}

#[test]
fn unresolvable_profiles_do_not_block_others() {
    let alice = player("p:alice", "Alice");
    let mut world = world_with(&[alice.clone()], 100);
    world.directory.add_unresolvable(PlayerId::new("p:ghost"));

    let summary = world.engine.rebuild_cache();

    assert_eq!(summary.enumerated, 2);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.tracked(), 1);
    world.engine.set_bounty(&alice.player_id, 30).expect("set still works");
    assert_eq!(world.engine.bounty(&alice.player_id), Ok(30));
}

#[test]
fn claim_transfer_carries_victim_and_killer_cause() {
    let alice = player("p:alice", "Alice");
    let bob = player("p:bob", "Bob");
    let mut world = world_with(&[alice.clone(), bob.clone()], 100);
    world.engine.set_bounty(&alice.player_id, 50).expect("fund bounty");

    let outcome = world.engine.on_kill(&kill_by(alice.clone(), bob.clone()));
    assert!(outcome.is_paid());

    let transfers = world.economy.transfers();
    assert_eq!(transfers.len(), 1);
    assert_eq!(transfers[0].account, AccountId::new("p:bob"));
    assert_eq!(transfers[0].amount, 50);
    assert_eq!(
        transfers[0].cause,
        TransferCause::claim("bounty", alice.player_id.clone(), bob.player_id.clone())
    );
}

#[test]
fn two_sequential_kills_pay_independent_amounts() {
    let alice = player("p:alice", "Alice");
    let bob = player("p:bob", "Bob");
    let carol = player("p:carol", "Carol");
    let mut world = world_with(&[alice.clone(), bob.clone(), carol.clone()], 100);

    world.engine.set_bounty(&alice.player_id, 50).expect("initial bounty");
    let first = world.engine.on_kill(&kill_by(alice.clone(), bob.clone()));
    assert_eq!(
        first,
        SettlementOutcome::Paid {
            killer: bob.clone(),
            amount: 50
        }
    );
    assert_eq!(world.economy.balance_of(&bob.player_id), Some(150));
    assert_eq!(world.engine.bounty(&alice.player_id), Ok(0));

    let refunded = world
        .engine
        .add_bounty(&alice, &carol, 30)
        .expect("carol refunds the bounty");
    assert_eq!(refunded, 30, "no carry-over from the first claim");

    let second = world.engine.on_kill(&kill_by(alice.clone(), bob.clone()));
    assert_eq!(
        second,
        SettlementOutcome::Paid {
            killer: bob.clone(),
            amount: 30
        }
    );

    assert_eq!(world.economy.balance_of(&bob.player_id), Some(180));
    assert_eq!(world.economy.balance_of(&carol.player_id), Some(70));
    assert_eq!(world.engine.bounty(&alice.player_id), Ok(0));
    assert_eq!(
        world.broadcast.messages(),
        vec![
            "Bob has claimed Alice's bounty!".to_string(),
            "Bob has claimed Alice's bounty!".to_string(),
        ]
    );
}

#[test]
fn mixed_funding_flows_settle_with_single_payout() {
    let alice = player("p:alice", "Alice");
    let bob = player("p:bob", "Bob");
    let carol = player("p:carol", "Carol");
    let mut world = world_with(&[alice.clone(), bob.clone(), carol.clone()], 100);

    world.engine.set_bounty(&alice.player_id, 40).expect("admin bounty");
    world
        .engine
        .add_bounty(&alice, &carol, 30)
        .expect("player top-up");

    let outcome = world.engine.on_kill(&kill_by(alice.clone(), bob.clone()));
    assert_eq!(
        outcome,
        SettlementOutcome::Paid {
            killer: bob.clone(),
            amount: 70
        }
    );

    // One withdrawal for the top-up, one deposit for the claim. The admin-set
    // portion is minted by the payout, the funded portion just moved.
    assert_eq!(world.economy.transfers().len(), 2);
    assert_eq!(world.economy.balance_of(&bob.player_id), Some(170));
    assert_eq!(world.economy.balance_of(&carol.player_id), Some(70));
    assert_eq!(world.economy.balance_of(&alice.player_id), Some(100));
    assert_eq!(world.engine.bounty(&alice.player_id), Ok(0));
}
