use std::env;

use bounty_api::{BountyService, HostServices, SqlitePlayerStore, SqliteProfileDirectory};
use bounty_core::host::{BroadcastSink, ProfileDirectory};
use bounty_core::memory::{MemoryBroadcast, MemoryDirectory, MemoryEconomy, MemoryStore};
use bounty_core::SettlementOutcome;
use contracts::{
    BountyCommand, BountyConfig, CommandSource, KillEvent, KillParticipant, PlayerId,
    PlayerProfile, PlayerRef,
};

const STARTING_BALANCE: i64 = 1_000;

fn print_usage() {
    println!("bounty-cli <command>");
    println!("commands:");
    println!("  status [sqlite_path]");
    println!("  rebuild [sqlite_path]");
    println!("  seed <player> [name] [sqlite_path]");
    println!("    a profile seeded without a name is skipped by rebuilds");
    println!("  get <player> [sqlite_path]");
    println!("  set <player> <amount> [sqlite_path]");
    println!("  add <target> <amount> --from <contributor> [sqlite_path]");
    println!("  kill <victim> <killer> [sqlite_path]");
    println!("  demo");
    println!("    scripted in-memory walkthrough, no sqlite");
    println!("default sqlite path: bounty_players.sqlite (override with BOUNTY_SQLITE_PATH)");
}

fn parse_i64(value: Option<&String>, label: &str) -> Result<i64, String> {
    let raw = value.ok_or_else(|| format!("missing {}", label))?;
    raw.parse::<i64>()
        .map_err(|_| format!("invalid {}: {}", label, raw))
}

fn default_sqlite_path() -> String {
    std::env::var("BOUNTY_SQLITE_PATH")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| "bounty_players.sqlite".to_string())
}

fn parse_sqlite_path(value: Option<&String>) -> String {
    value
        .map(String::to_string)
        .filter(|path| !path.trim().is_empty())
        .unwrap_or_else(default_sqlite_path)
}

struct StdoutBroadcast;

impl BroadcastSink for StdoutBroadcast {
    fn broadcast(&mut self, message: &str) {
        println!("[broadcast] {message}");
    }
}

struct CliHost {
    service: BountyService,
    resolver: SqliteProfileDirectory,
}

fn open_host(sqlite_path: &str) -> Result<CliHost, String> {
    let config = BountyConfig::default();
    let store = SqlitePlayerStore::open(sqlite_path, &config.attribute_key)
        .map_err(|err| format!("failed to open sqlite store: {err}"))?;
    let directory = SqliteProfileDirectory::open(sqlite_path)
        .map_err(|err| format!("failed to open sqlite directory: {err}"))?;
    let resolver = SqliteProfileDirectory::open(sqlite_path)
        .map_err(|err| format!("failed to open sqlite directory: {err}"))?;

    // Real hosts bring their own economy; the CLI seeds an in-memory one,
    // so balances reset on every invocation.
    let economy = MemoryEconomy::default();
    for profile in directory.list_all_profiles() {
        if let Some(player) = directory.resolve(&profile) {
            economy.seed_account(&player, STARTING_BALANCE);
        }
    }

    let service = BountyService::start(
        config,
        HostServices {
            store: Box::new(store),
            directory: Box::new(directory),
            economy: Some(Box::new(economy)),
            broadcast: Box::new(StdoutBroadcast),
        },
    );

    Ok(CliHost { service, resolver })
}

fn resolve_target(resolver: &SqliteProfileDirectory, raw: &str) -> PlayerRef {
    let player_id = PlayerId::new(raw);
    let profile = PlayerProfile::new(player_id.clone(), None);
    resolver
        .resolve(&profile)
        .unwrap_or_else(|| PlayerRef::new(player_id, raw))
}

fn run_status(args: &[String]) -> Result<(), String> {
    let sqlite_path = parse_sqlite_path(args.get(2));
    let host = open_host(&sqlite_path)?;
    let bounties = host.service.bounties().map_err(|err| err.to_string())?;

    println!("tracked={} sqlite={}", bounties.len(), sqlite_path);
    for (player, amount) in bounties.iter().filter(|(_, amount)| *amount > 0) {
        println!("  {player} {amount}");
    }
    Ok(())
}

fn run_rebuild(args: &[String]) -> Result<(), String> {
    let sqlite_path = parse_sqlite_path(args.get(2));
    let host = open_host(&sqlite_path)?;
    let summary = host.service.rebuild().map_err(|err| err.to_string())?;
    println!("{summary}");
    Ok(())
}

fn run_seed(args: &[String]) -> Result<(), String> {
    let player_raw = args
        .get(2)
        .cloned()
        .ok_or_else(|| "missing player".to_string())?;
    let display_name = args.get(3).map(String::as_str);
    let sqlite_path = parse_sqlite_path(args.get(4));

    let mut directory = SqliteProfileDirectory::open(&sqlite_path)
        .map_err(|err| format!("failed to open sqlite directory: {err}"))?;
    directory
        .upsert_profile(&PlayerId::new(player_raw.as_str()), display_name)
        .map_err(|err| format!("failed to seed profile: {err}"))?;

    println!(
        "seeded {} name={}",
        player_raw,
        display_name.unwrap_or("<unresolvable>")
    );
    Ok(())
}

fn run_get(args: &[String]) -> Result<(), String> {
    let target_raw = args.get(2).ok_or_else(|| "missing player".to_string())?;
    let sqlite_path = parse_sqlite_path(args.get(3));
    let host = open_host(&sqlite_path)?;

    let target = resolve_target(&host.resolver, target_raw);
    let reply = host.service.submit(
        &CommandSource::console(),
        BountyCommand::Get {
            target: Some(target),
        },
    );
    println!("{}", reply.message);
    Ok(())
}

fn run_set(args: &[String]) -> Result<(), String> {
    let target_raw = args.get(2).ok_or_else(|| "missing player".to_string())?;
    let amount = parse_i64(args.get(3), "amount")?;
    let sqlite_path = parse_sqlite_path(args.get(4));
    let host = open_host(&sqlite_path)?;

    let target = resolve_target(&host.resolver, target_raw);
    let reply = host
        .service
        .submit(&CommandSource::console(), BountyCommand::Set { target, amount });
    println!("{}", reply.message);
    Ok(())
}

fn run_add(args: &[String]) -> Result<(), String> {
    let target_raw = args.get(2).ok_or_else(|| "missing target".to_string())?;
    let amount = parse_i64(args.get(3), "amount")?;
    let contributor_raw = match (args.get(4).map(String::as_str), args.get(5)) {
        (Some("--from"), Some(contributor)) => contributor.clone(),
        _ => return Err("missing --from <contributor>".to_string()),
    };
    let sqlite_path = parse_sqlite_path(args.get(6));
    let host = open_host(&sqlite_path)?;

    let target = resolve_target(&host.resolver, target_raw);
    let contributor = resolve_target(&host.resolver, &contributor_raw);
    let reply = host.service.submit(
        &CommandSource::player(contributor),
        BountyCommand::Add { target, amount },
    );
    println!("{}", reply.message);
    Ok(())
}

fn run_kill(args: &[String]) -> Result<(), String> {
    let victim_raw = args.get(2).ok_or_else(|| "missing victim".to_string())?;
    let killer_raw = args.get(3).ok_or_else(|| "missing killer".to_string())?;
    let sqlite_path = parse_sqlite_path(args.get(4));
    let host = open_host(&sqlite_path)?;

    let victim = resolve_target(&host.resolver, victim_raw);
    let killer = resolve_target(&host.resolver, killer_raw);
    let event = KillEvent::new(victim, vec![KillParticipant::primary(killer)]);

    let outcome = host
        .service
        .handle_kill(&event)
        .map_err(|err| err.to_string())?;
    match outcome {
        SettlementOutcome::Paid { killer, amount } => println!("paid {amount} to {killer}"),
        SettlementOutcome::Skipped(reason) => println!("skipped: {reason}"),
        SettlementOutcome::Failed(err) => println!("failed: {err}"),
    }
    Ok(())
}

fn run_demo() -> Result<(), String> {
    let alice = PlayerRef::new(PlayerId::new("p:alice"), "Alice");
    let bob = PlayerRef::new(PlayerId::new("p:bob"), "Bob");
    let carol = PlayerRef::new(PlayerId::new("p:carol"), "Carol");

    let directory = MemoryDirectory::new();
    let store = MemoryStore::new("bounty");
    let economy = MemoryEconomy::default();
    let broadcast = MemoryBroadcast::new();
    for player in [&alice, &bob, &carol] {
        directory.add_player(player);
        economy.seed_account(player, 100);
    }

    let service = BountyService::start(
        BountyConfig::default(),
        HostServices {
            store: Box::new(store),
            directory: Box::new(directory),
            economy: Some(Box::new(economy.clone())),
            broadcast: Box::new(broadcast.clone()),
        },
    );

    let reply = service.submit(
        &CommandSource::console(),
        BountyCommand::Set {
            target: alice.clone(),
            amount: 50,
        },
    );
    println!("set:  {}", reply.message);

    let reply = service.submit(
        &CommandSource::player(bob.clone()),
        BountyCommand::Get {
            target: Some(alice.clone()),
        },
    );
    println!("get:  {}", reply.message);

    let reply = service.submit(
        &CommandSource::player(carol.clone()),
        BountyCommand::Add {
            target: alice.clone(),
            amount: 25,
        },
    );
    println!("add:  {}", reply.message);

    let event = KillEvent::new(alice.clone(), vec![KillParticipant::primary(bob.clone())]);
    match service.handle_kill(&event).map_err(|err| err.to_string())? {
        SettlementOutcome::Paid { killer, amount } => println!("kill: paid {amount} to {killer}"),
        SettlementOutcome::Skipped(reason) => println!("kill: skipped: {reason}"),
        SettlementOutcome::Failed(err) => println!("kill: failed: {err}"),
    }

    println!("broadcasts:");
    for message in broadcast.messages() {
        println!("  {message}");
    }

    println!("balances:");
    for player in [&alice, &bob, &carol] {
        let balance = economy.balance_of(&player.player_id).unwrap_or(0);
        println!("  {} {}", player, balance);
    }

    println!("bounties:");
    for (player, amount) in service.bounties().map_err(|err| err.to_string())? {
        println!("  {player} {amount}");
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();
    let command = args.get(1).map(String::as_str);

    let outcome = match command {
        Some("status") => run_status(&args),
        Some("rebuild") => run_rebuild(&args),
        Some("seed") => run_seed(&args),
        Some("get") => run_get(&args),
        Some("set") => run_set(&args),
        Some("add") => run_add(&args),
        Some("kill") => run_kill(&args),
        Some("demo") => run_demo(),
        _ => {
            print_usage();
            return;
        }
    };

    if let Err(err) = outcome {
        eprintln!("error: {err}");
        print_usage();
        std::process::exit(2);
    }
}
