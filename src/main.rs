// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use axe_setlist::config::{self, AppConfig};
use axe_setlist::device::{self, Model, PRESET_NAME_LEN};
use axe_setlist::midi::{print_destinations, print_sources, Connection, Delivery, MidirBackend};
use axe_setlist::provision::{self, ProvisionRequest};
use axe_setlist::query::PresetQueryService;
use axe_setlist::services::{self, MatchPicks, PcoClient, SpotifyClient};
use axe_setlist::setlist::{SetlistId, SetlistStore, Song};

fn print_usage() {
    println!("axe-setlist - Provision Axe-Fx presets from a setlist");
    println!();
    println!("Usage: axe-setlist [--config <PATH>] <COMMAND>");
    println!();
    println!("Commands:");
    println!("  --list-midi                           List MIDI outputs");
    println!("  --list-sources                        List MIDI inputs");
    println!("  --monitor [SECS]                      Log device messages (default 30s)");
    println!("  --setlists                            List setlists");
    println!("  --create-setlist <NAME>               Create an empty setlist");
    println!("  --add-song <ID> <TITLE> <KEY> <BPM>   Append a song");
    println!("  --update-song <ID> <N> <TITLE> <KEY> <BPM>");
    println!("                                        Replace song N (0-based)");
    println!("  --remove-song <ID> <N>                Remove song N (0-based)");
    println!("  --remove-setlist <ID>                 Delete a setlist");
    println!("  --plan <ID>                           Show the commands for a setlist");
    println!("  --provision <ID>                      Write a setlist to the device");
    println!("  --query <PRESET> [COUNT]              Read preset names");
    println!("  --services                            List Planning Center plans");
    println!("  --matches <TYPE_ID> <PLAN_ID>         List Spotify matches for a plan");
    println!("  --import <TYPE_ID> <PLAN_ID> <NAME> [SONG=MATCH ...]");
    println!("                                        Create a setlist from a plan");
    println!("  --help                                Show this help message");
    println!();
    println!("Config file: --config, ${} or {}", config::CONFIG_PATH_ENV, config::DEFAULT_CONFIG_FILE);
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "axe_setlist=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Exit with a usage error unless `args` holds at least `count` entries
fn require_args(args: &[String], count: usize, usage: &str) {
    if args.len() < count {
        eprintln!("Error: {} requires {}", args[1], usage);
        eprintln!("Use --help for usage information");
        std::process::exit(1);
    }
}

fn parse_arg<T: FromStr>(args: &[String], index: usize, what: &str) -> Result<T> {
    args[index]
        .parse()
        .map_err(|_| anyhow!("Invalid {}: {}", what, args[index]))
}

/// Remove `--config <PATH>` from the arguments, returning the path
fn take_config_flag(args: &mut Vec<String>) -> Result<Option<String>> {
    let Some(position) = args.iter().position(|arg| arg == "--config") else {
        return Ok(None);
    };
    if position + 1 >= args.len() {
        return Err(anyhow!("--config requires a path"));
    }
    let path = args.remove(position + 1);
    args.remove(position);
    Ok(Some(path))
}

fn open_store(config: &AppConfig) -> Result<SetlistStore> {
    SetlistStore::open(&config.store.path)
        .with_context(|| format!("Failed to open setlist store {:?}", config.store.path))
}

fn connect(config: &AppConfig) -> Result<Connection> {
    let connection = Connection::connect(&MidirBackend::new(), config.connect_options())
        .context("Failed to connect to the device")?;
    println!(
        "Connected: in '{}', out '{}'",
        connection.input_name(),
        connection.output_name()
    );
    Ok(connection)
}

fn list_setlists(config: &AppConfig) -> Result<()> {
    let store = open_store(config)?;
    let setlists = store.list_setlists(&config.store.user);
    if setlists.is_empty() {
        println!("No setlists for user '{}'", config.store.user);
        return Ok(());
    }
    for setlist in setlists {
        println!("{:>4}  {} ({} songs)", setlist.id, setlist.name, setlist.songs.len());
        for (index, song) in setlist.songs.iter().enumerate() {
            println!("      {:>2}. [{}] {} - {} bpm", index, song.key, song.title, song.tempo);
        }
    }
    Ok(())
}

fn provision_request(config: &AppConfig, model: Model, id: SetlistId) -> Result<ProvisionRequest> {
    let store = open_store(config)?;
    let setlist = store.setlist(&config.store.user, id)?;

    for song in &setlist.songs {
        let name = provision::preset_name(song);
        if name.chars().count() > PRESET_NAME_LEN {
            tracing::warn!(
                name = %name,
                limit = PRESET_NAME_LEN,
                "Preset name will be truncated"
            );
        }
    }

    Ok(ProvisionRequest {
        model,
        base_preset: config.presets.base,
        starting_preset: config.presets.starting,
        songs: setlist.songs.clone(),
    })
}

fn show_plan(config: &AppConfig, id: SetlistId) -> Result<()> {
    let model = config.midi.model.unwrap_or(Model::AxeFxII);
    let sequence = provision_request(config, model, id)?.plan()?;

    println!("{} commands for {}:", sequence.len(), model);
    for (step, (command, frame)) in sequence
        .commands()
        .iter()
        .zip(sequence.encode())
        .enumerate()
    {
        let hex: Vec<String> = frame.iter().map(|b| format!("{:02X}", b)).collect();
        println!("{:>4}  {:<40} {}", step + 1, command.to_string(), hex.join(" "));
    }
    Ok(())
}

async fn provision_setlist(config: &AppConfig, id: SetlistId) -> Result<()> {
    let connection = connect(config)?;
    let model = connection.model()?;
    let request = provision_request(config, model, id)?;
    let sequence = request.plan()?;

    let sent = provision::send_sequence(&connection.output(), &sequence, config.send_interval()).await?;
    println!("Sent {} messages for {} songs", sent, request.songs.len());

    if request.songs.is_empty() {
        return Ok(());
    }

    // Read the new names back
    let service = PresetQueryService::new(
        connection.output(),
        connection.bus(),
        model,
        config.query_options(),
    );
    let first = request.starting_preset;
    let last = first + request.songs.len() as u16;
    let names = service.query_preset_names(first..last).await?;

    let mut mismatches = 0;
    for ((preset, name), song) in names.iter().zip(&request.songs) {
        let expected = device::stored_name(&provision::preset_name(song));
        if *name == expected {
            println!("{:>4}  {}", preset, name);
        } else {
            mismatches += 1;
            println!("{:>4}  {}  (expected '{}')", preset, name, expected);
        }
    }

    if mismatches > 0 {
        return Err(anyhow!("{} preset(s) did not verify", mismatches));
    }
    println!("Provisioning verified");
    Ok(())
}

async fn query_presets(config: &AppConfig, first: u16, count: u16) -> Result<()> {
    let connection = connect(config)?;
    let service = PresetQueryService::new(
        connection.output(),
        connection.bus(),
        connection.model()?,
        config.query_options(),
    );

    let last = first
        .checked_add(count)
        .ok_or_else(|| anyhow!("Preset range overflows"))?;
    for (preset, name) in service.query_preset_names(first..last).await? {
        println!("{:>4}  {}", preset, name);
    }
    Ok(())
}

async fn monitor(config: &AppConfig, seconds: u64) -> Result<()> {
    let connection = connect(config)?;
    let bus = connection.bus();

    // Beat clock and other quiet types stay off the console
    let _subscriptions: Vec<_> = config
        .connect_options()
        .audible_event_types()
        .into_iter()
        .map(|event_type| {
            bus.subscribe(event_type, |event| {
                println!("{:?}", event);
                Delivery::Keep
            })
        })
        .collect();

    println!("Monitoring device for {}s (press Ctrl+C to stop)...", seconds);
    tokio::time::sleep(Duration::from_secs(seconds)).await;
    println!("Monitor complete!");
    Ok(())
}

fn pco_client(config: &AppConfig) -> Result<PcoClient> {
    let token = config
        .services
        .pco_token
        .clone()
        .ok_or_else(|| anyhow!("No Planning Center token; set ${}", config::PCO_TOKEN_ENV))?;
    Ok(PcoClient::new(token)?)
}

fn spotify_client(config: &AppConfig) -> Result<SpotifyClient> {
    let token = config
        .services
        .spotify_token
        .clone()
        .ok_or_else(|| anyhow!("No Spotify token; set ${}", config::SPOTIFY_TOKEN_ENV))?;
    Ok(SpotifyClient::new(token)?)
}

async fn list_plans(config: &AppConfig) -> Result<()> {
    let pco = pco_client(config)?;
    for plan in pco.all_plans().await? {
        println!(
            "{:>10} {:>10}  {}  {}",
            plan.service_type_id,
            plan.id,
            plan.dates.as_deref().unwrap_or("-"),
            plan.title.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

async fn list_matches(config: &AppConfig, service_type_id: &str, plan_id: &str) -> Result<()> {
    let pco = pco_client(config)?;
    let spotify = spotify_client(config)?;
    let songs = services::plan_candidates(
        &pco,
        &spotify,
        service_type_id,
        plan_id,
        config.services.search_limit,
    )
    .await?;

    for (position, entry) in songs.iter().enumerate() {
        println!("{:>2}. {}", position, entry.plan_song.title);
        if entry.candidates.is_empty() {
            println!("      (no matches)");
        }
        for (index, candidate) in entry.candidates.iter().enumerate() {
            println!(
                "      {}={}  {} - {} ({} bpm)",
                position,
                index,
                candidate.track.name,
                candidate.track.artist_names(),
                candidate.features.tempo as u16
            );
        }
    }
    Ok(())
}

async fn import(
    config: &AppConfig,
    service_type_id: &str,
    plan_id: &str,
    name: &str,
    picks: &[String],
) -> Result<()> {
    let picks = picks
        .iter()
        .map(|pick| services::parse_pick(pick).ok_or_else(|| anyhow!("Invalid match pick: {}", pick)))
        .collect::<Result<MatchPicks>>()?;

    let pco = pco_client(config)?;
    let spotify = spotify_client(config)?;
    let songs = services::import_plan(
        &pco,
        &spotify,
        service_type_id,
        plan_id,
        config.services.search_limit,
        &picks,
    )
    .await?;

    let mut store = open_store(config)?;
    let user = &config.store.user;
    let id = store.create_setlist(user, name)?;
    for song in songs {
        println!("  [{}] {} - {} bpm", song.key, song.title, song.tempo);
        store.add_song(user, id, song)?;
    }
    println!("Created setlist {} '{}'", id, name);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let mut args: Vec<String> = env::args().collect();
    let config_override = take_config_flag(&mut args)?;

    if args.len() < 2 {
        println!("axe-setlist - Provision Axe-Fx presets from a setlist");
        println!("Run with --help for usage information");
        return Ok(());
    }

    let path = config::config_path(config_override.as_deref());
    let mut config = AppConfig::load_or_default(&path)?;
    config.apply_env();
    let user = config.store.user.clone();

    match args[1].as_str() {
        "--list-midi" => {
            print_destinations()?;
        }
        "--list-sources" => {
            print_sources()?;
        }
        "--monitor" => {
            let seconds = if args.len() >= 3 {
                parse_arg(&args, 2, "duration")?
            } else {
                30
            };
            monitor(&config, seconds).await?;
        }
        "--setlists" => {
            list_setlists(&config)?;
        }
        "--create-setlist" => {
            require_args(&args, 3, "a setlist name");
            let id = open_store(&config)?.create_setlist(&user, &args[2])?;
            println!("Created setlist {}", id);
        }
        "--add-song" => {
            require_args(&args, 6, "<ID> <TITLE> <KEY> <BPM>");
            let id = parse_arg(&args, 2, "setlist id")?;
            let song = Song::new(&args[3], &args[4], parse_arg(&args, 5, "tempo")?);
            open_store(&config)?.add_song(&user, id, song)?;
        }
        "--update-song" => {
            require_args(&args, 7, "<ID> <N> <TITLE> <KEY> <BPM>");
            let id = parse_arg(&args, 2, "setlist id")?;
            let index = parse_arg(&args, 3, "song index")?;
            let song = Song::new(&args[4], &args[5], parse_arg(&args, 6, "tempo")?);
            open_store(&config)?.update_song(&user, id, index, song)?;
        }
        "--remove-song" => {
            require_args(&args, 4, "<ID> <N>");
            let id = parse_arg(&args, 2, "setlist id")?;
            let index = parse_arg(&args, 3, "song index")?;
            let song = open_store(&config)?.remove_song(&user, id, index)?;
            println!("Removed '{}'", song.title);
        }
        "--remove-setlist" => {
            require_args(&args, 3, "a setlist id");
            let id = parse_arg(&args, 2, "setlist id")?;
            let setlist = open_store(&config)?.remove_setlist(&user, id)?;
            println!("Removed setlist '{}'", setlist.name);
        }
        "--plan" => {
            require_args(&args, 3, "a setlist id");
            show_plan(&config, parse_arg(&args, 2, "setlist id")?)?;
        }
        "--provision" => {
            require_args(&args, 3, "a setlist id");
            provision_setlist(&config, parse_arg(&args, 2, "setlist id")?).await?;
        }
        "--query" => {
            require_args(&args, 3, "a preset number");
            let preset = parse_arg(&args, 2, "preset number")?;
            let count = if args.len() >= 4 {
                parse_arg(&args, 3, "count")?
            } else {
                1
            };
            query_presets(&config, preset, count).await?;
        }
        "--services" => {
            list_plans(&config).await?;
        }
        "--matches" => {
            require_args(&args, 4, "<TYPE_ID> <PLAN_ID>");
            list_matches(&config, &args[2], &args[3]).await?;
        }
        "--import" => {
            require_args(&args, 5, "<TYPE_ID> <PLAN_ID> <NAME>");
            import(&config, &args[2], &args[3], &args[4], &args[5..]).await?;
        }
        "--help" | "-h" => {
            print_usage();
        }
        _ => {
            eprintln!("Unknown option: {}", args[1]);
            print_usage();
            std::process::exit(1);
        }
    }

    Ok(())
}
