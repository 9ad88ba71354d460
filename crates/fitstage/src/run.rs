use std::io::{self, BufRead};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use sequencer::{AdvanceCause, NavigationIntent, Rendition, Stage, StageEvent};
use stageconfig::StageConfig;
use tracing_subscriber::EnvFilter;

use crate::cli::RunArgs;
use crate::console::{parse_command, ConsoleCommand, Selection, HELP};
use crate::paths::{load_config, AppPaths};
use crate::player::SimulatedPlayer;

type SimStage = Stage<SimulatedPlayer>;

pub fn run(args: RunArgs) -> Result<()> {
    let paths = AppPaths::discover()?;
    let (config, source) = load_config(args.config.as_deref(), &paths)?;
    tracing::debug!(
        config_dir = %paths.config_dir().display(),
        source = ?source,
        exercises = config.exercises.len(),
        "resolved stage configuration"
    );
    warn_unknown_rejections(&config, &args.reject_raw);

    let mut stage = build_stage(&config, &args)?;
    println!(
        "{} exercises loaded; webcam feed {}",
        stage.catalog().len(),
        config.webcam_feed_url()
    );
    print_status(&stage);

    let commands = spawn_console_reader()?;
    let tick = Duration::from_millis(args.tick_ms.max(1));
    let mut input_open = true;

    loop {
        if input_open {
            match commands.recv_timeout(tick) {
                Ok(line) => match parse_command(&line) {
                    Ok(Some(ConsoleCommand::Quit)) => break,
                    Ok(Some(command)) => handle_command(&mut stage, command),
                    Ok(None) => {}
                    Err(message) => eprintln!("{message}"),
                },
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    tracing::debug!("console input closed; settling before exit");
                    input_open = false;
                }
            }
        } else {
            if !is_busy(&stage) {
                break;
            }
            thread::sleep(tick);
        }

        let events = stage.tick(Instant::now());
        report_events(&stage, &events);
    }

    stage.shutdown();
    tracing::info!("stage closed");
    Ok(())
}

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn build_stage(config: &StageConfig, args: &RunArgs) -> Result<SimStage> {
    let clip_length = args.clip_length;
    let reject_raw = &args.reject_raw;
    let stage = Stage::new(config, |entry, rendition| {
        let reject = rendition == Rendition::Raw && reject_raw.iter().any(|id| *id == entry.id);
        SimulatedPlayer::new(entry.source(rendition), clip_length, reject)
    })
    .context("failed to mount exercise stage")?;

    if args.offline {
        tracing::info!("backend sync disabled (--offline)");
        return Ok(stage);
    }
    match posesync::notifier_from_config(config)? {
        Some(notifier) => Ok(stage.with_notifier(Box::new(notifier))),
        None => Ok(stage),
    }
}

fn warn_unknown_rejections(config: &StageConfig, reject_raw: &[String]) {
    for id in reject_raw {
        if config.exercise(id).is_none() {
            tracing::warn!(exercise = %id, "--reject-raw names an exercise not in the catalog");
        }
    }
}

fn spawn_console_reader() -> Result<Receiver<String>> {
    let (tx, rx) = crossbeam_channel::unbounded();
    thread::Builder::new()
        .name("fitstage-console".into())
        .spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        tracing::warn!(%err, "failed to read console input");
                        break;
                    }
                }
            }
        })
        .context("failed to spawn console reader")?;
    Ok(rx)
}

fn handle_command(stage: &mut SimStage, command: ConsoleCommand) {
    let now = Instant::now();
    let events = match command {
        ConsoleCommand::Select(selection) => {
            let result = match &selection {
                Selection::Index(index) => stage.select(*index, now),
                Selection::Id(id) => stage.select_id(id, now),
            };
            match result {
                Ok(events) => {
                    if events.is_empty() {
                        println!("selection ignored");
                    }
                    events
                }
                Err(err) => {
                    tracing::warn!(%err, "selection rejected");
                    return;
                }
            }
        }
        ConsoleCommand::Next => stage.clip_ended(now),
        ConsoleCommand::Toggle => stage.toggle_rendition(now),
        ConsoleCommand::Layout => stage.cycle_layout(now),
        ConsoleCommand::Back => vec![stage.back()],
        ConsoleCommand::Status => {
            print_status(stage);
            return;
        }
        ConsoleCommand::Frame => {
            print_frame(stage, now);
            return;
        }
        ConsoleCommand::Help => {
            println!("{HELP}");
            return;
        }
        ConsoleCommand::Quit => return,
    };
    report_events(stage, &events);
}

fn is_busy(stage: &SimStage) -> bool {
    let playback = stage.status().playback;
    playback.fading_to.is_some()
        || playback.rendition_transitioning
        || stage.layout().is_transitioning()
}

fn label(stage: &SimStage, index: usize) -> &str {
    stage
        .catalog()
        .get(index)
        .map(|entry| entry.label.as_str())
        .unwrap_or("?")
}

fn report_events(stage: &SimStage, events: &[StageEvent]) {
    for event in events {
        match event {
            StageEvent::FadeStarted { from, to, cause } => {
                let suffix = match cause {
                    AdvanceCause::Selected => "",
                    AdvanceCause::ClipEnded => " after clip end",
                };
                println!("fading {from} -> {to} ({}){suffix}", label(stage, *to));
            }
            StageEvent::ExerciseChanged { index } => {
                println!("now showing {index} ({})", label(stage, *index));
            }
            StageEvent::ClipRestarted { index } => {
                println!("replaying {index} ({})", label(stage, *index));
            }
            StageEvent::RenditionChanged { rendition } => println!("rendition: {rendition}"),
            StageEvent::RenditionRejected { rendition } => {
                println!(
                    "{rendition} rendition refused to play; staying on {}",
                    rendition.other()
                );
            }
            StageEvent::SyncResolved { label, delivered } => {
                let outcome = if *delivered { "delivered" } else { "failed" };
                println!("backend sync for {label}: {outcome}");
            }
            StageEvent::LayoutChanging { next } => println!("layout -> {next}"),
            StageEvent::LayoutChanged { view } => println!("layout: {view}"),
            StageEvent::Navigate(NavigationIntent::Back) => println!("navigate: back"),
        }
    }
}

fn print_status(stage: &SimStage) {
    let status = stage.status();
    let playback = status.playback;
    let position = stage
        .sequencer()
        .slot(playback.active, playback.rendition)
        .map(|slot| slot.position())
        .unwrap_or_default();
    println!(
        "active {} ({}) rendition={} view={} position={:.1}s",
        playback.active,
        status.label,
        playback.rendition,
        status.view,
        position.as_secs_f32()
    );
    if let Some(target) = playback.fading_to {
        println!("  fading to {target} ({})", label(stage, target));
    }
    if playback.rendition_transitioning {
        println!("  rendition settling");
    }
    if let Some(next) = status.layout_pending {
        println!("  layout changing to {next}");
    }
}

fn print_frame(stage: &SimStage, now: Instant) {
    let frame = stage.frame(now);
    println!("view={} opacity={:.2}", frame.view, frame.layout_opacity);
    for slot in &frame.video {
        println!(
            "  video {} {:<9} {:.2} {}",
            slot.index,
            slot.rendition.as_str(),
            slot.opacity,
            slot.uri
        );
    }
    if let Some(feed) = &frame.webcam_feed {
        println!("  webcam {feed}");
    }
}
