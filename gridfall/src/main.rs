use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use console::{Key, Term};
use gridfall::{
    draw, shared_frame, BotPilot, Frame, FrameSink, Game, GamePhase, SharedFrame,
};
use gridfall_rooms::{
    generate_unique_name, GameInput, LocalGame, MatchCommand, MatchCoordinator, MatchEvent,
    MemoryStore, PlayerId, PlayerSide, Room, Winner,
};
use tokio::time::{interval, interval_at, Instant, MissedTickBehavior};

#[derive(Parser)]
#[command(about = "Terminal falling-block game with a two-player duel mode")]
struct Args {
    /// Display name, randomly generated when omitted
    #[arg(short, long)]
    name: Option<String>,

    /// Play a duel against the built-in opponent over the room protocol
    #[arg(short, long)]
    duel: bool,
}

enum KeyCommand {
    Input(GameInput),
    Start,
    Quit,
}

/// Blocking key reader feeding the async loops
fn spawn_key_reader(tx: flume::Sender<KeyCommand>) {
    tokio::task::spawn_blocking(move || {
        let term = Term::stdout();
        loop {
            let command = match term.read_key() {
                Ok(Key::ArrowLeft) => KeyCommand::Input(GameInput::Left),
                Ok(Key::ArrowRight) => KeyCommand::Input(GameInput::Right),
                Ok(Key::ArrowDown) => KeyCommand::Input(GameInput::SoftDrop),
                Ok(Key::ArrowUp) => KeyCommand::Input(GameInput::Rotate),
                Ok(Key::Char(' ')) => KeyCommand::Input(GameInput::HardDrop),
                // 'з' sits on the 'p' key on a Cyrillic layout
                Ok(Key::Char('p')) | Ok(Key::Char('P')) | Ok(Key::Char('з'))
                | Ok(Key::Char('З')) => KeyCommand::Input(GameInput::TogglePause),
                Ok(Key::Enter) => KeyCommand::Start,
                Ok(Key::Char('q')) | Ok(Key::Char('Q')) | Ok(Key::Escape) => KeyCommand::Quit,
                Ok(_) => continue,
                Err(_) => KeyCommand::Quit,
            };
            let quit = matches!(command, KeyCommand::Quit);
            if tx.send(command).is_err() || quit {
                break;
            }
        }
    });
}

fn frame_snapshot(frame: &SharedFrame) -> Frame {
    match frame.lock() {
        Ok(guard) => guard.clone(),
        Err(_) => Frame::default(),
    }
}

/// Single-player session, the engine driven directly by the main loop
async fn run_solo(term: &Term, key_rx: flume::Receiver<KeyCommand>) -> Result<()> {
    let frame = shared_frame();
    let mut game = Game::new(Box::new(FrameSink::new(frame.clone())));
    game.start();

    let mut drop_interval = Game::drop_interval(&game);
    let mut gravity = interval_at(Instant::now() + drop_interval, drop_interval);
    gravity.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut was_running = game.is_running();
    let mut render = interval(Duration::from_millis(50));

    loop {
        tokio::select! {
            key = key_rx.recv_async() => match key {
                Ok(KeyCommand::Input(input)) => game.apply(input),
                Ok(KeyCommand::Start) => {
                    if !game.is_active() {
                        game.start();
                    }
                }
                Ok(KeyCommand::Quit) | Err(_) => break,
            },
            _ = gravity.tick(), if game.is_running() => Game::gravity_tick(&mut game),
            _ = render.tick() => {
                let status = match game.phase() {
                    GamePhase::Paused => "PAUSED",
                    GamePhase::GameOver => "GAME OVER, press Enter to restart",
                    _ => "",
                };
                draw(term, &frame_snapshot(&frame), None, status)?;
            }
        }

        // fresh timer after a level change and after a resume or restart
        let current = Game::drop_interval(&game);
        let now_running = game.is_running();
        if current != drop_interval || (now_running && !was_running) {
            drop_interval = current;
            gravity = interval_at(Instant::now() + drop_interval, drop_interval);
            gravity.set_missed_tick_behavior(MissedTickBehavior::Delay);
        }
        was_running = now_running;
    }
    Ok(())
}

fn winner_line(winner: Winner, side: PlayerSide) -> &'static str {
    if winner == Winner::Draw {
        "DRAW, press q to quit"
    } else if winner == side.as_winner() {
        "YOU WIN, press q to quit"
    } else {
        "OPPONENT WINS, press q to quit"
    }
}

/// Duel against the built-in opponent, both sides running the full room
/// protocol over an in-process store
async fn run_duel(
    term: &Term,
    key_rx: flume::Receiver<KeyCommand>,
    name: &str,
) -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    let frame = shared_frame();

    let game = Game::new(Box::new(FrameSink::new(frame.clone())));
    let host = MatchCoordinator::host(store.clone(), PlayerId::generate(), name, game).await?;
    let code = host.code().clone();
    let side = host.side();
    let commands = host.sender();
    let events = host.events();

    let bot = MatchCoordinator::join(
        store.clone(),
        &code,
        PlayerId::generate(),
        "Bot",
        BotPilot::new(),
    )
    .await?;
    // keep the bot's command channel open for the whole match
    let _bot_commands = bot.sender();

    tokio::spawn(host.run());
    tokio::spawn(bot.run());

    let mut render = interval(Duration::from_millis(50));
    let mut room: Option<Room> = None;
    let mut status = String::from("press Enter to start");

    loop {
        tokio::select! {
            key = key_rx.recv_async() => match key {
                Ok(KeyCommand::Input(input)) => {
                    let _ = commands.send(MatchCommand::Input(input));
                }
                Ok(KeyCommand::Start) => {
                    let _ = commands.send(MatchCommand::StartGame);
                }
                Ok(KeyCommand::Quit) | Err(_) => {
                    let _ = commands.send(MatchCommand::Leave);
                }
            },
            event = events.recv_async() => match event {
                Ok(MatchEvent::RoomUpdated(updated)) => room = Some(updated),
                Ok(MatchEvent::BothPlayersReady) => {
                    status = String::from("opponent ready, press Enter to start");
                }
                Ok(MatchEvent::Started) => status.clear(),
                Ok(MatchEvent::OpponentEliminated) => {
                    status = String::from("opponent topped out, finish your game");
                }
                Ok(MatchEvent::Eliminated) => {
                    status = String::from("topped out, waiting for the opponent");
                }
                Ok(MatchEvent::Finished { winner, room: final_room }) => {
                    room = Some(final_room);
                    status = String::from(winner_line(winner, side));
                }
                Ok(MatchEvent::ConnectionLost) | Ok(MatchEvent::Left) | Err(_) => break,
            },
            _ = render.tick() => {
                let opponent = room.as_ref().and_then(|r| r.slot(side.opponent()));
                draw(term, &frame_snapshot(&frame), opponent, &status)?;
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // logs go to stderr so they do not tear the game screen
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let name = args.name.unwrap_or_else(generate_unique_name);

    let (key_tx, key_rx) = flume::unbounded();
    spawn_key_reader(key_tx);

    let term = Term::stdout();
    term.clear_screen()?;
    term.hide_cursor()?;

    let outcome = if args.duel {
        run_duel(&term, key_rx, &name).await
    } else {
        run_solo(&term, key_rx).await
    };

    term.show_cursor()?;
    term.clear_screen()?;
    outcome
}
