//! Line-oriented console front-end.
//!
//! This is the presentation stand-in: it renders session snapshots and
//! turns user input into session commands. All layout concerns live
//! here, none in the session manager.

use crate::{SessionManager, SessionResult, SessionState};

use tapedeck_core::{CaptureBackend, PlaybackBackend, PlaybackFinished, Recording};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Commands the console can issue to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// Toggle the record state (start or finish a take).
    Record,
    /// Toggle playback of the catalog entry at the 1-based index.
    Play(usize),
    /// Delete the catalog entry at the 1-based index.
    Delete(usize),
    /// Print the catalog.
    List,
    /// Re-request microphone access.
    Grant,
    /// Rescan the recordings directory.
    Refresh,
    /// Shut the session down and exit.
    Quit,
}

/// Parse one input line. `None` means unrecognized input.
pub fn parse_command(line: &str) -> Option<ConsoleCommand> {
    let mut words = line.split_whitespace();
    let verb = words.next()?;
    let index = words.next();
    if words.next().is_some() {
        return None;
    }

    match (verb, index) {
        ("record" | "r", None) => Some(ConsoleCommand::Record),
        ("play" | "p", Some(n)) => n.parse().ok().map(ConsoleCommand::Play),
        ("delete" | "d", Some(n)) => n.parse().ok().map(ConsoleCommand::Delete),
        ("list" | "l", None) => Some(ConsoleCommand::List),
        ("grant" | "g", None) => Some(ConsoleCommand::Grant),
        ("refresh", None) => Some(ConsoleCommand::Refresh),
        ("quit" | "q", None) => Some(ConsoleCommand::Quit),
        _ => None,
    }
}

/// Render a snapshot as the catalog view shown after every command.
pub fn render(state: &SessionState) -> String {
    let mut out = String::new();

    let capture = if state.is_recording() {
        "recording"
    } else if state.permission_granted {
        "ready"
    } else {
        "no microphone access (try `grant`)"
    };
    out.push_str(&format!("mic: {}\n", capture));

    if state.recordings.is_empty() {
        out.push_str("  (no recordings)\n");
    }
    for (index, recording) in state.recordings.iter().enumerate() {
        let marker = if state.playing().is_some_and(|r| r.same_clip(recording)) {
            "▶"
        } else {
            " "
        };
        let length = match recording.duration {
            Some(d) => format!("{:.1}s", d.as_secs_f64()),
            None => "--".to_string(),
        };
        out.push_str(&format!(
            "{} {:2}. {}  [{}]\n",
            marker,
            index + 1,
            recording.display_name,
            length
        ));
    }

    out
}

fn print_help() {
    println!(
        "commands: record (r) | play <n> (p) | delete <n> (d) | list (l) | grant (g) | refresh | quit (q)"
    );
}

fn entry_at(state: &SessionState, index: usize) -> Option<Recording> {
    index
        .checked_sub(1)
        .and_then(|i| state.recordings.get(i))
        .cloned()
}

fn report(result: SessionResult<()>) {
    if let Err(e) = result {
        println!("error: {}", e);
    }
}

/// Drive the session from stdin until `quit` or end of input.
///
/// Natural playback completions arrive on `finished_rx` and are fed
/// back into the session between commands.
pub async fn run<C: CaptureBackend, P: PlaybackBackend>(
    mut manager: SessionManager<C, P>,
    mut finished_rx: mpsc::Receiver<PlaybackFinished>,
) -> SessionResult<()> {
    // Log every committed snapshot; this is the same subscription a
    // graphical presentation layer would re-render from.
    let mut state_rx = manager.subscribe();
    tokio::spawn(async move {
        while state_rx.changed().await.is_ok() {
            let state = state_rx.borrow_and_update().clone();
            debug!(
                recording = state.is_recording(),
                playing = state.playing().is_some(),
                clips = state.recordings.len(),
                "Session state changed"
            );
        }
    });

    print_help();
    print!("{}", render(&manager.snapshot()));

    let stdin = tokio::io::stdin();
    let mut lines = BufReader::new(stdin).lines();

    loop {
        tokio::select! {
            maybe_line = lines.next_line() => {
                let Some(line) = maybe_line? else { break };
                let Some(command) = parse_command(&line) else {
                    if !line.trim().is_empty() {
                        print_help();
                    }
                    continue;
                };

                match command {
                    ConsoleCommand::Record => report(manager.toggle_recording().await),
                    ConsoleCommand::Play(index) => match entry_at(&manager.snapshot(), index) {
                        Some(recording) => report(manager.toggle_playback(&recording).await),
                        None => println!("no such entry: {}", index),
                    },
                    ConsoleCommand::Delete(index) => match entry_at(&manager.snapshot(), index) {
                        Some(recording) => report(manager.delete_recording(&recording).await),
                        None => println!("no such entry: {}", index),
                    },
                    ConsoleCommand::List => {}
                    ConsoleCommand::Grant => report(manager.request_permission().await),
                    ConsoleCommand::Refresh => report(manager.refresh().await),
                    ConsoleCommand::Quit => break,
                }
                print!("{}", render(&manager.snapshot()));
            }
            Some(event) = finished_rx.recv() => {
                if let Err(e) = manager.complete_playback(event).await {
                    warn!(error = ?e, "Failed to apply playback completion");
                }
                print!("{}", render(&manager.snapshot()));
            }
        }
    }

    manager.shutdown().await;

    Ok(())
}
