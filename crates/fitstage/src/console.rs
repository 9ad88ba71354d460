#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Index(usize),
    Id(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Select(Selection),
    /// Pretend the active clip just finished.
    Next,
    Toggle,
    Layout,
    Back,
    Status,
    Frame,
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  select <index|id>  fade to a catalog entry and notify the backend
  next               end the active clip (autoplay advance)
  toggle             swap processed/raw rendition
  layout             cycle split -> video -> webcam
  back               request navigation to the previous screen
  status             print playback and layout state
  frame              print what would be drawn right now
  quit               exit";

/// Blank lines and `#` comments yield `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<ConsoleCommand>, String> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let mut parts = trimmed.split_whitespace();
    let verb = parts.next().unwrap_or_default().to_ascii_lowercase();
    let argument = parts.next();
    if parts.next().is_some() {
        return Err(format!("too many arguments for '{verb}'"));
    }

    let command = match (verb.as_str(), argument) {
        ("select" | "s", Some(target)) => ConsoleCommand::Select(parse_selection(target)),
        ("select" | "s", None) => return Err("select requires an index or exercise id".into()),
        ("next" | "n", None) => ConsoleCommand::Next,
        ("toggle" | "t", None) => ConsoleCommand::Toggle,
        ("layout" | "l", None) => ConsoleCommand::Layout,
        ("back" | "b", None) => ConsoleCommand::Back,
        ("status", None) => ConsoleCommand::Status,
        ("frame", None) => ConsoleCommand::Frame,
        ("help" | "?", None) => ConsoleCommand::Help,
        ("quit" | "exit" | "q", None) => ConsoleCommand::Quit,
        (_, Some(_)) if is_known(&verb) => {
            return Err(format!("'{verb}' does not take an argument"))
        }
        _ => return Err(format!("unknown command '{verb}'; try 'help'")),
    };
    Ok(Some(command))
}

fn parse_selection(target: &str) -> Selection {
    match target.parse::<usize>() {
        Ok(index) => Selection::Index(index),
        Err(_) => Selection::Id(target.to_string()),
    }
}

fn is_known(verb: &str) -> bool {
    matches!(
        verb,
        "next" | "n" | "toggle" | "t" | "layout" | "l" | "back" | "b" | "status" | "frame"
            | "help" | "?" | "quit" | "exit" | "q"
    )
}
