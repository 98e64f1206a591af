use crate::board::COLUMNS;

// -- Inbound line grammar --
//
// A line is either a bare name (join request) or `name,command`, split at
// the first comma. A bare `disconnect` is accepted before a name is chosen.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request<'a> {
    Join { name: &'a str },
    Leave,
    Command { name: &'a str, command: Command<'a> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    Help,
    Board,
    Turn,
    Disconnect,
    /// A digit string. Holds the 0-indexed column, or `None` when the number
    /// is outside `1..=COLUMNS`.
    Drop(Option<usize>),
    Other(&'a str),
}

impl<'a> Command<'a> {
    pub fn parse(raw: &'a str) -> Self {
        match raw {
            "help" => Command::Help,
            "board" => Command::Board,
            "turn" => Command::Turn,
            "disconnect" => Command::Disconnect,
            digits if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) => {
                Command::Drop(parse_column(digits))
            }
            other => Command::Other(other),
        }
    }
}

pub fn parse_line(line: &str) -> Request<'_> {
    let line = line.trim();
    match line.split_once(',') {
        Some((name, command)) => Request::Command {
            name: name.trim(),
            command: Command::parse(command.trim()),
        },
        None if line == "disconnect" => Request::Leave,
        None => Request::Join { name: line },
    }
}

fn parse_column(digits: &str) -> Option<usize> {
    match digits.parse::<usize>() {
        Ok(n) if (1..=COLUMNS).contains(&n) => Some(n - 1),
        _ => None,
    }
}
