use uuid::Uuid;

use crate::board::{Board, Piece};
use crate::command::{self, Command, Request};
use crate::protocol;

pub type ConnectionId = Uuid;

pub const MAX_PLAYERS: usize = 2;

// -- Outcomes --

/// Who a notice is addressed to. `AllExcept` fans out to every live
/// connection other than the given one, named or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    Connection(ConnectionId),
    AllExcept(ConnectionId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub recipient: Recipient,
    pub text: String,
}

impl Notice {
    pub fn to(connection: ConnectionId, text: impl Into<String>) -> Self {
        Self {
            recipient: Recipient::Connection(connection),
            text: text.into(),
        }
    }

    pub fn all_except(connection: ConnectionId, text: impl Into<String>) -> Self {
        Self {
            recipient: Recipient::AllExcept(connection),
            text: text.into(),
        }
    }
}

/// Result of one inbound line: the reply for the sender plus anything that
/// must reach other connections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub reply: String,
    pub notices: Vec<Notice>,
}

impl Outcome {
    pub fn reply(text: impl Into<String>) -> Self {
        Self {
            reply: text.into(),
            notices: Vec::new(),
        }
    }

    fn with_notices(mut self, notices: impl IntoIterator<Item = Notice>) -> Self {
        self.notices.extend(notices);
        self
    }
}

// -- Player slots --

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerSlot {
    pub name: String,
    pub connection: Option<ConnectionId>,
}

impl PlayerSlot {
    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }

    fn clear(&mut self) {
        self.name.clear();
        self.connection = None;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    WaitingForPlayers,
    InProgress,
}

// -- Session state machine --

#[derive(Debug, Clone)]
pub struct Session {
    board: Board,
    slots: [PlayerSlot; MAX_PLAYERS],
    connected_count: usize,
    active_player: usize,
    game_started: bool,
}

impl Session {
    pub fn new() -> Self {
        Self {
            board: Board::new(),
            slots: Default::default(),
            connected_count: 0,
            active_player: 0,
            game_started: false,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn slot(&self, index: usize) -> &PlayerSlot {
        &self.slots[index]
    }

    pub fn connected_count(&self) -> usize {
        self.connected_count
    }

    pub fn active_player(&self) -> usize {
        self.active_player
    }

    pub fn is_active_player(&self, slot: usize) -> bool {
        self.active_player == slot
    }

    pub fn is_started(&self) -> bool {
        self.game_started
    }

    pub fn phase(&self) -> SessionPhase {
        if self.game_started {
            SessionPhase::InProgress
        } else {
            SessionPhase::WaitingForPlayers
        }
    }

    pub fn ready_to_start(&self) -> bool {
        self.connected_count == MAX_PLAYERS && !self.game_started
    }

    /// Begin a game with slot 0 to move. Both players are told who goes first.
    pub fn start_game(&mut self) -> Vec<Notice> {
        self.board.reset_board();
        self.active_player = 0;
        self.game_started = true;
        tracing::info!(
            "Game started: {} (x) vs {} (o)",
            self.slots[0].name,
            self.slots[1].name
        );

        let text = protocol::game_started(&self.slots[0].name);
        self.slots
            .iter()
            .filter_map(|slot| slot.connection)
            .map(|connection| Notice::to(connection, text.clone()))
            .collect()
    }

    pub fn handle_line(&mut self, origin: ConnectionId, line: &str) -> Outcome {
        match command::parse_line(line) {
            Request::Join { name } => self.join(origin, name),
            Request::Leave => match self.slot_of_connection(origin) {
                Some(slot) => self.leave(slot, origin),
                None => Outcome::reply(protocol::DISCONNECTING),
            },
            Request::Command { name, command } => self.dispatch(origin, name, command),
        }
    }

    /// The connection is gone. Frees its seat and aborts a running game.
    pub fn disconnect(&mut self, origin: ConnectionId) -> Vec<Notice> {
        match self.slot_of_connection(origin) {
            Some(slot) => self.leave(slot, origin).notices,
            None => Vec::new(),
        }
    }

    fn dispatch(&mut self, origin: ConnectionId, name: &str, command: Command<'_>) -> Outcome {
        let sender = self
            .slot_of_name(name)
            .filter(|&slot| self.slots[slot].connection == Some(origin));

        match (command, sender) {
            (Command::Help, _) => Outcome::reply(protocol::HELP_TEXT),
            (Command::Board, _) if self.game_started => Outcome::reply(self.board.render()),
            (Command::Board, _) => Outcome::reply(protocol::GAME_NOT_STARTED),
            (Command::Turn, _) => {
                Outcome::reply(protocol::turn_of(&self.slots[self.active_player].name))
            }
            (Command::Drop(column), Some(slot)) => self.play(slot, column),
            (Command::Disconnect, Some(slot)) => self.leave(slot, origin),
            (Command::Other(_), Some(_)) => Outcome::reply(protocol::INVALID_COMMAND),
            (_, None) => self.unmatched(origin, name),
        }
    }

    /// A command under a name no seat of this connection holds. An unknown
    /// name joins while a seat is free; a name seated elsewhere is refused.
    fn unmatched(&mut self, origin: ConnectionId, name: &str) -> Outcome {
        if self.slot_of_name(name).is_some() {
            Outcome::reply(protocol::INVALID_COMMAND)
        } else if self.connected_count < MAX_PLAYERS {
            self.join(origin, name)
        } else {
            Outcome::reply(protocol::SERVER_FULL)
        }
    }

    fn join(&mut self, origin: ConnectionId, name: &str) -> Outcome {
        if let Some(slot) = self.slot_of_connection(origin) {
            return Outcome::reply(protocol::already_joined(&self.slots[slot].name));
        }
        if self.connected_count >= MAX_PLAYERS {
            return Outcome::reply(protocol::SERVER_FULL);
        }
        if name.is_empty() {
            return Outcome::reply(protocol::INVALID_COMMAND);
        }
        if self.slot_of_name(name).is_some() {
            return Outcome::reply(protocol::NAME_TAKEN);
        }
        let Some(slot) = self.slots.iter().position(PlayerSlot::is_empty) else {
            return Outcome::reply(protocol::SERVER_FULL);
        };

        self.slots[slot] = PlayerSlot {
            name: name.to_string(),
            connection: Some(origin),
        };
        self.connected_count += 1;
        tracing::info!(
            "Player '{}' took slot {} ({}/{})",
            name,
            slot,
            self.connected_count,
            MAX_PLAYERS
        );

        let notices = self.slots[1 - slot]
            .connection
            .map(|other| Notice::to(other, protocol::player_joined(name)));
        Outcome::reply(protocol::welcome(name, self.connected_count, MAX_PLAYERS))
            .with_notices(notices)
    }

    fn leave(&mut self, slot: usize, origin: ConnectionId) -> Outcome {
        tracing::info!("Player '{}' left slot {}", self.slots[slot].name, slot);
        self.slots[slot].clear();
        self.connected_count -= 1;
        Outcome::reply(protocol::DISCONNECTING).with_notices(self.end_game_if_started(origin))
    }

    fn end_game_if_started(&mut self, origin: ConnectionId) -> Option<Notice> {
        if !self.game_started {
            return None;
        }
        tracing::info!("Game aborted, resetting board");
        self.board.reset_board();
        self.active_player = 0;
        self.game_started = false;
        Some(Notice::all_except(origin, protocol::PLAYER_DISCONNECTED))
    }

    fn play(&mut self, slot: usize, column: Option<usize>) -> Outcome {
        if !self.game_started {
            return Outcome::reply(protocol::GAME_NOT_STARTED);
        }
        if !self.is_active_player(slot) {
            return Outcome::reply(protocol::NOT_YOUR_TURN);
        }
        let Some(column) = column else {
            return Outcome::reply(protocol::INVALID_NUMBER);
        };

        let placement = match self.board.insert_piece(Piece::for_slot(slot), column) {
            Ok(placement) => placement,
            Err(e) => return Outcome::reply(e.to_string()),
        };
        let other = self.slots[1 - slot].connection;

        if placement.won {
            tracing::info!("Player '{}' won", self.slots[slot].name);
            self.new_round();
            return Outcome::reply(protocol::YOU_WON)
                .with_notices(other.map(|other| Notice::to(other, protocol::YOU_LOST)));
        }

        if self.board.is_board_full() {
            tracing::info!("Board full, round drawn");
            self.new_round();
            return Outcome::reply(protocol::DRAW)
                .with_notices(other.map(|other| Notice::to(other, protocol::DRAW)));
        }

        self.active_player = 1 - slot;
        let update = protocol::join_messages(&[self.board.render().as_str(), protocol::YOUR_TURN]);
        Outcome::reply(protocol::piece_placed(placement.row, placement.column))
            .with_notices(other.map(|other| Notice::to(other, update)))
    }

    /// Seats stay taken after a finished round. The session waits for the
    /// next start with slot 0 to move.
    fn new_round(&mut self) {
        self.board.reset_board();
        self.active_player = 0;
        self.game_started = false;
    }

    fn slot_of_name(&self, name: &str) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| !slot.is_empty() && slot.name == name)
    }

    fn slot_of_connection(&self, connection: ConnectionId) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.connection == Some(connection))
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
