use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio_util::codec::{BytesCodec, FramedRead, FramedWrite};

// -- Wire constants --

/// Largest chunk read from a socket in one go.
pub const BUFFER_SIZE: usize = 1024;
/// Consecutive empty polls before the server gives up and shuts down.
pub const IDLE_POLL_LIMIT: u32 = 15;
/// Pending replies for one socket are joined with this before a single write.
pub const MESSAGE_SEPARATOR: &str = "\n";

// -- Replies --

pub const DISCONNECTING: &str = "Disconnecting...";
pub const SERVER_FULL: &str = "Server is full.";
pub const SHUTTING_DOWN: &str = "Took too long to respond. Shutting down.";
pub const PLAYER_DISCONNECTED: &str = "Player disconnected. Resetting Game.";
pub const GAME_NOT_STARTED: &str = "Game has not started.";
pub const INVALID_COMMAND: &str = "Invalid command, try again.";
pub const INVALID_NUMBER: &str = "That's an invalid number. Try again.";
pub const NOT_YOUR_TURN: &str = "It is not your turn.";
pub const NAME_TAKEN: &str = "That name is already taken.";
pub const YOUR_TURN: &str = "Your turn!";
pub const YOU_WON: &str = "You won!";
pub const YOU_LOST: &str = "You lost.";
pub const DRAW: &str = "The board is full. It's a draw.";

pub const HELP_TEXT: &str = "\
Commands:
  help        show this message
  board       show the board
  turn        show whose turn it is
  1-9         drop a piece into that column
  disconnect  leave the game";

/// Replies that tell a client its session is over.
pub const SENTINELS: [&str; 3] = [DISCONNECTING, SERVER_FULL, SHUTTING_DOWN];

pub fn welcome(name: &str, connected: usize, capacity: usize) -> String {
    format!("Welcome {}! {}/{} players connected.", name, connected, capacity)
}

pub fn already_joined(name: &str) -> String {
    format!("You have already joined as {}.", name)
}

pub fn player_joined(name: &str) -> String {
    format!("{} has joined the game.", name)
}

pub fn game_started(first_player: &str) -> String {
    format!("Game started! {}", turn_of(first_player))
}

pub fn turn_of(name: &str) -> String {
    format!("It is {}s turn.", name)
}

/// `row` and `column` are 0-indexed; the text uses the 1-indexed wire numbering.
pub fn piece_placed(row: usize, column: usize) -> String {
    format!("Piece placed in column {}, row {}.", column + 1, row + 1)
}

pub fn join_messages<S: AsRef<str>>(messages: &[S]) -> String {
    messages
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(MESSAGE_SEPARATOR)
}

pub fn is_sentinel(response: &str) -> bool {
    SENTINELS.iter().any(|s| response.contains(s))
}

/// Whether an interactive client should stop after sending `input` and
/// receiving `response`.
pub fn should_stop(input: &str, response: &str) -> bool {
    is_sentinel(response) || input.contains("disconnect")
}

// -- Raw chunk transport --
//
// There is no framing on the wire: every read yields whatever bytes are
// available and every write is one opaque chunk.

pub type ChunkReader = FramedRead<OwnedReadHalf, BytesCodec>;
pub type ChunkWriter = FramedWrite<OwnedWriteHalf, BytesCodec>;

pub fn split_transport(stream: TcpStream) -> (ChunkReader, ChunkWriter) {
    let (read, write) = stream.into_split();
    (
        FramedRead::with_capacity(read, BytesCodec::new(), BUFFER_SIZE),
        FramedWrite::new(write, BytesCodec::new()),
    )
}

pub fn decode_text(chunk: &[u8]) -> String {
    String::from_utf8_lossy(chunk).into_owned()
}

pub async fn send_text(writer: &mut ChunkWriter, text: &str) -> anyhow::Result<()> {
    writer
        .send(Bytes::copy_from_slice(text.as_bytes()))
        .await
        .map_err(|e| anyhow::anyhow!("send error: {}", e))
}

/// Next chunk of text from the peer, or `None` once it has closed.
pub async fn recv_text(reader: &mut ChunkReader) -> anyhow::Result<Option<String>> {
    match reader.next().await {
        Some(Ok(chunk)) => Ok(Some(decode_text(&chunk))),
        Some(Err(e)) => Err(anyhow::anyhow!("recv error: {}", e)),
        None => Ok(None),
    }
}
