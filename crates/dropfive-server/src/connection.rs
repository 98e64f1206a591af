use std::net::SocketAddr;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use dropfive_common::protocol::{self, ChunkReader, ChunkWriter};
use dropfive_common::session::ConnectionId;

/// Everything a socket reports back to the owning loop.
#[derive(Debug)]
pub enum Event {
    Data { id: ConnectionId, text: String },
    Closed { id: ConnectionId },
    Failed { id: ConnectionId, error: std::io::Error },
}

/// The owning loop's side of one client socket. The loop is the only
/// producer on `outbound` and the writer task the only consumer.
pub struct ConnectionHandle {
    pub id: ConnectionId,
    pub peer_addr: SocketAddr,
    outbound: mpsc::UnboundedSender<String>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl ConnectionHandle {
    pub fn spawn(
        id: ConnectionId,
        stream: TcpStream,
        peer_addr: SocketAddr,
        events: mpsc::Sender<Event>,
    ) -> Self {
        let (reader, writer) = protocol::split_transport(stream);
        let (outbound, queue) = mpsc::unbounded_channel::<String>();

        Self {
            id,
            peer_addr,
            outbound,
            reader: tokio::spawn(read_loop(id, reader, events)),
            writer: tokio::spawn(write_loop(id, writer, queue)),
        }
    }

    /// Queue `text` for delivery. Returns `false` if the writer has already gone away.
    pub fn enqueue(&self, text: impl Into<String>) -> bool {
        self.outbound.send(text.into()).is_ok()
    }

    pub fn is_alive(&self) -> bool {
        !self.writer.is_finished()
    }

    /// Stop reading and let the writer flush whatever is queued before the
    /// socket closes. The returned handle completes once the flush is done.
    pub fn close(self) -> JoinHandle<()> {
        self.reader.abort();
        drop(self.outbound);
        self.writer
    }
}

async fn read_loop(id: ConnectionId, mut reader: ChunkReader, events: mpsc::Sender<Event>) {
    loop {
        let (event, done) = match reader.next().await {
            Some(Ok(chunk)) => (
                Event::Data {
                    id,
                    text: protocol::decode_text(&chunk),
                },
                false,
            ),
            Some(Err(error)) => (Event::Failed { id, error }, true),
            None => (Event::Closed { id }, true),
        };
        if events.send(event).await.is_err() || done {
            break;
        }
    }
}

/// Waits for one queued message, then drains everything else already
/// pending so a burst of replies goes out as a single write.
async fn write_loop(
    id: ConnectionId,
    mut writer: ChunkWriter,
    mut queue: mpsc::UnboundedReceiver<String>,
) {
    while let Some(first) = queue.recv().await {
        let mut pending = vec![first];
        while let Ok(next) = queue.try_recv() {
            pending.push(next);
        }
        let frame = protocol::join_messages(&pending);
        tracing::debug!("Sending {} message(s) to {}", pending.len(), id);
        if let Err(e) = writer.send(Bytes::from(frame)).await {
            tracing::warn!("Write error on {}: {}", id, e);
            break;
        }
    }
}
