use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use uuid::Uuid;

use dropfive_common::protocol::{self, IDLE_POLL_LIMIT};
use dropfive_common::session::{ConnectionId, Session};

use crate::connection::{ConnectionHandle, Event};
use crate::handler::{self, Connections};

#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// How long one poll waits for activity before it counts as idle.
    pub poll_interval: Duration,
    /// Consecutive idle polls that trigger a shutdown.
    pub idle_limit: u32,
    /// How long shutdown waits for writers to flush before abandoning them.
    pub flush_timeout: Duration,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            idle_limit: IDLE_POLL_LIMIT,
            flush_timeout: Duration::from_secs(5),
        }
    }
}

enum Ready {
    Accepted(TcpStream, SocketAddr),
    Event(Event),
}

/// Single owner of the game session and every client connection. Sockets
/// are serviced by their own reader/writer tasks; all state changes happen
/// here, one event at a time.
pub struct Server {
    listener: TcpListener,
    options: ServerOptions,
    session: Session,
    connections: Connections,
    events_tx: mpsc::Sender<Event>,
    events_rx: mpsc::Receiver<Event>,
    idle_polls: u32,
}

impl Server {
    pub async fn bind(addr: &str, options: ServerOptions) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let (events_tx, events_rx) = mpsc::channel(64);
        Ok(Self {
            listener,
            options,
            session: Session::new(),
            connections: Connections::new(),
            events_tx,
            events_rx,
            idle_polls: 0,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Runs until the idle limit is reached. Every client is told the server
    /// is going away before this returns.
    pub async fn serve(mut self) -> anyhow::Result<()> {
        tracing::info!("Listening on {}", self.local_addr()?);

        loop {
            match tokio::time::timeout(self.options.poll_interval, self.next_ready()).await {
                Err(_) => {
                    self.idle_polls += 1;
                    tracing::debug!(
                        "Waiting for clients (idle {}/{})",
                        self.idle_polls,
                        self.options.idle_limit
                    );
                    if self.idle_polls >= self.options.idle_limit {
                        self.shut_down().await;
                        return Ok(());
                    }
                }
                Ok(ready) => {
                    self.idle_polls = 0;
                    match ready? {
                        Ready::Accepted(stream, peer_addr) => self.accept(stream, peer_addr),
                        Ready::Event(event) => self.handle_event(event),
                    }
                }
            }
        }
    }

    async fn next_ready(&mut self) -> std::io::Result<Ready> {
        tokio::select! {
            accepted = self.listener.accept() => {
                let (stream, peer_addr) = accepted?;
                Ok(Ready::Accepted(stream, peer_addr))
            }
            Some(event) = self.events_rx.recv() => Ok(Ready::Event(event)),
        }
    }

    fn accept(&mut self, stream: TcpStream, peer_addr: SocketAddr) {
        let id = Uuid::new_v4();
        tracing::info!("{} has connected as {}", peer_addr, id);
        let conn = ConnectionHandle::spawn(id, stream, peer_addr, self.events_tx.clone());
        self.connections.insert(id, conn);
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Data { id, text } => {
                handler::handle_data(id, &text, &mut self.session, &self.connections);
            }
            Event::Closed { id } => {
                tracing::info!("Connection {} closed by peer", id);
                self.tear_down(id);
            }
            Event::Failed { id, error } => {
                tracing::warn!("Exception condition on {}: {}", id, error);
                self.tear_down(id);
            }
        }
    }

    fn tear_down(&mut self, id: ConnectionId) {
        if let Some(conn) = self.connections.remove(&id) {
            tracing::info!("Closing {} ({})", conn.peer_addr, conn.id);
            // The writer finishes on its own once its queue is dropped.
            drop(conn.close());
        }
        handler::handle_disconnect(id, &mut self.session, &self.connections);
    }

    async fn shut_down(&mut self) {
        tracing::warn!(
            "No activity for {} polls, shutting down {} connection(s)",
            self.idle_polls,
            self.connections.len()
        );
        handler::broadcast(protocol::SHUTTING_DOWN, &self.connections, None);
        let mut writers: Vec<_> = self
            .connections
            .drain()
            .map(|(_, conn)| conn.close())
            .collect();
        let flushed = tokio::time::timeout(
            self.options.flush_timeout,
            futures::future::join_all(writers.iter_mut()),
        )
        .await;
        match flushed {
            Ok(results) => {
                for result in results {
                    if let Err(e) = result {
                        tracing::warn!("Writer task failed during shutdown: {}", e);
                    }
                }
            }
            Err(_) => {
                tracing::warn!(
                    "Writers still busy after {:?}, dropping their connections",
                    self.options.flush_timeout
                );
                for writer in &writers {
                    writer.abort();
                }
            }
        }
    }
}
