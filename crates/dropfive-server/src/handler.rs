use std::collections::HashMap;

use dropfive_common::session::{ConnectionId, Notice, Recipient, Session};

use crate::connection::ConnectionHandle;

pub type Connections = HashMap<ConnectionId, ConnectionHandle>;

pub fn handle_data(id: ConnectionId, text: &str, session: &mut Session, connections: &Connections) {
    tracing::debug!("Received {:?} from {}", text, id);

    let outcome = session.handle_line(id, text);
    send_to_connection(id, &outcome.reply, connections);
    deliver(&outcome.notices, connections);

    if session.ready_to_start() {
        let notices = session.start_game();
        deliver(&notices, connections);
    }
}

/// Run after the connection has been removed from `connections`.
pub fn handle_disconnect(id: ConnectionId, session: &mut Session, connections: &Connections) {
    let notices = session.disconnect(id);
    deliver(&notices, connections);
}

fn deliver(notices: &[Notice], connections: &Connections) {
    for notice in notices {
        match notice.recipient {
            Recipient::Connection(id) => send_to_connection(id, &notice.text, connections),
            Recipient::AllExcept(id) => broadcast(&notice.text, connections, Some(id)),
        }
    }
}

fn send_to_connection(id: ConnectionId, text: &str, connections: &Connections) {
    if let Some(conn) = connections.get(&id) {
        if !conn.enqueue(text) {
            tracing::warn!("Dropped message for closed connection {}", id);
        }
    }
}

/// Queue `text` on every connection, optionally skipping one.
pub fn broadcast(text: &str, connections: &Connections, exclude: Option<ConnectionId>) {
    for (&id, conn) in connections {
        if Some(id) == exclude || !conn.is_alive() {
            continue;
        }
        if !conn.enqueue(text) {
            tracing::warn!("Dropped broadcast for closed connection {}", id);
        }
    }
}
