use std::io::Write;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tokio::net::TcpStream;

use dropfive_common::protocol::{self, ChunkReader, ChunkWriter};

const NAME_PROMPT: &str = "Enter your name:\t";
const COMMAND_PROMPT: &str = "Enter command or number to drop piece:\t";
const SERVER_GONE: &str = "Server closed the connection.";

pub struct ServerConnection {
    reader: ChunkReader,
    writer: ChunkWriter,
}

impl ServerConnection {
    pub async fn connect(addr: &str) -> std::io::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        let (reader, writer) = protocol::split_transport(stream);
        Ok(Self { reader, writer })
    }

    /// Send one line and wait for one chunk back. `None` means the server hung up.
    pub async fn round_trip(&mut self, text: &str) -> anyhow::Result<Option<String>> {
        protocol::send_text(&mut self.writer, text).await?;
        protocol::recv_text(&mut self.reader).await
    }
}

pub async fn run<I, W>(conn: &mut ServerConnection, input: I, out: &mut W) -> anyhow::Result<()>
where
    I: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();

    write!(out, "{}", NAME_PROMPT)?;
    out.flush()?;
    let Some(name) = lines.next_line().await? else {
        return Ok(());
    };
    let name = name.trim().to_string();

    if send_name(conn, &name, out).await? {
        client_loop(conn, &mut lines, &name, out).await?;
    }
    Ok(())
}

/// Register `name` with the server. Returns whether to stay connected.
pub async fn send_name<W: Write>(
    conn: &mut ServerConnection,
    name: &str,
    out: &mut W,
) -> anyhow::Result<bool> {
    let Some(response) = conn.round_trip(name).await? else {
        writeln!(out, "{}", SERVER_GONE)?;
        return Ok(false);
    };
    writeln!(out, "{}", response)?;
    Ok(response != protocol::DISCONNECTING && response != protocol::SERVER_FULL)
}

pub async fn client_loop<I, W>(
    conn: &mut ServerConnection,
    lines: &mut Lines<I>,
    name: &str,
    out: &mut W,
) -> anyhow::Result<()>
where
    I: AsyncBufRead + Unpin,
    W: Write,
{
    loop {
        write!(out, "{}", COMMAND_PROMPT)?;
        out.flush()?;
        let Some(input) = lines.next_line().await? else {
            break;
        };
        let input = input.trim();

        let Some(response) = conn.round_trip(&format!("{},{}", name, input)).await? else {
            writeln!(out, "{}", SERVER_GONE)?;
            break;
        };
        writeln!(out, "{}", response)?;
        tracing::debug!("{:?} -> {:?}", input, response);

        if protocol::should_stop(input, &response) {
            break;
        }
    }
    Ok(())
}
