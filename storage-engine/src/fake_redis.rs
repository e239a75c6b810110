//! Minimal in-process RESP2 server for exercising `RedisBackend` without a
//! real redis. Understands only the commands the backend issues.

use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

#[derive(Default)]
struct State {
    values: HashMap<Vec<u8>, Vec<u8>>,
    wrong_type: HashSet<Vec<u8>>,
    commands: Vec<Vec<Vec<u8>>>,
    connections: usize,
    ping_reply: Option<String>,
}

pub(crate) struct FakeRedis {
    pub url: String,
    state: Arc<Mutex<State>>,
}

impl FakeRedis {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("redis://{}", listener.local_addr().unwrap());
        let state = Arc::new(Mutex::new(State::default()));

        let shared = Arc::clone(&state);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                shared.lock().unwrap().connections += 1;
                tokio::spawn(serve(stream, Arc::clone(&shared)));
            }
        });

        Self { url, state }
    }

    /// Answer `PING` with this simple string instead of `PONG`.
    pub fn reply_to_ping(&self, reply: &str) {
        self.state.lock().unwrap().ping_reply = Some(format!("+{}\r\n", reply));
    }

    /// Answer `PING` with this error line.
    pub fn fail_pings(&self, error: &str) {
        self.state.lock().unwrap().ping_reply = Some(format!("-{}\r\n", error));
    }

    /// Make `key` behave like a key holding a non-string value.
    pub fn hold_wrong_type(&self, key: &str) {
        self.state
            .lock()
            .unwrap()
            .wrong_type
            .insert(key.as_bytes().to_vec());
    }

    pub fn value(&self, key: &str) -> Option<Vec<u8>> {
        self.state.lock().unwrap().values.get(key.as_bytes()).cloned()
    }

    pub fn connections(&self) -> usize {
        self.state.lock().unwrap().connections
    }

    /// Arguments (after the command name) of every received `name` command.
    pub fn commands(&self, name: &str) -> Vec<Vec<Vec<u8>>> {
        self.state
            .lock()
            .unwrap()
            .commands
            .iter()
            .filter(|args| args[0].eq_ignore_ascii_case(name.as_bytes()))
            .map(|args| args[1..].to_vec())
            .collect()
    }
}

async fn serve(stream: TcpStream, state: Arc<Mutex<State>>) -> io::Result<()> {
    let (read, mut write) = stream.into_split();
    let mut reader = BufReader::new(read);

    while let Some(args) = read_command(&mut reader).await? {
        let reply = respond(&state, args);
        write.write_all(&reply).await?;
    }
    Ok(())
}

async fn read_line<R>(reader: &mut R) -> io::Result<Option<String>>
where
    R: AsyncBufReadExt + Unpin,
{
    let mut line = String::new();
    if reader.read_line(&mut line).await? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end().to_string()))
}

fn parse_len(line: &str, marker: char) -> io::Result<usize> {
    line.strip_prefix(marker)
        .and_then(|n| n.parse().ok())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, line.to_string()))
}

async fn read_command<R>(reader: &mut R) -> io::Result<Option<Vec<Vec<u8>>>>
where
    R: AsyncBufReadExt + Unpin,
{
    let Some(header) = read_line(reader).await? else {
        return Ok(None);
    };
    let count = parse_len(&header, '*')?;

    let mut args = Vec::with_capacity(count);
    for _ in 0..count {
        let line = read_line(reader)
            .await?
            .ok_or_else(|| io::Error::from(io::ErrorKind::UnexpectedEof))?;
        let len = parse_len(&line, '$')?;
        let mut arg = vec![0; len + 2];
        reader.read_exact(&mut arg).await?;
        arg.truncate(len);
        args.push(arg);
    }
    Ok(Some(args))
}

fn bulk(value: &[u8]) -> Vec<u8> {
    let mut out = format!("${}\r\n", value.len()).into_bytes();
    out.extend_from_slice(value);
    out.extend_from_slice(b"\r\n");
    out
}

const WRONGTYPE: &[u8] = b"-WRONGTYPE Operation against a key holding the wrong kind of value\r\n";

fn respond(state: &Mutex<State>, args: Vec<Vec<u8>>) -> Vec<u8> {
    let mut state = state.lock().unwrap();
    let name = args
        .first()
        .map(|n| n.to_ascii_uppercase())
        .unwrap_or_default();
    state.commands.push(args.clone());

    match (name.as_slice(), args.as_slice()) {
        (b"PING", _) => state
            .ping_reply
            .clone()
            .unwrap_or_else(|| "+PONG\r\n".to_string())
            .into_bytes(),
        (b"GET", [_, key]) if state.wrong_type.contains(key) => WRONGTYPE.to_vec(),
        (b"GET", [_, key]) => match state.values.get(key) {
            Some(value) => bulk(value),
            None => b"$-1\r\n".to_vec(),
        },
        (b"SET", [_, key, value, ..]) => {
            state.values.insert(key.clone(), value.clone());
            b"+OK\r\n".to_vec()
        }
        (b"DEL", [_, key]) => {
            let removed = state.values.remove(key).is_some() || state.wrong_type.remove(key);
            format!(":{}\r\n", u8::from(removed)).into_bytes()
        }
        // Connection setup (CLIENT SETINFO and friends)
        (b"CLIENT", _) => b"+OK\r\n".to_vec(),
        _ => b"-ERR unknown command\r\n".to_vec(),
    }
}
