// A minimal in-process RESP server: just enough of LPUSH/HSET/HGET/BRPOP to
// exercise the HTTP surface without a real Redis-protocol broker running
// alongside the test, matching SPEC_FULL.md's note that flow tests should
// not require any external services.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

#[derive(Default)]
struct State {
    lists: HashMap<String, Vec<String>>,
    hashes: HashMap<String, HashMap<String, String>>,
}

pub struct FakeBroker {
    pub addr: SocketAddr,
    state: Arc<Mutex<State>>,
}

impl FakeBroker {
    pub async fn spawn() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(Mutex::new(State::default()));
        let accept_state = state.clone();
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                tokio::spawn(handle_conn(stream, accept_state.clone()));
            }
        });
        Self { addr, state }
    }

    pub fn hash_get(&self, key: &str, field: &str) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .hashes
            .get(key)
            .and_then(|m| m.get(field))
            .cloned()
    }

    pub fn list_len(&self, key: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .lists
            .get(key)
            .map(|l| l.len())
            .unwrap_or(0)
    }
}

async fn handle_conn(stream: TcpStream, state: Arc<Mutex<State>>) {
    let mut reader = BufReader::new(stream);

    // Every call opens a connection, issues SELECT, then one command.
    if read_command(&mut reader).await.is_none() {
        return;
    }
    if reader.get_mut().write_all(b"+OK\r\n").await.is_err() {
        return;
    }

    let Some(args) = read_command(&mut reader).await else {
        return;
    };
    let reply = process(&state, &args);
    let _ = reader.get_mut().write_all(&reply).await;
}

async fn read_command(reader: &mut BufReader<TcpStream>) -> Option<Vec<String>> {
    let mut line = String::new();
    if reader.read_line(&mut line).await.ok()? == 0 {
        return None;
    }
    let line = line.trim_end();
    let count: usize = line.strip_prefix('*')?.parse().ok()?;

    let mut args = Vec::with_capacity(count);
    for _ in 0..count {
        let mut len_line = String::new();
        reader.read_line(&mut len_line).await.ok()?;
        let len: usize = len_line.trim_end().strip_prefix('$')?.parse().ok()?;
        let mut buf = vec![0u8; len + 2];
        reader.read_exact(&mut buf).await.ok()?;
        buf.truncate(len);
        args.push(String::from_utf8(buf).ok()?);
    }
    Some(args)
}

fn process(state: &Arc<Mutex<State>>, args: &[String]) -> Vec<u8> {
    let mut s = state.lock().unwrap();
    match args[0].to_ascii_uppercase().as_str() {
        "LPUSH" => {
            let list = s.lists.entry(args[1].clone()).or_default();
            list.insert(0, args[2].clone());
            format!(":{}\r\n", list.len()).into_bytes()
        }
        "HSET" => {
            let map = s.hashes.entry(args[1].clone()).or_default();
            let mut added = 0;
            let mut i = 2;
            while i + 1 < args.len() {
                if map.insert(args[i].clone(), args[i + 1].clone()).is_none() {
                    added += 1;
                }
                i += 2;
            }
            format!(":{added}\r\n").into_bytes()
        }
        "HGET" => {
            let value = s.hashes.get(&args[1]).and_then(|m| m.get(&args[2]));
            match value {
                Some(v) => format!("${}\r\n{v}\r\n", v.len()).into_bytes(),
                None => b"$-1\r\n".to_vec(),
            }
        }
        "LLEN" => {
            let len = s.lists.get(&args[1]).map(|l| l.len()).unwrap_or(0);
            format!(":{len}\r\n").into_bytes()
        }
        "BRPOP" => {
            let list = s.lists.get_mut(&args[1]);
            match list.and_then(|l| l.pop()) {
                Some(v) => format!(
                    "*2\r\n${}\r\n{}\r\n${}\r\n{v}\r\n",
                    args[1].len(),
                    args[1],
                    v.len()
                )
                .into_bytes(),
                None => b"*-1\r\n".to_vec(),
            }
        }
        other => format!("-ERR unknown command {other}\r\n").into_bytes(),
    }
}
