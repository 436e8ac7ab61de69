//! A minimal speaker of a list/hash broker protocol (the RESP wire format used
//! by Redis): `LPUSH`, `BRPOP`, `HSET`, `HGET`, `LLEN`, `SELECT`.
//!
//! Each operation opens its own connection, issues `SELECT` against the
//! configured logical database, sends the command, reads exactly one reply,
//! and closes. Connections are never pooled or kept alive across calls: the
//! client carries no mutable state, so it is trivially `Clone` and safe to
//! share across worker tasks without internal locking.

mod error;
mod resp;

pub use error::BrokerError;
use resp::RespValue;

use std::time::Duration;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Extra grace given to a blocking pop's socket read deadline beyond the
/// requested timeout, so a slow-but-still-arriving reply isn't mistaken for
/// a connection failure.
const BRPOP_GRACE: Duration = Duration::from_secs(1);

/// Connection parameters for the broker. Carries no connection state itself;
/// every call opens a fresh `TcpStream`.
#[derive(Debug, Clone)]
pub struct BrokerClient {
    host: String,
    port: u16,
    db: i64,
}

impl BrokerClient {
    pub fn new(host: impl Into<String>, port: u16, db: i64) -> Self {
        Self {
            host: host.into(),
            port,
            db,
        }
    }

    async fn connect(&self) -> Result<BufReader<TcpStream>, BrokerError> {
        let stream = TcpStream::connect((self.host.as_str(), self.port)).await?;
        let mut reader = BufReader::new(stream);
        self.select(&mut reader).await?;
        Ok(reader)
    }

    async fn select(&self, conn: &mut BufReader<TcpStream>) -> Result<(), BrokerError> {
        let db = self.db.to_string();
        send_command(conn, &["SELECT", &db]).await?;
        match resp::read_reply(conn).await? {
            RespValue::Simple(_) => Ok(()),
            RespValue::Error(msg) => Err(BrokerError::Server(msg)),
            other => Err(BrokerError::Protocol(format!(
                "unexpected SELECT reply: {other:?}"
            ))),
        }
    }

    /// `LPUSH key value` -> the list's new length.
    pub async fn lpush(&self, key: &str, value: &str) -> Result<i64, BrokerError> {
        let mut conn = self.connect().await?;
        send_command(&mut conn, &["LPUSH", key, value]).await?;
        match resp::read_reply(&mut conn).await? {
            RespValue::Integer(n) => Ok(n),
            RespValue::Error(msg) => Err(BrokerError::Server(msg)),
            other => Err(BrokerError::Protocol(format!(
                "unexpected LPUSH reply: {other:?}"
            ))),
        }
    }

    /// `BRPOP key timeout_secs` -> `Some((key, value))`, or `None` on timeout.
    pub async fn brpop(
        &self,
        key: &str,
        timeout_secs: u64,
    ) -> Result<Option<(String, String)>, BrokerError> {
        let mut conn = self.connect().await?;
        let timeout_arg = timeout_secs.to_string();
        send_command(&mut conn, &["BRPOP", key, &timeout_arg]).await?;

        let deadline = Duration::from_secs(timeout_secs) + BRPOP_GRACE;
        let reply = timeout(deadline, resp::read_reply(&mut conn))
            .await
            .map_err(|_| BrokerError::Protocol("BRPOP read deadline exceeded".into()))??;

        match reply {
            RespValue::Array(None) => Ok(None),
            RespValue::Array(Some(items)) if items.len() == 2 => {
                let popped_key = resp::expect_bulk(&items[0])?;
                let value = resp::expect_bulk(&items[1])?;
                Ok(Some((popped_key, value)))
            }
            RespValue::Error(msg) => Err(BrokerError::Server(msg)),
            other => Err(BrokerError::Protocol(format!(
                "unexpected BRPOP reply: {other:?}"
            ))),
        }
    }

    /// `HSET key field value [field value ...]` -> number of fields added.
    pub async fn hset(&self, key: &str, fields: &[(&str, &str)]) -> Result<i64, BrokerError> {
        let mut args = Vec::with_capacity(2 + fields.len() * 2);
        args.push("HSET");
        args.push(key);
        for (field, value) in fields {
            args.push(field);
            args.push(value);
        }

        let mut conn = self.connect().await?;
        send_command(&mut conn, &args).await?;
        match resp::read_reply(&mut conn).await? {
            RespValue::Integer(n) => Ok(n),
            RespValue::Error(msg) => Err(BrokerError::Server(msg)),
            other => Err(BrokerError::Protocol(format!(
                "unexpected HSET reply: {other:?}"
            ))),
        }
    }

    /// `HGET key field` -> the field's value, or `None` if unset.
    pub async fn hget(&self, key: &str, field: &str) -> Result<Option<String>, BrokerError> {
        let mut conn = self.connect().await?;
        send_command(&mut conn, &["HGET", key, field]).await?;
        match resp::read_reply(&mut conn).await? {
            RespValue::Bulk(value) => Ok(value),
            RespValue::Error(msg) => Err(BrokerError::Server(msg)),
            other => Err(BrokerError::Protocol(format!(
                "unexpected HGET reply: {other:?}"
            ))),
        }
    }

    /// `LLEN key` -> the list's length.
    pub async fn llen(&self, key: &str) -> Result<i64, BrokerError> {
        let mut conn = self.connect().await?;
        send_command(&mut conn, &["LLEN", key]).await?;
        match resp::read_reply(&mut conn).await? {
            RespValue::Integer(n) => Ok(n),
            RespValue::Error(msg) => Err(BrokerError::Server(msg)),
            other => Err(BrokerError::Protocol(format!(
                "unexpected LLEN reply: {other:?}"
            ))),
        }
    }
}

async fn send_command(
    conn: &mut BufReader<TcpStream>,
    args: &[&str],
) -> Result<(), BrokerError> {
    let encoded = resp::encode_command(args);
    conn.get_mut().write_all(&encoded).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_is_clone_and_carries_no_connection_state() {
        let a = BrokerClient::new("localhost", 6379, 0);
        let b = a.clone();
        assert_eq!(a.host, b.host);
        assert_eq!(a.port, b.port);
        assert_eq!(a.db, b.db);
    }
}
