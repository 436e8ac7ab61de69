// RESP (REdis Serialization Protocol) encoding and decoding.
//
// Requests are always encoded as an array of bulk strings, one per argument:
// `*N\r\n$len\r\n<bytes>\r\n...`. Replies are decoded by leading byte: simple
// string (+), error (-), integer (:), bulk string ($, -1 length = nil), array
// (*, -1 = nil). An unknown leading byte is a protocol failure.

use crate::error::BrokerError;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::net::TcpStream;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RespValue {
    Simple(String),
    Error(String),
    Integer(i64),
    Bulk(Option<String>),
    Array(Option<Vec<RespValue>>),
}

pub fn encode_command(args: &[&str]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(format!("*{}\r\n", args.len()).as_bytes());
    for arg in args {
        out.extend_from_slice(format!("${}\r\n", arg.len()).as_bytes());
        out.extend_from_slice(arg.as_bytes());
        out.extend_from_slice(b"\r\n");
    }
    out
}

pub async fn read_reply(conn: &mut BufReader<TcpStream>) -> Result<RespValue, BrokerError> {
    let line = read_line(conn).await?;
    if line.is_empty() {
        return Err(BrokerError::Protocol("empty reply line".into()));
    }
    let marker = &line[..1];
    let rest = &line[1..];

    match marker {
        "+" => Ok(RespValue::Simple(rest.to_string())),
        "-" => Ok(RespValue::Error(rest.to_string())),
        ":" => {
            let n = rest
                .parse::<i64>()
                .map_err(|_| BrokerError::Protocol(format!("bad integer reply: {rest}")))?;
            Ok(RespValue::Integer(n))
        }
        "$" => {
            let len = rest
                .parse::<i64>()
                .map_err(|_| BrokerError::Protocol(format!("bad bulk length: {rest}")))?;
            if len < 0 {
                return Ok(RespValue::Bulk(None));
            }
            let mut buf = vec![0u8; len as usize + 2]; // + trailing CRLF
            conn.read_exact(&mut buf).await?;
            buf.truncate(len as usize);
            let s = String::from_utf8(buf)
                .map_err(|e| BrokerError::Protocol(format!("non-utf8 bulk string: {e}")))?;
            Ok(RespValue::Bulk(Some(s)))
        }
        "*" => {
            let count = rest
                .parse::<i64>()
                .map_err(|_| BrokerError::Protocol(format!("bad array length: {rest}")))?;
            if count < 0 {
                return Ok(RespValue::Array(None));
            }
            let mut items = Vec::with_capacity(count as usize);
            for _ in 0..count {
                items.push(Box::pin(read_reply(conn)).await?);
            }
            Ok(RespValue::Array(Some(items)))
        }
        other => Err(BrokerError::Protocol(format!(
            "unknown reply marker: {other:?}"
        ))),
    }
}

async fn read_line(conn: &mut BufReader<TcpStream>) -> Result<String, BrokerError> {
    let mut line = String::new();
    let n = conn.read_line(&mut line).await?;
    if n == 0 {
        return Err(BrokerError::Protocol(
            "connection closed before a full reply was read".into(),
        ));
    }
    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }
    Ok(line)
}

/// Extract a string from a bulk reply nested inside an array, erroring on
/// anything else (used for `BRPOP`'s two-element array reply).
pub fn expect_bulk(value: &RespValue) -> Result<String, BrokerError> {
    match value {
        RespValue::Bulk(Some(s)) => Ok(s.clone()),
        other => Err(BrokerError::Protocol(format!(
            "expected bulk string, got {other:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_lpush_as_bulk_string_array() {
        let encoded = encode_command(&["LPUSH", "queue", "hello"]);
        assert_eq!(
            encoded,
            b"*3\r\n$5\r\nLPUSH\r\n$5\r\nqueue\r\n$5\r\nhello\r\n".to_vec()
        );
    }

    #[test]
    fn encodes_select_with_numeric_db() {
        let encoded = encode_command(&["SELECT", "0"]);
        assert_eq!(encoded, b"*2\r\n$6\r\nSELECT\r\n$1\r\n0\r\n".to_vec());
    }
}
