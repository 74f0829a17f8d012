// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Line framing for the ASCII, LF-terminated control protocol.
//!
//! Bulk data (the bytes of a stored file) never goes through this module:
//! its length is declared out-of-band by a preceding `STORE`/`LOAD_FROM`
//! line and is read with plain `AsyncRead` calls against the same
//! connection.

use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::ProtocolError;

/// Reads a single LF-terminated line, stripping the trailing `\n` (and a
/// preceding `\r`, to tolerate CRLF-writing clients).
///
/// Returns `Ok(None)` on a clean EOF with no partial data, matching the
/// semantics of `AsyncBufReadExt::read_line`.
pub async fn read_line<R>(reader: &mut R) -> std::io::Result<Option<String>>
where
    R: AsyncBufReadExt + Unpin,
{
    let mut buf = String::new();
    let n = reader.read_line(&mut buf).await?;
    if n == 0 {
        return Ok(None);
    }
    while buf.ends_with('\n') || buf.ends_with('\r') {
        buf.pop();
    }
    Ok(Some(buf))
}

/// Writes `line` followed by a single `\n` and flushes.
pub async fn write_line<W>(writer: &mut W, line: &str) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}

/// Splits a line on single spaces. No token may itself contain whitespace,
/// so this is sufficient; no quoting/escaping is defined.
pub(crate) fn tokens(line: &str) -> Vec<&str> {
    line.split(' ').filter(|t| !t.is_empty()).collect()
}

pub(crate) fn require_arity<'a>(
    command: &str,
    toks: &'a [&'a str],
    expected: usize,
) -> Result<(), ProtocolError> {
    if toks.len() != expected {
        return Err(ProtocolError::WrongArity {
            command: command.to_string(),
            expected,
            got: toks.len(),
        });
    }
    Ok(())
}

pub(crate) fn parse_port(tok: &str) -> Result<u16, ProtocolError> {
    tok.parse::<u16>()
        .map_err(|_| ProtocolError::InvalidPort(tok.to_string()))
        .and_then(|p| {
            if p == 0 {
                Err(ProtocolError::InvalidPort(tok.to_string()))
            } else {
                Ok(p)
            }
        })
}

pub(crate) fn parse_size(tok: &str) -> Result<u64, ProtocolError> {
    tok.parse::<u64>()
        .map_err(|_| ProtocolError::InvalidSize(tok.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[tokio::test]
    async fn read_line_strips_lf_and_crlf() {
        let mut lf = Cursor::new(b"hello\n".to_vec());
        assert_eq!(read_line(&mut lf).await.unwrap(), Some("hello".to_string()));

        let mut crlf = Cursor::new(b"hello\r\n".to_vec());
        assert_eq!(read_line(&mut crlf).await.unwrap(), Some("hello".to_string()));
    }

    #[tokio::test]
    async fn read_line_on_clean_eof_is_none() {
        let mut empty = Cursor::new(Vec::new());
        assert_eq!(read_line(&mut empty).await.unwrap(), None);
    }

    #[tokio::test]
    async fn write_line_appends_a_single_newline() {
        let mut buf = Vec::new();
        write_line(&mut buf, "STORE_COMPLETE").await.unwrap();
        assert_eq!(buf, b"STORE_COMPLETE\n");
    }

    #[test]
    fn tokens_ignores_repeated_spaces() {
        assert_eq!(tokens("STORE  hello 5"), vec!["STORE", "hello", "5"]);
    }

    #[test]
    fn parse_port_rejects_zero_and_garbage() {
        assert!(parse_port("0").is_err());
        assert!(parse_port("abc").is_err());
        assert!(parse_port("8001").is_ok());
    }
}
