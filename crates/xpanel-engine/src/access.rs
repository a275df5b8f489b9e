//! Online detection from the engine access log.
//!
//! A user counts as online when one of the last few hundred log lines
//! carries their `email:` token and was not rejected.

use std::collections::HashSet;
use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};

use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::debug;
use xpanel_core::DEFAULT_ACCESS_LOG;

use crate::error::EngineError;

/// Lines from the end of the log that are considered recent.
pub const DEFAULT_TAIL_LINES: usize = 300;

const CHUNK: u64 = 8 * 1024;
const EMAIL_MARKER: &str = "email: ";
const REJECTED: &str = "rejected";

/// Reader over the tail of the engine access log.
#[derive(Debug, Clone)]
pub struct AccessLog {
    path: PathBuf,
    tail_lines: usize,
}

impl AccessLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            tail_lines: DEFAULT_TAIL_LINES,
        }
    }

    pub fn with_tail_lines(mut self, tail_lines: usize) -> Self {
        self.tail_lines = tail_lines;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Users seen in the recent tail. A missing log means nobody is online.
    pub async fn online_users(&self) -> Result<HashSet<String>, EngineError> {
        let text = match read_tail(&self.path, self.tail_lines).await {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "access log missing");
                return Ok(HashSet::new());
            }
            Err(source) => {
                return Err(EngineError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        Ok(online_in(&text))
    }

    pub async fn is_online(&self, username: &str) -> Result<bool, EngineError> {
        Ok(self.online_users().await?.contains(username))
    }
}

impl Default for AccessLog {
    fn default() -> Self {
        Self::new(DEFAULT_ACCESS_LOG)
    }
}

/// Usernames carried by accepted lines of `text`.
pub fn online_in(text: &str) -> HashSet<String> {
    text.lines()
        .filter(|line| !line.contains(REJECTED))
        .filter_map(email_of)
        .map(str::to_string)
        .collect()
}

fn email_of(line: &str) -> Option<&str> {
    let (_, rest) = line.split_once(EMAIL_MARKER)?;
    let name = rest.split_whitespace().next()?;
    Some(name)
}

/// Last `lines` lines of the file at `path`, read backwards in chunks.
async fn read_tail(path: &Path, lines: usize) -> io::Result<String> {
    let mut file = tokio::fs::File::open(path).await?;
    let len = file.metadata().await?.len();

    let mut buf: Vec<u8> = Vec::new();
    let mut pos = len;
    // one extra newline: the final line is normally terminated
    while pos > 0 && count_newlines(&buf) <= lines {
        let step = CHUNK.min(pos);
        pos -= step;
        file.seek(SeekFrom::Start(pos)).await?;
        let mut chunk = vec![0u8; step as usize];
        file.read_exact(&mut chunk).await?;
        chunk.extend_from_slice(&buf);
        buf = chunk;
    }

    let text = String::from_utf8_lossy(&buf);
    let all: Vec<&str> = text.lines().collect();
    let start = all.len().saturating_sub(lines);
    Ok(all[start..].join("\n"))
}

fn count_newlines(buf: &[u8]) -> usize {
    buf.iter().filter(|&&b| b == b'\n').count()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACCEPTED_ALICE: &str =
        "2026/04/01 09:30:00 1.2.3.4:51000 accepted tcp:example.com:443 [vless-ws >> direct] email: alice";
    const REJECTED_BOB: &str =
        "2026/04/01 09:30:01 5.6.7.8:51001 rejected  proxy/vless/inbound: invalid request user id email: bob ";

    #[test]
    fn accepted_lines_mark_users_online() {
        let text = format!("{ACCEPTED_ALICE}\n{REJECTED_BOB}\nno user here\n");
        let online = online_in(&text);
        assert!(online.contains("alice"));
        assert!(!online.contains("bob"));
        assert_eq!(online.len(), 1);
    }

    #[test]
    fn username_must_match_whole_token() {
        let online = online_in("... accepted tcp:x:443 email: alice2 \n");
        assert!(online.contains("alice2"));
        assert!(!online.contains("alice"));
    }

    #[tokio::test]
    async fn only_the_tail_is_considered() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("access.log");
        let mut text = format!("{}\n", ACCEPTED_ALICE.replace("alice", "carol"));
        for i in 0..10 {
            text.push_str(&format!("2026/04/01 09:31:{i:02} noise line {i}\n"));
        }
        text.push_str(ACCEPTED_ALICE);
        text.push('\n');
        tokio::fs::write(&path, text).await.unwrap();

        let log = AccessLog::new(&path).with_tail_lines(5);
        assert!(log.is_online("alice").await.unwrap());
        assert!(!log.is_online("carol").await.unwrap());

        let log = AccessLog::new(&path);
        assert!(log.is_online("carol").await.unwrap());
    }

    #[tokio::test]
    async fn tail_spans_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("access.log");
        let filler = "x".repeat(200);
        let mut text = String::new();
        text.push_str(&ACCEPTED_ALICE.replace("alice", "dave"));
        text.push('\n');
        for _ in 0..100 {
            text.push_str(&filler);
            text.push('\n');
        }
        tokio::fs::write(&path, &text).await.unwrap();

        let online = AccessLog::new(&path).online_users().await.unwrap();
        assert!(online.contains("dave"));
        let online = AccessLog::new(&path)
            .with_tail_lines(100)
            .online_users()
            .await
            .unwrap();
        assert!(online.is_empty());
    }

    #[tokio::test]
    async fn missing_log_means_nobody_online() {
        let dir = tempfile::tempdir().unwrap();
        let log = AccessLog::new(dir.path().join("absent.log"));
        assert!(log.online_users().await.unwrap().is_empty());
    }
}
