/// Scripted transport for unit tests
use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use super::transport::{Connector, Transport};
use crate::protocol::block::{encode_block, encode_handshake};

#[derive(Debug, Clone)]
pub enum Reply {
    Bytes(Vec<u8>),
    Fail(io::ErrorKind),
}

#[derive(Debug, Default)]
pub struct Script {
    replies: HashMap<String, VecDeque<Reply>>,
    pub writes: Vec<String>,
    pub opens: usize,
    pub resets: usize,
    failing_opens: usize,
}

/// Hands out links that answer from a per-command reply queue.
///
/// A command with an empty queue gets no bytes back, like a device that
/// never answered before the timeout.
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    script: Arc<Mutex<Script>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap()
    }

    pub fn push_bytes(&self, code: &str, bytes: Vec<u8>) {
        self.script()
            .replies
            .entry(code.to_string())
            .or_default()
            .push_back(Reply::Bytes(bytes));
    }

    /// Queue a well-formed reply: the given data blocks then a handshake.
    pub fn push_blocks(&self, code: &str, blocks: &[(char, &str)]) {
        let mut bytes = Vec::new();
        for (type_code, value) in blocks {
            bytes.extend_from_slice(&encode_block(*type_code, value));
        }
        bytes.extend_from_slice(&encode_handshake());
        self.push_bytes(code, bytes);
    }

    pub fn push_failure(&self, code: &str, kind: io::ErrorKind) {
        self.script()
            .replies
            .entry(code.to_string())
            .or_default()
            .push_back(Reply::Fail(kind));
    }

    pub fn fail_next_opens(&self, count: usize) {
        self.script().failing_opens = count;
    }
}

impl Connector for MockConnector {
    type Link = MockLink;

    fn open(&self) -> io::Result<MockLink> {
        let mut script = self.script();
        script.opens += 1;
        if script.failing_opens > 0 {
            script.failing_opens -= 1;
            return Err(io::Error::new(io::ErrorKind::NotFound, "no such port"));
        }
        Ok(MockLink {
            script: Arc::clone(&self.script),
            pending: Vec::new(),
        })
    }

    fn port_name(&self) -> &str {
        "mock"
    }
}

pub struct MockLink {
    script: Arc<Mutex<Script>>,
    pending: Vec<u8>,
}

impl Transport for MockLink {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        let code = String::from_utf8_lossy(bytes).into_owned();
        let mut script = self.script.lock().unwrap();
        script.writes.push(code.clone());

        match script.replies.get_mut(&code).and_then(VecDeque::pop_front) {
            Some(Reply::Bytes(bytes)) => self.pending = bytes,
            Some(Reply::Fail(kind)) => return Err(io::Error::new(kind, "scripted failure")),
            None => self.pending.clear(),
        }
        Ok(())
    }

    fn read_up_to(&mut self, n: usize, _timeout: Duration) -> io::Result<Vec<u8>> {
        let take = n.min(self.pending.len());
        Ok(self.pending.drain(..take).collect())
    }

    fn reset_buffers(&mut self) -> io::Result<()> {
        self.script.lock().unwrap().resets += 1;
        self.pending.clear();
        Ok(())
    }
}
