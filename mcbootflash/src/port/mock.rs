//! Scripted in-memory port for tests.

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::time::Duration;

use crate::error::Result;
use crate::port::Port;
use crate::protocol::{Command, CommandCode, Packet, decode, encode};

/// Port that replays queued device bytes and captures host writes.
///
/// Reading from an empty queue fails with `TimedOut`, like a serial port
/// whose device stopped answering.
pub(crate) struct MockPort {
    read_buf: VecDeque<u8>,
    write_buf: Vec<u8>,
    timeout: Duration,
    timeout_history: Vec<Duration>,
}

impl MockPort {
    pub(crate) fn new() -> Self {
        Self {
            read_buf: VecDeque::new(),
            write_buf: Vec::new(),
            timeout: Duration::from_secs(5),
            timeout_history: Vec::new(),
        }
    }

    /// Queue raw bytes for the host to read.
    pub(crate) fn queue(&mut self, bytes: &[u8]) {
        self.read_buf
            .extend(bytes);
    }

    /// Queue an encoded packet for the host to read.
    pub(crate) fn queue_packet<P: Packet>(&mut self, packet: &P) {
        self.queue(&encode(packet));
    }

    /// Everything the host has written.
    pub(crate) fn written(&self) -> &[u8] {
        &self.write_buf
    }

    /// Forget everything written so far.
    pub(crate) fn clear_written(&mut self) {
        self.write_buf
            .clear();
    }

    /// Every timeout set on the port, in order.
    pub(crate) fn timeout_history(&self) -> &[Duration] {
        &self.timeout_history
    }

    /// Bytes still queued for reading.
    pub(crate) fn unread(&self) -> usize {
        self.read_buf
            .len()
    }

    /// Split the written stream into commands and their payloads.
    ///
    /// Only WRITE_FLASH carries a payload, of `data_length` bytes.
    pub(crate) fn sent(&self) -> Vec<(Command, Vec<u8>)> {
        let mut out = Vec::new();
        let mut rest = self.written();
        while rest.len() >= Command::SIZE {
            let command: Command = decode(&rest[..Command::SIZE]).unwrap();
            rest = &rest[Command::SIZE..];
            let payload_len = if command.command == CommandCode::WriteFlash {
                usize::from(command.data_length)
            } else {
                0
            };
            let (payload, tail) = rest.split_at(payload_len.min(rest.len()));
            out.push((command, payload.to_vec()));
            rest = tail;
        }
        out
    }

    /// Command codes in the order they were sent.
    pub(crate) fn sent_codes(&self) -> Vec<CommandCode> {
        self.sent()
            .into_iter()
            .map(|(cmd, _)| cmd.command)
            .collect()
    }
}

impl Read for MockPort {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self
            .read_buf
            .is_empty()
        {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "no data"));
        }
        let n = buf
            .len()
            .min(self.read_buf.len());
        for b in buf.iter_mut().take(n) {
            *b = self
                .read_buf
                .pop_front()
                .unwrap();
        }
        Ok(n)
    }
}

impl Write for MockPort {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_buf
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Port for MockPort {
    fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.timeout = timeout;
        self.timeout_history
            .push(timeout);
        Ok(())
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn clear_buffers(&mut self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "mock"
    }
}
