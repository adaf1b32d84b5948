use std::collections::HashMap;
use std::time::{Duration, Instant};

use mio::Token;

use crate::http::connection::Connection;

/// A registered transport and its protocol state.
#[derive(Debug)]
pub struct Entry<S> {
    pub stream: S,
    pub conn: Connection,
}

/// Live connections keyed by their poll token.
///
/// Never holds more than `max_connections` entries. Tokens are handed out
/// from a counter and never reused, so a stale readiness event can not reach
/// a newer connection.
#[derive(Debug)]
pub struct Registry<S> {
    entries: HashMap<Token, Entry<S>>,
    max_connections: usize,
    next_token: usize,
}

impl<S> Registry<S> {
    /// `first_token` is the lowest token value given to a connection; values
    /// below it are left for the listener and waker.
    pub fn new(max_connections: usize, first_token: usize) -> Self {
        Self {
            entries: HashMap::new(),
            max_connections,
            next_token: first_token,
        }
    }

    /// Inserts a connection, or hands the stream back when at capacity.
    pub fn admit(&mut self, stream: S, conn: Connection) -> Result<Token, S> {
        if self.is_full() {
            return Err(stream);
        }

        let token = Token(self.next_token);
        self.next_token += 1;
        self.entries.insert(token, Entry { stream, conn });
        Ok(token)
    }

    pub fn get_mut(&mut self, token: Token) -> Option<&mut Entry<S>> {
        self.entries.get_mut(&token)
    }

    pub fn remove(&mut self, token: Token) -> Option<Entry<S>> {
        self.entries.remove(&token)
    }

    pub fn contains(&self, token: Token) -> bool {
        self.entries.contains_key(&token)
    }

    /// Tokens of connections inactive for longer than `timeout`.
    pub fn idle(&self, now: Instant, timeout: Duration) -> Vec<Token> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.conn.is_idle(now, timeout))
            .map(|(token, _)| *token)
            .collect()
    }

    /// Removes and returns every entry.
    pub fn drain(&mut self) -> impl Iterator<Item = (Token, Entry<S>)> + '_ {
        self.entries.drain()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.max_connections
    }

    pub fn capacity(&self) -> usize {
        self.max_connections
    }
}
