// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::collections::{HashMap, VecDeque};

use crate::core::delegates::PortIo;
use crate::core::marshal::Token;
use crate::core::{FlowError, Result};

/// In-memory [`PortIo`]: FIFO queues for reads, a log of sent tokens.
#[derive(Debug, Default)]
pub struct TokenQueues {
    pending: HashMap<(String, usize), VecDeque<Token>>,
    sent: HashMap<(String, usize), Vec<Token>>,
}

impl TokenQueues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a token for a later `get`.
    pub fn push(&mut self, port: &str, channel: usize, token: impl Into<Token>) {
        self.pending
            .entry((port.to_string(), channel))
            .or_default()
            .push_back(token.into());
    }

    pub fn push_all<T: Into<Token>>(
        &mut self,
        port: &str,
        channel: usize,
        tokens: impl IntoIterator<Item = T>,
    ) {
        for token in tokens {
            self.push(port, channel, token);
        }
    }

    pub fn pending(&self, port: &str, channel: usize) -> usize {
        self.pending
            .get(&(port.to_string(), channel))
            .map_or(0, VecDeque::len)
    }

    pub fn sent(&self, port: &str, channel: usize) -> &[Token] {
        self.sent
            .get(&(port.to_string(), channel))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Tokens sent on every channel of `port`.
    pub fn sent_count(&self, port: &str) -> usize {
        self.sent
            .iter()
            .filter(|((name, _), _)| name == port)
            .map(|(_, tokens)| tokens.len())
            .sum()
    }

    pub fn clear_sent(&mut self) {
        self.sent.clear();
    }
}

impl PortIo for TokenQueues {
    fn has_tokens(&self, port: &str, channel: usize, count: usize) -> bool {
        self.pending(port, channel) >= count
    }

    fn get(&mut self, port: &str, channel: usize) -> Result<Token> {
        self.pending
            .get_mut(&(port.to_string(), channel))
            .and_then(VecDeque::pop_front)
            .ok_or_else(|| FlowError::InsufficientTokens {
                port: port.to_string(),
                channel,
                rate: 1,
            })
    }

    fn send(&mut self, port: &str, channel: usize, token: Token) -> Result<()> {
        self.sent
            .entry((port.to_string(), channel))
            .or_default()
            .push(token);
        Ok(())
    }
}
