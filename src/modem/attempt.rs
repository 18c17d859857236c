// src/modem/attempt.rs

use arrayvec::ArrayVec;

use crate::common::timing;

/// One command line and the response substring that confirms it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandAttempt<'a> {
    /// Bytes written to the modem, terminator included.
    pub command: &'a [u8],
    /// Substring that must show up in the response stream.
    pub expected: &'a [u8],
}

/// How a single attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The expected substring appeared after `received` bytes.
    Matched { received: usize },
    /// The receive budget filled up without a match.
    BudgetExhausted { received: usize },
}

impl AttemptOutcome {
    pub fn is_match(&self) -> bool {
        matches!(self, AttemptOutcome::Matched { .. })
    }

    pub fn received(&self) -> usize {
        match *self {
            AttemptOutcome::Matched { received } | AttemptOutcome::BudgetExhausted { received } => {
                received
            }
        }
    }
}

/// Receive buffer owned by a single attempt.
///
/// A fresh window is created for every command, so bytes left over from a
/// previous exchange can never satisfy the next one.
#[derive(Debug)]
pub struct ResponseWindow {
    buffer: ArrayVec<u8, { timing::RX_CAPACITY }>,
    budget: usize,
}

impl ResponseWindow {
    /// `budget` is clamped to the buffer capacity.
    pub fn new(budget: usize) -> Self {
        Self {
            buffer: ArrayVec::new(),
            budget: budget.min(timing::RX_CAPACITY),
        }
    }

    /// Appends a byte. Returns `false` once the budget is used up.
    pub fn push(&mut self, byte: u8) -> bool {
        if self.is_full() {
            return false;
        }
        self.buffer.push(byte);
        true
    }

    pub fn is_full(&self) -> bool {
        self.buffer.len() >= self.budget
    }

    pub fn received(&self) -> usize {
        self.buffer.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Whether the stream so far ends with `expected`.
    ///
    /// Checked after every byte, this finds the first occurrence anywhere in
    /// the stream without rescanning the whole buffer.
    pub fn ends_with(&self, expected: &[u8]) -> bool {
        self.buffer.ends_with(expected)
    }
}
