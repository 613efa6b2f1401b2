//! The register access seam between the sampling core and the device.
//!
//! The core never talks to hardware directly. It issues blocking word reads
//! and writes through [`RegisterTransport`]; retries and timeouts belong to
//! the implementation behind the trait. [`MemoryTransport`] is an in-memory
//! device used by tests and offline tooling.

use std::collections::{HashMap, VecDeque};
use std::fmt;

use snaptrace_common::{Addr, Word};

/// A failed register access. Always fatal to the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    /// Address of the failed access.
    pub addr: Addr,
    /// Description of the failure.
    pub message: String,
}

impl TransportError {
    /// Creates a new transport error for the given address.
    pub fn new(addr: Addr, message: impl Into<String>) -> Self {
        Self {
            addr,
            message: message.into(),
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "register access at {:#x} failed: {}",
            self.addr, self.message
        )
    }
}

impl std::error::Error for TransportError {}

/// Synchronous word access to addressed device registers.
///
/// Calls are blocking and strictly ordered: a write issued before a read is
/// observed by the device before that read.
pub trait RegisterTransport {
    /// Writes one word to a register.
    fn write(&mut self, addr: Addr, data: Word) -> Result<(), TransportError>;

    /// Reads one word from a register.
    fn read(&mut self, addr: Addr) -> Result<Word, TransportError>;
}

/// One access recorded by [`MemoryTransport`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    /// A read of the given address.
    Read(Addr),
    /// A write of a word to the given address.
    Write(Addr, Word),
}

/// An in-memory register device.
///
/// Every address owns a FIFO of words returned by successive reads; reading
/// an empty FIFO yields 0. All accesses are logged in order.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    queues: HashMap<Addr, VecDeque<Word>>,
    log: Vec<Access>,
    fail_at: Option<Addr>,
}

impl MemoryTransport {
    /// Creates an empty device.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends words to the read FIFO of `addr`.
    pub fn queue(&mut self, addr: Addr, words: impl IntoIterator<Item = Word>) {
        self.queues.entry(addr).or_default().extend(words);
    }

    /// Makes every later access to `addr` fail.
    pub fn fail_on(&mut self, addr: Addr) {
        self.fail_at = Some(addr);
    }

    /// Returns the ordered access log.
    pub fn accesses(&self) -> &[Access] {
        &self.log
    }

    /// Returns the words written to `addr`, in order.
    pub fn writes_to(&self, addr: Addr) -> Vec<Word> {
        self.log
            .iter()
            .filter_map(|a| match *a {
                Access::Write(w, data) if w == addr => Some(data),
                _ => None,
            })
            .collect()
    }

    /// Returns how many times `addr` was read.
    pub fn reads_of(&self, addr: Addr) -> usize {
        self.log
            .iter()
            .filter(|a| matches!(a, Access::Read(r) if *r == addr))
            .count()
    }

    /// Returns how many queued words at `addr` have not been read yet.
    pub fn pending(&self, addr: Addr) -> usize {
        self.queues.get(&addr).map_or(0, VecDeque::len)
    }

    /// Clears the access log, keeping queued words.
    pub fn clear_log(&mut self) {
        self.log.clear();
    }

    fn check(&self, addr: Addr) -> Result<(), TransportError> {
        if self.fail_at == Some(addr) {
            return Err(TransportError::new(addr, "injected failure"));
        }
        Ok(())
    }
}

impl RegisterTransport for MemoryTransport {
    fn write(&mut self, addr: Addr, data: Word) -> Result<(), TransportError> {
        self.check(addr)?;
        self.log.push(Access::Write(addr, data));
        Ok(())
    }

    fn read(&mut self, addr: Addr) -> Result<Word, TransportError> {
        self.check(addr)?;
        self.log.push(Access::Read(addr));
        Ok(self
            .queues
            .get_mut(&addr)
            .and_then(VecDeque::pop_front)
            .unwrap_or(0))
    }
}
