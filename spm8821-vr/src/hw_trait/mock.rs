//! In-memory I2C device for tests.
//!
//! Models a single register-addressed device: a write of `[reg, value]`
//! stores `value`, and a `write_read` of `[reg]` returns the stored byte.
//! Every transaction is recorded so tests can assert on bus traffic, and
//! failures can be injected per transaction.

use std::{sync::Arc, time::Instant};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{HwError, I2cError, Result, i2c::I2c};

/// One recorded bus transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transaction {
    Write { addr: u8, data: Vec<u8> },
    Read { addr: u8, len: usize },
    WriteRead { addr: u8, write: Vec<u8>, len: usize },
}

#[derive(Debug)]
struct State {
    address: u8,
    registers: [u8; 256],
    log: Vec<Transaction>,
    times: Vec<Instant>,
    fail_next: Option<I2cError>,
    fail_all: Option<I2cError>,
}

/// Cloneable handle to a simulated device.
///
/// Clones share state, so a test keeps one clone for inspection after
/// handing another to the code under test.
#[derive(Debug, Clone)]
pub struct MockI2c {
    state: Arc<Mutex<State>>,
}

impl MockI2c {
    /// Create a device answering at `address` with all registers zeroed.
    pub fn new(address: u8) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                address,
                registers: [0; 256],
                log: Vec::new(),
                times: Vec::new(),
                fail_next: None,
                fail_all: None,
            })),
        }
    }

    /// Preload a register.
    pub fn set_register(&self, reg: u8, value: u8) {
        self.state.lock().registers[reg as usize] = value;
    }

    /// Inspect a register without generating bus traffic.
    pub fn register(&self, reg: u8) -> u8 {
        self.state.lock().registers[reg as usize]
    }

    /// Fail the next transaction only.
    pub fn fail_next(&self, error: I2cError) {
        self.state.lock().fail_next = Some(error);
    }

    /// Fail every transaction until cleared.
    pub fn fail_all(&self, error: Option<I2cError>) {
        self.state.lock().fail_all = error;
    }

    /// All transactions seen so far.
    pub fn transactions(&self) -> Vec<Transaction> {
        self.state.lock().log.clone()
    }

    /// When each transaction in [`transactions`](Self::transactions)
    /// started.
    pub fn transaction_times(&self) -> Vec<Instant> {
        self.state.lock().times.clone()
    }

    /// Number of transactions seen so far.
    pub fn transaction_count(&self) -> usize {
        self.state.lock().log.len()
    }

    fn record(state: &mut State, transaction: Transaction) {
        state.log.push(transaction);
        state.times.push(Instant::now());
    }

    fn check(state: &mut State, addr: u8) -> Result<()> {
        if let Some(err) = state.fail_next.take() {
            return Err(HwError::I2c(err));
        }
        if let Some(err) = state.fail_all.clone() {
            return Err(HwError::I2c(err));
        }
        if addr != state.address {
            return Err(HwError::I2c(I2cError::Nack(addr)));
        }
        Ok(())
    }
}

#[async_trait]
impl I2c for MockI2c {
    async fn write(&mut self, addr: u8, data: &[u8]) -> Result<()> {
        let mut state = self.state.lock();
        Self::record(&mut state, Transaction::Write {
            addr,
            data: data.to_vec(),
        });
        Self::check(&mut state, addr)?;

        if let [reg, values @ ..] = data {
            for (offset, value) in values.iter().enumerate() {
                let index = (*reg as usize + offset) % 256;
                state.registers[index] = *value;
            }
        }
        Ok(())
    }

    async fn read(&mut self, addr: u8, buffer: &mut [u8]) -> Result<()> {
        let mut state = self.state.lock();
        Self::record(&mut state, Transaction::Read {
            addr,
            len: buffer.len(),
        });
        Self::check(&mut state, addr)?;

        buffer.fill(0);
        Ok(())
    }

    async fn write_read(&mut self, addr: u8, write: &[u8], read: &mut [u8]) -> Result<()> {
        let mut state = self.state.lock();
        Self::record(&mut state, Transaction::WriteRead {
            addr,
            write: write.to_vec(),
            len: read.len(),
        });
        Self::check(&mut state, addr)?;

        let reg = write.first().copied().unwrap_or(0) as usize;
        for (offset, byte) in read.iter_mut().enumerate() {
            *byte = state.registers[(reg + offset) % 256];
        }
        Ok(())
    }
}
