//! In-memory doubles for host tests

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::string::String;
use std::vec::Vec;

use crate::traits::{Board, ByteLink, LinkError, MachineIo};

#[derive(Debug, Default)]
struct LinkState {
    rx: VecDeque<Result<u8, LinkError>>,
    tx: Vec<u8>,
    flushes: usize,
}

/// Loopback-free link: tests push what the peer "sends" and read back what
/// the controller wrote
#[derive(Debug, Clone, Default)]
pub struct MockLink(Rc<RefCell<LinkState>>);

impl MockLink {
    pub fn push_rx(&self, bytes: &[u8]) {
        self.0.borrow_mut().rx.extend(bytes.iter().map(|&b| Ok(b)));
    }

    pub fn push_error(&self, error: LinkError) {
        self.0.borrow_mut().rx.push_back(Err(error));
    }

    /// Everything written since the last call
    pub fn take_tx(&self) -> Vec<u8> {
        core::mem::take(&mut self.0.borrow_mut().tx)
    }

    /// Written bytes split into lines, terminators removed
    pub fn take_lines(&self) -> Vec<String> {
        let tx = self.take_tx();
        String::from_utf8_lossy(&tx)
            .split('\n')
            .filter(|line| !line.is_empty())
            .map(|line| line.trim_end_matches('\r').into())
            .collect()
    }

    pub fn rx_pending(&self) -> usize {
        self.0.borrow().rx.len()
    }

    pub fn flushes(&self) -> usize {
        self.0.borrow().flushes
    }
}

impl ByteLink for MockLink {
    fn try_read(&mut self) -> Result<Option<u8>, LinkError> {
        match self.0.borrow_mut().rx.pop_front() {
            Some(Ok(byte)) => Ok(Some(byte)),
            Some(Err(error)) => Err(error),
            None => Ok(None),
        }
    }

    fn write(&mut self, bytes: &[u8]) {
        self.0.borrow_mut().tx.extend_from_slice(bytes);
    }

    fn transmit_pending(&self) -> bool {
        false
    }

    fn flush_input(&mut self) {
        let mut state = self.0.borrow_mut();
        state.rx.clear();
        state.flushes += 1;
    }
}

#[derive(Debug, Default)]
struct MachineState {
    moving: bool,
    estop_driven: bool,
    estop_input: bool,
}

/// Machine signals controllable from the test
#[derive(Debug, Clone, Default)]
pub struct MockMachine(Rc<RefCell<MachineState>>);

impl MockMachine {
    pub fn set_moving(&self, moving: bool) {
        self.0.borrow_mut().moving = moving;
    }

    pub fn set_estop_input(&self, active: bool) {
        self.0.borrow_mut().estop_input = active;
    }

    pub fn estop_driven(&self) -> bool {
        self.0.borrow().estop_driven
    }
}

impl MachineIo for MockMachine {
    fn is_moving(&self) -> bool {
        self.0.borrow().moving
    }

    fn assert_estop(&mut self) {
        self.0.borrow_mut().estop_driven = true;
    }

    fn release_estop(&mut self) {
        self.0.borrow_mut().estop_driven = false;
    }

    fn estop_input_active(&self) -> bool {
        let state = self.0.borrow();
        state.estop_input || state.estop_driven
    }
}

/// Board made of mocks
pub struct MockBoard;

impl Board for MockBoard {
    type Robot = MockLink;
    type Cnc = MockLink;
    type DCell = MockLink;
    type Machine = MockMachine;
}
