use alloc::vec::Vec;

/// An OPL2 register sink.
///
/// Players never read chip state back; everything they know about the chip
/// is cached on their side.
pub trait Opl {
    /// Write `value` to the register at `register`.
    fn write(&mut self, register: u8, value: u8);
}

impl<T: Opl + ?Sized> Opl for &mut T {
    fn write(&mut self, register: u8, value: u8) {
        (**self).write(register, value);
    }
}

/// An `Opl` that records every write in order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RegisterLog {
    writes: Vec<(u8, u8)>,
}

impl RegisterLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// All writes recorded so far, oldest first.
    pub fn writes(&self) -> &[(u8, u8)] {
        &self.writes
    }

    /// Take the recorded writes, leaving the log empty.
    pub fn take(&mut self) -> Vec<(u8, u8)> {
        core::mem::take(&mut self.writes)
    }

    pub fn clear(&mut self) {
        self.writes.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }
}

impl Opl for RegisterLog {
    fn write(&mut self, register: u8, value: u8) {
        self.writes.push((register, value));
    }
}
