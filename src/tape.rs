use tracing::trace;

use crate::error::{Error, Result};
use crate::opcode::MARKER;

/// The byte arena a program works on, plus its data pointer.
///
/// The data pointer always stays in `[0, len)`: moves wrap modulo the tape
/// length, and grow/shrink keep it in range. The tape is never empty.
///
/// In unified memory the tape also holds the program:
///
/// ```text
/// [ acc | program ... | data ... ]
///   0     1..=len       len+1..
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tape {
    cells: Vec<u8>,
    dp: usize,
}

impl Tape {
    /// A zero-filled tape of `len` cells (at least one) with the pointer at 0.
    pub fn new(len: usize) -> Result<Self> {
        let mut cells = Vec::new();
        cells
            .try_reserve_exact(len.max(1))
            .map_err(|_| Error::OutOfMemory { cells: len })?;
        cells.resize(len.max(1), 0);
        Ok(Self { cells, dp: 0 })
    }

    /// Lay out a unified-memory arena: the accumulator cell, the program, then
    /// `data_len` zero cells.
    ///
    /// The pointer starts just past the last `@` in the program, so bytes
    /// written after the marker act as initialised data. Without a marker it
    /// starts just past the program.
    pub fn unified(program: &[u8], data_len: usize) -> Result<Self> {
        let len = 1usize
            .checked_add(program.len())
            .and_then(|n| n.checked_add(data_len))
            .ok_or(Error::OutOfMemory { cells: usize::MAX })?;
        let mut cells = Vec::new();
        cells
            .try_reserve_exact(len)
            .map_err(|_| Error::OutOfMemory { cells: len })?;
        cells.push(0);
        cells.extend_from_slice(program);
        cells.resize(len, 0);

        let dp = match program.iter().rposition(|&b| b == MARKER) {
            Some(i) => 1 + i + 1,
            None => 1 + program.len(),
        };
        // Only reachable with an empty data region and a trailing marker.
        let dp = if dp == len { 0 } else { dp };

        Ok(Self { cells, dp })
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[inline(always)]
    pub fn dp(&self) -> usize {
        self.dp
    }

    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    /// Move the data pointer by `delta`, wrapping in both directions.
    pub fn move_by(&mut self, delta: isize) {
        let len = self.len();
        let step = delta.unsigned_abs() % len;
        self.dp = if delta >= 0 {
            (self.dp + step) % len
        } else {
            (self.dp + len - step) % len
        };
    }

    #[inline(always)]
    pub fn right(&mut self) {
        self.dp += 1;
        if self.dp == self.len() {
            self.dp = 0;
        }
    }

    #[inline(always)]
    pub fn left(&mut self) {
        if self.dp == 0 {
            self.dp = self.len();
        }
        self.dp -= 1;
    }

    /// The cell under the data pointer.
    #[inline(always)]
    pub fn get(&self) -> u8 {
        self.cells[self.dp]
    }

    #[inline(always)]
    pub fn set(&mut self, value: u8) {
        self.cells[self.dp] = value;
    }

    /// Apply `f` to the cell under the data pointer.
    #[inline(always)]
    pub fn update(&mut self, f: impl FnOnce(u8) -> u8) {
        let cell = &mut self.cells[self.dp];
        *cell = f(*cell);
    }

    #[inline(always)]
    pub fn get_at(&self, index: usize) -> u8 {
        self.cells[index]
    }

    #[inline(always)]
    pub fn set_at(&mut self, index: usize, value: u8) {
        self.cells[index] = value;
    }

    /// Insert a zero cell just before the data pointer.
    ///
    /// Every cell at or after `dp` moves one place right. The pointer keeps
    /// its index, so it now addresses the new zero cell.
    pub fn grow(&mut self) -> Result<()> {
        self.cells
            .try_reserve(1)
            .map_err(|_| Error::OutOfMemory {
                cells: self.cells.len() + 1,
            })?;
        self.cells.insert(self.dp, 0);
        trace!(dp = self.dp, len = self.len(), "tape grew");
        Ok(())
    }

    /// Remove the cell under the data pointer.
    ///
    /// Later cells move one place left. If the pointer was on the last cell
    /// it wraps to 0. A one-cell tape is left untouched.
    pub fn shrink(&mut self) {
        if self.len() == 1 {
            return;
        }
        self.cells.remove(self.dp);
        if self.dp == self.len() {
            self.dp = 0;
        }
        trace!(dp = self.dp, len = self.len(), "tape shrank");
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn n_rights_return_to_start(len in 1usize..512, start in 0usize..512) {
            let mut tape = Tape::new(len).unwrap();
            tape.move_by((start % len) as isize);
            let before = tape.dp();
            for _ in 0..len {
                tape.right();
            }
            prop_assert_eq!(tape.dp(), before);
            for _ in 0..len {
                tape.left();
            }
            prop_assert_eq!(tape.dp(), before);
        }

        #[test]
        fn dp_always_in_range(len in 1usize..64, moves in prop::collection::vec(-100isize..100, 0..64)) {
            let mut tape = Tape::new(len).unwrap();
            for delta in moves {
                tape.move_by(delta);
                prop_assert!(tape.dp() < tape.len());
            }
        }

        #[test]
        fn grow_then_shrink_is_identity(
            cells in prop::collection::vec(any::<u8>(), 1..128),
            at in any::<usize>(),
        ) {
            let mut tape = Tape::new(cells.len()).unwrap();
            for (i, &c) in cells.iter().enumerate() {
                tape.set_at(i, c);
            }
            tape.move_by((at % cells.len()) as isize);
            let before = tape.clone();
            tape.grow().unwrap();
            prop_assert_eq!(tape.len(), before.len() + 1);
            tape.shrink();
            prop_assert_eq!(tape, before);
        }
    }
}
