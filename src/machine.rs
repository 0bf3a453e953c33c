use std::io::{self, Read, Write};

use tracing::debug;

use crate::brackets::{find_close, find_open};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::loader::Program;
use crate::opcode::{Opcode, Tiers};
use crate::tape::Tape;

/// Why a run stopped without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Halt {
    /// The instruction pointer ran past the last instruction.
    EndOfProgram,
    /// A zero byte was fetched as an opcode (unified memory only).
    ZeroOpcode,
    /// The terminate opcode ran.
    Terminated,
}

/// The fetch-decode-execute state for one run.
///
/// Two addressing modes share this machine:
/// - separate memory: `ip` walks an immutable program buffer and the
///   accumulator is a register;
/// - unified memory (tier 2): `ip` walks the tape itself, which holds the
///   accumulator in cell 0 and the program from cell 1 on.
///
/// Both `ip` and `dp` are plain indices into their arena, so growing or
/// shrinking the tape only has to adjust indices, never re-derive pointers.
#[derive(Debug)]
pub struct Machine<'p> {
    /// Separate-memory program. `None` when the program lives in the tape.
    program: Option<&'p [u8]>,
    tape: Tape,
    tiers: Tiers,
    accumulator: u8,
    ip: usize,
    steps: u64,
}

impl<'p> Machine<'p> {
    /// Allocate a fresh, zeroed tape for `program`.
    pub fn new(program: &'p Program, config: &Config) -> Result<Self> {
        let tiers = config.tiers;
        let (program, tape, ip) = if tiers.unified() {
            let tape = Tape::unified(program.code(), config.tape_size.get())?;
            (None, tape, 1)
        } else {
            (Some(program.code()), Tape::new(config.tape_size.get())?, 0)
        };
        debug!(
            tier = ?tiers.highest(),
            unified = tiers.unified(),
            tape_len = tape.len(),
            dp = tape.dp(),
            "machine ready"
        );
        Ok(Self {
            program,
            tape,
            tiers,
            accumulator: 0,
            ip,
            steps: 0,
        })
    }

    /// The instruction stream `ip` indexes into.
    #[inline(always)]
    fn code(&self) -> &[u8] {
        match self.program {
            Some(code) => code,
            None => self.tape.cells(),
        }
    }

    pub fn tape(&self) -> &Tape {
        &self.tape
    }

    pub fn dp(&self) -> usize {
        self.tape.dp()
    }

    pub fn ip(&self) -> usize {
        self.ip
    }

    /// Index of the first program byte: cell 0 holds the accumulator in
    /// unified memory.
    #[inline(always)]
    fn code_start(&self) -> usize {
        if self.program.is_some() { 0 } else { 1 }
    }

    /// Instructions executed so far, no-ops included.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn accumulator(&self) -> u8 {
        if self.tiers.unified() {
            self.tape.get_at(0)
        } else {
            self.accumulator
        }
    }

    fn set_accumulator(&mut self, value: u8) {
        if self.tiers.unified() {
            self.tape.set_at(0, value);
        } else {
            self.accumulator = value;
        }
    }

    /// Run until the program halts or fails.
    pub fn run(&mut self, mut input: impl Read, mut output: impl Write) -> Result<Halt> {
        let halt = loop {
            if let Some(halt) = self.step(&mut input, &mut output)? {
                break halt;
            }
        };
        output.flush()?;
        debug!(
            ?halt,
            steps = self.steps,
            tape_len = self.tape.len(),
            "run finished"
        );
        Ok(halt)
    }

    /// Execute one instruction.
    ///
    /// Returns `Ok(Some(_))` once the machine has halted; stepping a halted
    /// machine reports the same halt again.
    pub fn step(
        &mut self,
        input: &mut impl Read,
        output: &mut impl Write,
    ) -> Result<Option<Halt>> {
        let ip = self.ip;
        let Some(&byte) = self.code().get(ip) else {
            return Ok(Some(Halt::EndOfProgram));
        };
        if byte == 0 {
            return Ok(Some(Halt::ZeroOpcode));
        }
        self.steps += 1;

        let mut next = ip + 1;
        let Some(op) = self.tiers.decode(byte) else {
            self.ip = next;
            return Ok(None);
        };

        match op {
            Opcode::Right => self.tape.right(),
            Opcode::Left => self.tape.left(),
            Opcode::Inc => self.tape.update(|c| c.wrapping_add(1)),
            Opcode::Dec => self.tape.update(|c| c.wrapping_sub(1)),
            Opcode::Output => output.write_all(&[self.tape.get()])?,
            Opcode::Input => {
                let mut buf = [0u8];
                let value = match input.read_exact(&mut buf) {
                    Ok(()) => buf[0],
                    Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => 0,
                    Err(e) => return Err(e.into()),
                };
                self.tape.set(value);
            }
            Opcode::LoopStart => {
                if self.tape.get() == 0 {
                    next = find_close(self.code(), ip) + 1;
                }
            }
            Opcode::LoopEnd => {
                if self.tape.get() != 0 {
                    // An unmatched "]" restarts the program, never the
                    // accumulator cell in front of it.
                    let start = self.code_start();
                    next = find_open(&self.code()[start..], ip - start)
                        .map_or(start, |open| start + open + 1);
                }
            }

            Opcode::Terminate => return Ok(Some(Halt::Terminated)),
            Opcode::Store => {
                let cell = self.tape.get();
                self.set_accumulator(cell);
            }
            Opcode::Fetch => {
                let acc = self.accumulator();
                self.tape.set(acc);
            }
            Opcode::ShiftRight => self.tape.update(|c| c >> 1),
            Opcode::ShiftLeft => self.tape.update(|c| c << 1),
            Opcode::Not => self.tape.update(|c| !c),
            Opcode::Xor | Opcode::And | Opcode::Or => {
                let acc = self.accumulator();
                self.tape.update(|c| match op {
                    Opcode::Xor => c ^ acc,
                    Opcode::And => c & acc,
                    _ => c | acc,
                });
            }

            Opcode::Jump => next = self.tape.dp() + 1,
            Opcode::Grow => {
                let dp = self.tape.dp();
                self.tape.grow()?;
                // The executing instruction moved right with everything else.
                if ip >= dp {
                    next += 1;
                }
            }
            Opcode::Shrink => {
                let dp = self.tape.dp();
                let before = self.tape.len();
                self.tape.shrink();
                if self.tape.len() < before {
                    if ip > dp {
                        next -= 1;
                    } else if ip == dp {
                        // The instruction deleted itself; run whatever slid
                        // into its place.
                        next = ip;
                    }
                }
            }
            Opcode::Mul | Opcode::Div | Opcode::Add | Opcode::Sub | Opcode::Mod => {
                let value = arithmetic(op, self.tape.get(), self.accumulator())
                    .ok_or(Error::DivisionByZero { ip })?;
                self.tape.set(value);
            }

            Opcode::Reserved(_) => {}
        }

        self.ip = next;
        Ok(None)
    }
}

/// Tier-2 arithmetic of `cell` by `acc`, widened then truncated to 8 bits.
///
/// Returns `None` for division or modulo by zero.
fn arithmetic(op: Opcode, cell: u8, acc: u8) -> Option<u8> {
    let (a, b) = (u16::from(cell), u16::from(acc));
    let wide = match op {
        Opcode::Mul => a * b,
        Opcode::Add => a + b,
        Opcode::Sub => (i16::from(cell) - i16::from(acc)) as u16,
        Opcode::Div => a.checked_div(b)?,
        Opcode::Mod => a.checked_rem(b)?,
        _ => unreachable!("{op:?} is not an arithmetic opcode"),
    };
    Some(wide as u8)
}

/// Run `program` once on a fresh tape.
pub fn run(
    program: &Program,
    config: &Config,
    input: impl Read,
    output: impl Write,
) -> Result<Halt> {
    Machine::new(program, config)?.run(input, output)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::opcode::Tier;
    use proptest::prelude::*;
    use std::num::NonZeroUsize;

    fn step_bounded(
        program: &Program,
        config: &Config,
        limit: usize,
    ) -> Result<(Tape, Vec<u8>)> {
        let mut machine = Machine::new(program, config)?;
        let mut input: &[u8] = b"input";
        let mut out = Vec::new();
        for _ in 0..limit {
            if machine.step(&mut input, &mut out)?.is_some() {
                break;
            }
        }
        Ok((machine.tape().clone(), out))
    }

    proptest! {
        #[test]
        fn arithmetic_matches_modular_law(a in any::<u8>(), b in any::<u8>()) {
            prop_assert_eq!(arithmetic(Opcode::Mul, a, b), Some(a.wrapping_mul(b)));
            prop_assert_eq!(arithmetic(Opcode::Add, a, b), Some(a.wrapping_add(b)));
            prop_assert_eq!(arithmetic(Opcode::Sub, a, b), Some(a.wrapping_sub(b)));
            prop_assert_eq!(arithmetic(Opcode::Div, a, b), a.checked_div(b));
            prop_assert_eq!(arithmetic(Opcode::Mod, a, b), a.checked_rem(b));
        }

        #[test]
        fn increments_wrap_every_256(start in any::<u8>()) {
            let src = [b"+".repeat(usize::from(start)), b"+".repeat(256)].concat();
            let program = Program::from_bytes(&src, Tiers::NONE).unwrap();
            let config = Config::new(NonZeroUsize::new(4).unwrap(), Tiers::NONE);
            let (tape, _) = step_bounded(&program, &config, usize::MAX).unwrap();
            prop_assert_eq!(tape.get(), start);
        }

        #[test]
        fn decrements_wrap_every_256(start in any::<u8>()) {
            let src = [b"+".repeat(usize::from(start)), b"-".repeat(256)].concat();
            let program = Program::from_bytes(&src, Tiers::NONE).unwrap();
            let config = Config::new(NonZeroUsize::new(4).unwrap(), Tiers::NONE);
            let (tape, _) = step_bounded(&program, &config, usize::MAX).unwrap();
            prop_assert_eq!(tape.get(), start);
        }

        #[test]
        fn random_base_programs_never_panic(
            src in prop::collection::vec(prop::sample::select(b"><+-.,[]".to_vec()), 0..128),
            size in 1usize..64,
        ) {
            let program = Program::from_bytes(&src, Tiers::NONE).unwrap();
            let config = Config::new(NonZeroUsize::new(size).unwrap(), Tiers::NONE);
            let (tape, _) = step_bounded(&program, &config, 4096).unwrap();
            prop_assert!(tape.dp() < tape.len());
            prop_assert_eq!(tape.len(), size);
        }

        #[test]
        fn random_unified_programs_never_panic(
            src in prop::collection::vec(any::<u8>(), 0..128),
            size in 1usize..64,
        ) {
            let tiers = Tiers::up_to(Tier::Three);
            let program = Program::from_bytes(&src, tiers).unwrap();
            let config = Config::new(NonZeroUsize::new(size).unwrap(), tiers);
            match step_bounded(&program, &config, 4096) {
                Ok((tape, _)) => {
                    prop_assert!(tape.dp() < tape.len());
                }
                Err(e) => {
                    prop_assert!(
                        matches!(e, Error::DivisionByZero { .. }),
                        "unexpected error {:?}",
                        e
                    );
                }
            }
        }
    }
}
