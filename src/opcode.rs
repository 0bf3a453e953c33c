use std::fmt;

/// A layer of the instruction set.
///
/// Tiers are cumulative: a program running with `Tier::Two` may use every
/// opcode from `Base`, `One` and `Two`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    /// The eight classic opcodes, always available.
    Base,
    /// Accumulator, bitwise and shift opcodes, plus terminate.
    One,
    /// Unified memory: indirect jump, tape grow/shrink, accumulator arithmetic.
    Two,
    /// Reserved symbols. Legal, but they do nothing.
    Three,
}

/// The set of enabled tiers for one run.
///
/// A plain bitset consulted by the opcode table. It never changes while a
/// program is running.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Tiers(u8);

impl Tiers {
    const ONE: u8 = 1 << 0;
    const TWO: u8 = 1 << 1;
    const THREE: u8 = 1 << 2;

    /// Only the base instruction set.
    pub const NONE: Self = Self(0);

    /// Enable `tier` and every tier below it.
    pub const fn up_to(tier: Tier) -> Self {
        Self(match tier {
            Tier::Base => 0,
            Tier::One => Self::ONE,
            Tier::Two => Self::ONE | Self::TWO,
            Tier::Three => Self::ONE | Self::TWO | Self::THREE,
        })
    }

    pub const fn enables(self, tier: Tier) -> bool {
        match tier {
            Tier::Base => true,
            Tier::One => self.0 & Self::ONE != 0,
            Tier::Two => self.0 & Self::TWO != 0,
            Tier::Three => self.0 & Self::THREE != 0,
        }
    }

    /// Program text, instruction pointer and data share one arena.
    pub const fn unified(self) -> bool {
        self.enables(Tier::Two)
    }

    /// The highest enabled tier.
    pub const fn highest(self) -> Tier {
        if self.enables(Tier::Three) {
            Tier::Three
        } else if self.enables(Tier::Two) {
            Tier::Two
        } else if self.enables(Tier::One) {
            Tier::One
        } else {
            Tier::Base
        }
    }

    /// Is `byte` a legal opcode under this tier set?
    #[inline(always)]
    pub fn allows(self, byte: u8) -> bool {
        self.decode(byte).is_some()
    }

    /// Decode `byte`, returning `None` if it is not an opcode or its tier is
    /// disabled.
    #[inline(always)]
    pub fn decode(self, byte: u8) -> Option<Opcode> {
        Opcode::decode(byte).filter(|op| self.enables(op.tier()))
    }
}

impl From<Tier> for Tiers {
    fn from(tier: Tier) -> Self {
        Self::up_to(tier)
    }
}

pub const RIGHT: u8 = b'>';
pub const LEFT: u8 = b'<';
pub const INC: u8 = b'+';
pub const DEC: u8 = b'-';
pub const OUTPUT: u8 = b'.';
pub const INPUT: u8 = b',';
pub const LBRACKET: u8 = b'[';
pub const RBRACKET: u8 = b']';

pub const TERMINATE: u8 = b'@';
pub const STORE: u8 = b'$';
pub const FETCH: u8 = b'!';
pub const SHR: u8 = b'}';
pub const SHL: u8 = b'{';
pub const NOT: u8 = b'~';
pub const XOR: u8 = b'^';
pub const AND: u8 = b'&';
pub const OR: u8 = b'|';

pub const JUMP: u8 = b'?';
pub const GROW: u8 = b')';
pub const SHRINK: u8 = b'(';
pub const MUL: u8 = b'*';
pub const DIV: u8 = b'/';
pub const ADD: u8 = b'=';
pub const SUB: u8 = b'_';
pub const MOD: u8 = b'%';

/// Marks the end of the code region in a unified-memory program.
pub const MARKER: u8 = TERMINATE;

const RESERVED: &[u8; 24] = b"0123456789ABCDEF#:;\"'`\\x";

/// One decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Right,
    Left,
    Inc,
    Dec,
    Output,
    Input,
    LoopStart,
    LoopEnd,

    Terminate,
    Store,
    Fetch,
    ShiftRight,
    ShiftLeft,
    Not,
    Xor,
    And,
    Or,

    Jump,
    Grow,
    Shrink,
    Mul,
    Div,
    Add,
    Sub,
    Mod,

    Reserved(u8),
}

impl Opcode {
    /// Map a byte to its opcode, ignoring tier gating.
    pub fn decode(byte: u8) -> Option<Self> {
        Some(match byte {
            RIGHT => Self::Right,
            LEFT => Self::Left,
            INC => Self::Inc,
            DEC => Self::Dec,
            OUTPUT => Self::Output,
            INPUT => Self::Input,
            LBRACKET => Self::LoopStart,
            RBRACKET => Self::LoopEnd,

            TERMINATE => Self::Terminate,
            STORE => Self::Store,
            FETCH => Self::Fetch,
            SHR => Self::ShiftRight,
            SHL => Self::ShiftLeft,
            NOT => Self::Not,
            XOR => Self::Xor,
            AND => Self::And,
            OR => Self::Or,

            JUMP => Self::Jump,
            GROW => Self::Grow,
            SHRINK => Self::Shrink,
            MUL => Self::Mul,
            DIV => Self::Div,
            ADD => Self::Add,
            SUB => Self::Sub,
            MOD => Self::Mod,

            b if RESERVED.contains(&b) => Self::Reserved(b),
            _ => return None,
        })
    }

    /// The tier that introduced this opcode.
    pub const fn tier(self) -> Tier {
        match self {
            Self::Right
            | Self::Left
            | Self::Inc
            | Self::Dec
            | Self::Output
            | Self::Input
            | Self::LoopStart
            | Self::LoopEnd => Tier::Base,
            Self::Terminate
            | Self::Store
            | Self::Fetch
            | Self::ShiftRight
            | Self::ShiftLeft
            | Self::Not
            | Self::Xor
            | Self::And
            | Self::Or => Tier::One,
            Self::Jump
            | Self::Grow
            | Self::Shrink
            | Self::Mul
            | Self::Div
            | Self::Add
            | Self::Sub
            | Self::Mod => Tier::Two,
            Self::Reserved(_) => Tier::Three,
        }
    }

    /// The source byte for this opcode.
    pub const fn symbol(self) -> u8 {
        match self {
            Self::Right => RIGHT,
            Self::Left => LEFT,
            Self::Inc => INC,
            Self::Dec => DEC,
            Self::Output => OUTPUT,
            Self::Input => INPUT,
            Self::LoopStart => LBRACKET,
            Self::LoopEnd => RBRACKET,
            Self::Terminate => TERMINATE,
            Self::Store => STORE,
            Self::Fetch => FETCH,
            Self::ShiftRight => SHR,
            Self::ShiftLeft => SHL,
            Self::Not => NOT,
            Self::Xor => XOR,
            Self::And => AND,
            Self::Or => OR,
            Self::Jump => JUMP,
            Self::Grow => GROW,
            Self::Shrink => SHRINK,
            Self::Mul => MUL,
            Self::Div => DIV,
            Self::Add => ADD,
            Self::Sub => SUB,
            Self::Mod => MOD,
            Self::Reserved(b) => b,
        }
    }

    /// Short mnemonic used in disassembly listings.
    pub const fn describe(self) -> &'static str {
        match self {
            Self::Right => "RIGHT",
            Self::Left => "LEFT",
            Self::Inc => "INC",
            Self::Dec => "DEC",
            Self::Output => "OUT",
            Self::Input => "IN",
            Self::LoopStart => "JZ",
            Self::LoopEnd => "JNZ",
            Self::Terminate => "HALT",
            Self::Store => "STORE",
            Self::Fetch => "FETCH",
            Self::ShiftRight => "SHR",
            Self::ShiftLeft => "SHL",
            Self::Not => "NOT",
            Self::Xor => "XOR",
            Self::And => "AND",
            Self::Or => "OR",
            Self::Jump => "JMP",
            Self::Grow => "GROW",
            Self::Shrink => "SHRINK",
            Self::Mul => "MUL",
            Self::Div => "DIV",
            Self::Add => "ADD",
            Self::Sub => "SUB",
            Self::Mod => "MOD",
            Self::Reserved(_) => "NOP",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", char::from(self.symbol()))
    }
}

/// Pretty-print one opcode per line for human inspection.
///
/// Bytes that are not opcodes under `tiers` are shown as `.. 0xNN`.
pub fn disassemble(code: &[u8], tiers: Tiers) -> String {
    let mut out = String::new();
    for (ip, &byte) in code.iter().enumerate() {
        let line = match tiers.decode(byte) {
            Some(op) => format!("{ip:>6}  {op}  {}\n", op.describe()),
            None => format!("{ip:>6}  .. 0x{byte:02X}\n"),
        };
        out.push_str(&line);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn legal_count(tiers: Tiers) -> usize {
        (0..=u8::MAX).filter(|&b| tiers.allows(b)).count()
    }

    #[test]
    fn test_tier_sizes() {
        assert_eq!(legal_count(Tiers::NONE), 8);
        assert_eq!(legal_count(Tiers::up_to(Tier::One)), 8 + 9);
        assert_eq!(legal_count(Tiers::up_to(Tier::Two)), 8 + 9 + 8);
        assert_eq!(legal_count(Tiers::up_to(Tier::Three)), 8 + 9 + 8 + 24);
    }

    #[test]
    fn test_base_always_legal() {
        for &b in b"><+-.,[]" {
            assert!(Tiers::NONE.allows(b));
            assert_eq!(Opcode::decode(b).map(Opcode::tier), Some(Tier::Base));
        }
    }

    #[test]
    fn test_gated_opcodes_rejected_without_tier() {
        assert!(!Tiers::NONE.allows(b'@'));
        assert!(Tiers::up_to(Tier::One).allows(b'@'));
        assert!(!Tiers::up_to(Tier::One).allows(b')'));
        assert!(Tiers::up_to(Tier::Two).allows(b')'));
        assert!(!Tiers::up_to(Tier::Two).allows(b'7'));
        assert_eq!(
            Tiers::up_to(Tier::Three).decode(b'7'),
            Some(Opcode::Reserved(b'7'))
        );
    }

    #[test]
    fn test_non_opcodes_never_legal() {
        let all = Tiers::up_to(Tier::Three);
        for &b in b" \n\tazZ" {
            assert!(!all.allows(b));
        }
        assert!(!all.allows(0));
    }

    #[test]
    fn test_tiers_cumulative() {
        let two = Tiers::up_to(Tier::Two);
        assert!(two.enables(Tier::Base));
        assert!(two.enables(Tier::One));
        assert!(two.enables(Tier::Two));
        assert!(!two.enables(Tier::Three));
        assert!(two.unified());
        assert!(!Tiers::up_to(Tier::One).unified());
        assert_eq!(two.highest(), Tier::Two);
        assert_eq!(Tiers::NONE.highest(), Tier::Base);
    }

    #[test]
    fn test_symbol_round_trips_decode() {
        for b in 0..=u8::MAX {
            if let Some(op) = Opcode::decode(b) {
                assert_eq!(op.symbol(), b);
            }
        }
    }

    #[test]
    fn test_disassemble() {
        let listing = disassemble(b"+a@", Tiers::NONE);
        assert_eq!(listing, "     0  +  INC\n     1  .. 0x61\n     2  .. 0x40\n");
    }
}
