use std::fmt;

/// The eight instructions of the target tape machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Instr {
    Left,
    Right,
    Dec,
    Inc,
    Output,
    Input,
    JumpIfZero,
    JumpIfNonzero,
}

impl Instr {
    pub fn from_char(c: char) -> Option<Self> {
        Some(match c {
            '<' => Instr::Left,
            '>' => Instr::Right,
            '-' => Instr::Dec,
            '+' => Instr::Inc,
            '.' => Instr::Output,
            ',' => Instr::Input,
            '[' => Instr::JumpIfZero,
            ']' => Instr::JumpIfNonzero,
            _ => return None,
        })
    }

    pub fn as_char(self) -> char {
        match self {
            Instr::Left => '<',
            Instr::Right => '>',
            Instr::Dec => '-',
            Instr::Inc => '+',
            Instr::Output => '.',
            Instr::Input => ',',
            Instr::JumpIfZero => '[',
            Instr::JumpIfNonzero => ']',
        }
    }

    /// Net pointer displacement contributed by a single instruction, used by
    /// the minimum-tape-size pointer-excursion simulation. Every instruction
    /// other than `<`/`>` contributes zero.
    pub fn pointer_delta(self) -> i64 {
        match self {
            Instr::Left => -1,
            Instr::Right => 1,
            _ => 0,
        }
    }
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// A fully expanded program: the flat raw-ISA instruction stream plus the
/// minimum tape size computed while expanding it.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Program {
    pub instructions: Vec<Instr>,
    pub min_tape_size: usize,
}

impl Program {
    pub fn to_source(&self) -> String {
        self.instructions.iter().map(Instr::as_char).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_op_char() {
        for c in "<>-+.,[]".chars() {
            let instr = Instr::from_char(c).unwrap();
            assert_eq!(instr.as_char(), c);
        }
    }

    #[test]
    fn unknown_char_is_none() {
        assert!(Instr::from_char('x').is_none());
    }
}
