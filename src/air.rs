use std::fmt::Write;

use crate::isa::Instr;
use crate::symbol::Span;

/// Assembly intermediate representation: every encoded instruction in program order.
#[derive(Debug, Default)]
pub struct Air {
    ast: Vec<AirStmt>,
}

/// Single encoded instruction along with where it came from.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct AirStmt {
    /// 1-based source line
    pub line: usize,
    /// Instruction text, excluding any label
    pub span: Span,
    pub instr: Instr,
}

impl AirStmt {
    /// Memory address of this statement given its index in the program.
    pub fn addr(idx: usize) -> u8 {
        (idx * 2) as u8
    }
}

impl Air {
    pub fn new() -> Self {
        Air { ast: Vec::new() }
    }

    pub fn add_stmt(&mut self, stmt: AirStmt) {
        self.ast.push(stmt)
    }

    pub fn len(&self) -> usize {
        self.ast.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ast.is_empty()
    }

    /// Program bytes, two per instruction, ready to be loaded at address 0.
    pub fn emit(&self) -> Vec<u8> {
        self.ast.iter().flat_map(|stmt| stmt.instr.encode()).collect()
    }

    /// Binary listing of the emitted program: one word per line in nibble groups,
    /// e.g. `0010 0001 0010 0011`.
    pub fn listing(&self) -> String {
        let mut out = String::new();
        for stmt in &self.ast {
            let _ = writeln!(out, "{}", nibbles(stmt.instr.word()));
        }
        out
    }

    /// Like [`Air::listing`], annotated with addresses, source lines and disassembly.
    pub fn annotated_listing(&self) -> String {
        let mut out = String::new();
        for (idx, stmt) in self.ast.iter().enumerate() {
            let _ = writeln!(
                out,
                "{:02X}  {}  ; line {:<4} {}",
                AirStmt::addr(idx),
                nibbles(stmt.instr.word()),
                stmt.line,
                stmt.instr
            );
        }
        out
    }
}

impl<'a> IntoIterator for &'a Air {
    type Item = &'a AirStmt;
    type IntoIter = std::slice::Iter<'a, AirStmt>;

    fn into_iter(self) -> Self::IntoIter {
        self.ast.iter()
    }
}

fn nibbles(word: u16) -> String {
    let bits = format!("{word:016b}");
    let groups: Vec<&str> = (0..4).map(|i| &bits[i * 4..i * 4 + 4]).collect();
    groups.join(" ")
}
