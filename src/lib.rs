// Assembling
mod lexer;
mod parser;
pub use parser::{assemble, AsmParser};
mod air;
pub use air::{Air, AirStmt};
mod symbol;
pub use symbol::{Span, SrcOffset, SymbolTable};
mod error;

// Running
mod isa;
pub use isa::{Instr, Opcode, Register, Shape};
mod state;
pub use state::{Flags, Framebuffer, Machine, MEMORY_SIZE, SCREEN_HEIGHT, SCREEN_WIDTH};
mod runtime;
mod clock;
pub use clock::{Clock, RunStats, MAX_STEPS_PER_TICK};

// Collaborators
mod input;
pub use input::{Direction, HeldKeys};
mod output;
pub use output::Output;
pub mod term;

pub mod env;

/// Amount of lines to show as context, each side of focus line (line containing span).
pub const DIAGNOSTIC_CONTEXT_LINES: usize = 8;
