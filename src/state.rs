use miette::{bail, Result};

use crate::input::Direction;
use crate::isa::Register;

/// Program memory size in bytes. Every address is taken modulo this value.
pub const MEMORY_SIZE: usize = 256;
pub const SCREEN_WIDTH: usize = 24;
pub const SCREEN_HEIGHT: usize = 24;

/// Condition flags, updated by a subset of instructions.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct Flags {
    /// Most recent relevant result was 0
    pub zero: bool,
    /// Most recent unmasked arithmetic result left 0..=255
    pub carry: bool,
}

/// 24x24 monochrome display. Cells are only ever toggled by the running program.
///
/// Coordinates wrap around the screen edges.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Framebuffer {
    /// Row-major
    cells: [bool; SCREEN_WIDTH * SCREEN_HEIGHT],
}

impl Default for Framebuffer {
    fn default() -> Self {
        Framebuffer {
            cells: [false; SCREEN_WIDTH * SCREEN_HEIGHT],
        }
    }
}

impl Framebuffer {
    pub fn get(&self, x: usize, y: usize) -> bool {
        self.cells[Self::index(x, y)]
    }

    pub fn toggle(&mut self, x: usize, y: usize) {
        self.cells[Self::index(x, y)] ^= true;
    }

    fn index(x: usize, y: usize) -> usize {
        (y % SCREEN_HEIGHT) * SCREEN_WIDTH + x % SCREEN_WIDTH
    }

    pub fn rows(&self) -> impl Iterator<Item = &[bool]> {
        self.cells.chunks_exact(SCREEN_WIDTH)
    }

    /// Amount of cells currently set.
    pub fn lit_count(&self) -> usize {
        self.cells.iter().filter(|cell| **cell).count()
    }
}

/// Represents complete machine state during runtime.
///
/// The execution engine in [`crate::runtime`] is the only writer of CPU and display state;
/// collaborators only read it, apart from the input register.
#[derive(Clone, Debug)]
pub struct Machine {
    /// Program memory, written only when loading
    pub(crate) mem: [u8; MEMORY_SIZE],
    /// 16x 8-bit registers
    pub(crate) reg: [u8; Register::COUNT],
    pub(crate) flags: Flags,
    /// Program counter
    pub(crate) pc: u8,
    pub(crate) halted: bool,
    pub(crate) screen: Framebuffer,
    /// Numeric output value
    pub(crate) segment: u8,
    /// Instructions executed since reset
    pub(crate) cycles: u64,
}

impl Default for Machine {
    fn default() -> Self {
        Machine {
            mem: [0; MEMORY_SIZE],
            reg: [0; Register::COUNT],
            flags: Flags::default(),
            pc: 0,
            halted: false,
            screen: Framebuffer::default(),
            segment: 0,
            cycles: 0,
        }
    }
}

impl Machine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_program(program: &[u8]) -> Result<Self> {
        let mut machine = Self::new();
        machine.load(program)?;
        Ok(machine)
    }

    /// Copy `program` to the start of memory. Bytes past its end are left untouched.
    pub fn load(&mut self, program: &[u8]) -> Result<()> {
        if program.len() > MEMORY_SIZE {
            bail!(
                "Program is {} bytes long and cannot fit in {} bytes of memory.",
                program.len(),
                MEMORY_SIZE
            );
        }
        self.mem[..program.len()].copy_from_slice(program);
        log::info!("Loaded {} byte program", program.len());
        Ok(())
    }

    /// Return to power-on state, clearing memory and the display.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Called by the input collaborator once per frame.
    pub fn set_input(&mut self, direction: Direction) {
        self.reg[Register::INPUT.index()] = direction as u8;
    }

    /// Memory read, wrapping around the end of memory.
    pub fn mem(&self, addr: usize) -> u8 {
        self.mem[addr % MEMORY_SIZE]
    }

    pub fn pc(&self) -> u8 {
        self.pc
    }

    pub fn set_pc(&mut self, pc: u8) {
        self.pc = pc;
    }

    /// # Panics
    /// If `idx` is not a valid register index.
    pub fn reg(&self, idx: usize) -> u8 {
        self.reg[idx]
    }

    pub fn set_reg(&mut self, idx: usize, val: u8) {
        self.reg[idx] = val;
    }

    pub fn registers(&self) -> &[u8; Register::COUNT] {
        &self.reg
    }

    pub fn flags(&self) -> Flags {
        self.flags
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn screen(&self) -> &Framebuffer {
        &self.screen
    }

    pub fn segment(&self) -> u8 {
        self.segment
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_keeps_tail() {
        let mut machine = Machine::with_program(&[1, 2, 3, 4]).unwrap();
        machine.load(&[9, 9]).unwrap();
        assert_eq!(machine.mem(0), 9);
        assert_eq!(machine.mem(1), 9);
        assert_eq!(machine.mem(2), 3);
        assert_eq!(machine.mem(3), 4);
    }

    #[test]
    fn load_full_memory() {
        assert!(Machine::with_program(&[0xAA; MEMORY_SIZE]).is_ok());
        assert!(Machine::with_program(&[0xAA; MEMORY_SIZE + 1]).is_err());
    }

    #[test]
    fn memory_wraps() {
        let mut program = [0; MEMORY_SIZE];
        program[0] = 0x42;
        program[255] = 0x24;
        let machine = Machine::with_program(&program).unwrap();
        assert_eq!(machine.mem(256), 0x42);
        assert_eq!(machine.mem(511), 0x24);
    }

    #[test]
    fn reset_clears_everything() {
        let mut machine = Machine::with_program(&[0x10, 0x00]).unwrap();
        machine.set_reg(3, 7);
        machine.set_pc(10);
        machine.screen.toggle(1, 1);
        machine.segment = 5;
        machine.halted = true;
        machine.reset();
        assert_eq!(machine.mem(0), 0);
        assert_eq!(machine.reg(3), 0);
        assert_eq!(machine.pc(), 0);
        assert_eq!(machine.screen().lit_count(), 0);
        assert_eq!(machine.segment(), 0);
        assert!(!machine.is_halted());
    }

    #[test]
    fn input_goes_to_last_register() {
        let mut machine = Machine::new();
        machine.set_input(Direction::Down);
        assert_eq!(machine.reg(15), 3);
        machine.set_input(Direction::None);
        assert_eq!(machine.reg(15), 0);
    }

    #[test]
    fn framebuffer_toggle_and_wrap() {
        let mut screen = Framebuffer::default();
        screen.toggle(2, 3);
        assert!(screen.get(2, 3));
        assert!(screen.get(26, 27));
        screen.toggle(26, 3);
        assert!(!screen.get(2, 3));
        screen.toggle(23, 23);
        let rows: Vec<_> = screen.rows().collect();
        assert_eq!(rows.len(), SCREEN_HEIGHT);
        assert!(rows[23][23]);
        assert_eq!(screen.lit_count(), 1);
    }
}
