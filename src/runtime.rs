use crate::isa::Instr;
use crate::state::{Machine, MEMORY_SIZE};

impl Machine {
    const OP_TABLE: [fn(&mut Machine, Instr); 16] = [
        Self::nop, // 0x0
        Self::hlt, // 0x1
        Self::add, // 0x2
        Self::sub, // 0x3
        Self::and, // 0x4
        Self::or,  // 0x5
        Self::xor, // 0x6
        Self::nor, // 0x7
        Self::jmp, // 0x8
        Self::rsh, // 0x9
        Self::lsh, // 0xA
        Self::ldi, // 0xB
        Self::adi, // 0xC
        Self::brz, // 0xD
        Self::plt, // 0xE
        Self::seg, // 0xF
    ];

    /// Execute a single instruction.
    ///
    /// Returns `false` without touching any state if the machine is halted.
    pub fn step(&mut self) -> bool {
        if self.halted {
            return false;
        }
        let pc = self.pc as usize;
        let instr = Instr::decode([self.mem(pc), self.mem(pc + 1)]);
        // PC incremented before instruction is performed
        self.pc = ((pc + 2) % MEMORY_SIZE) as u8;
        log::trace!("{pc:02X}: {instr}");
        Self::OP_TABLE[instr.opcode() as usize](self, instr);
        self.cycles += 1;
        true
    }

    /// Step until halted or `max_steps` instructions were executed.
    pub fn run(&mut self, max_steps: u64) -> u64 {
        let mut steps = 0;
        while steps < max_steps && self.step() {
            steps += 1;
        }
        steps
    }

    /// Mask an arithmetic result to 8 bits and update both flags from it.
    #[inline]
    fn set_result(&mut self, dest: usize, raw: i32) {
        let val = (raw & 0xFF) as u8;
        self.reg[dest] = val;
        self.flags.carry = !(0..=0xFF).contains(&raw);
        self.flags.zero = val == 0;
    }

    #[inline]
    fn set_logic(&mut self, dest: usize, val: u8) {
        self.reg[dest] = val;
        self.flags.carry = false;
        self.flags.zero = val == 0;
    }

    #[inline]
    fn operands(&self, instr: Instr) -> (i32, i32) {
        (self.reg[instr.a()] as i32, self.reg[instr.b()] as i32)
    }

    fn nop(&mut self, _instr: Instr) {}

    fn hlt(&mut self, _instr: Instr) {
        self.halted = true;
        log::info!("Halted after {} cycles", self.cycles + 1);
    }

    fn add(&mut self, instr: Instr) {
        let (a, b) = self.operands(instr);
        self.set_result(instr.c(), a + b);
    }

    fn sub(&mut self, instr: Instr) {
        let (a, b) = self.operands(instr);
        self.set_result(instr.c(), a - b);
    }

    fn and(&mut self, instr: Instr) {
        let val = self.reg[instr.a()] & self.reg[instr.b()];
        self.set_logic(instr.c(), val);
    }

    fn or(&mut self, instr: Instr) {
        let val = self.reg[instr.a()] | self.reg[instr.b()];
        self.set_logic(instr.c(), val);
    }

    fn xor(&mut self, instr: Instr) {
        let val = self.reg[instr.a()] ^ self.reg[instr.b()];
        self.set_logic(instr.c(), val);
    }

    fn nor(&mut self, instr: Instr) {
        let val = !(self.reg[instr.a()] | self.reg[instr.b()]);
        self.set_logic(instr.c(), val);
    }

    fn jmp(&mut self, instr: Instr) {
        self.pc = instr.byte();
    }

    // Carry is computed from the already masked value, so it is never set by shifts.
    fn rsh(&mut self, instr: Instr) {
        let val = self.reg[instr.a()] >> 1;
        self.set_result(instr.c(), val as i32);
    }

    fn lsh(&mut self, instr: Instr) {
        let val = self.reg[instr.a()] << 1;
        self.set_result(instr.c(), val as i32);
    }

    fn ldi(&mut self, instr: Instr) {
        self.reg[instr.a()] = instr.byte();
    }

    // Same as shifts: flags come from the masked sum, carry stays clear.
    fn adi(&mut self, instr: Instr) {
        let dest = instr.a();
        let val = self.reg[dest].wrapping_add(instr.byte());
        self.set_result(dest, val as i32);
    }

    fn brz(&mut self, instr: Instr) {
        if self.flags.zero {
            self.pc = instr.byte();
        }
    }

    fn plt(&mut self, instr: Instr) {
        let x = self.reg[instr.a()] as usize;
        let y = self.reg[instr.b()] as usize;
        self.screen.toggle(x, y);
    }

    fn seg(&mut self, instr: Instr) {
        self.segment = self.reg[instr.a()];
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::assemble;
    use crate::state::{Flags, Machine};

    fn machine(src: &str) -> Machine {
        Machine::with_program(&assemble(src).unwrap().emit()).unwrap()
    }

    fn run(src: &str) -> Machine {
        let mut machine = machine(src);
        machine.run(10_000);
        machine
    }

    #[test]
    fn add_sets_carry() {
        let m = run("LDI R0, 200\nLDI R1, 100\nADD R0, R1, R2\nHLT");
        assert_eq!(m.reg(2), 44);
        assert_eq!(m.flags(), Flags { zero: false, carry: true });
    }

    #[test]
    fn add_wraps_to_zero() {
        let m = run("LDI R0, 128\nADD R0, R0, R1\nHLT");
        assert_eq!(m.reg(1), 0);
        assert_eq!(m.flags(), Flags { zero: true, carry: true });
    }

    #[test]
    fn sub_sets_zero() {
        let m = run("LDI R0, 5\nLDI R1, 5\nSUB R0, R1, R2\nHLT");
        assert_eq!(m.reg(2), 0);
        assert_eq!(m.flags(), Flags { zero: true, carry: false });
    }

    #[test]
    fn sub_borrow() {
        let m = run("LDI R0, 3\nLDI R1, 5\nSUB R0, R1, R2\nHLT");
        assert_eq!(m.reg(2), 254);
        assert_eq!(m.flags(), Flags { zero: false, carry: true });
    }

    #[test]
    fn add_then_sub_restores() {
        for (a, b) in [(0u8, 0u8), (1, 255), (200, 100), (255, 255), (17, 3)] {
            let mut m = machine("ADD R0, R1, R0\nSUB R0, R1, R0\nHLT");
            m.set_reg(0, a);
            m.set_reg(1, b);
            m.run(3);
            assert_eq!(m.reg(0), a, "a={a} b={b}");
        }
    }

    #[test]
    fn logic_ops_clear_carry() {
        let m = run("LDI R0, 200\nLDI R1, 100\nADD R0, R1, R2\nLDI R3, 0x0F\nLDI R4, 0xF0\nAND R3, R4, R5\nHLT");
        assert_eq!(m.reg(5), 0);
        assert_eq!(m.flags(), Flags { zero: true, carry: false });

        let m = run("LDI R0, 0x0F\nLDI R1, 0xF0\nOR R0, R1, R2\nXOR R0, R0, R3\nNOR R0, R1, R4\nHLT");
        assert_eq!(m.reg(2), 0xFF);
        assert_eq!(m.reg(3), 0);
        assert_eq!(m.reg(4), 0);
        assert!(m.flags().zero);

        let m = run("NOR R0, R0, R1\nHLT");
        assert_eq!(m.reg(1), 0xFF);
        assert_eq!(m.flags(), Flags { zero: false, carry: false });
    }

    #[test]
    fn shifts_never_carry() {
        let m = run("LDI R0, 0x81\nLSH R0, R0, R1\nHLT");
        assert_eq!(m.reg(1), 0x02);
        assert_eq!(m.flags(), Flags { zero: false, carry: false });

        let m = run("LDI R0, 0x80\nLSH R0, R0, R1\nHLT");
        assert_eq!(m.reg(1), 0);
        assert_eq!(m.flags(), Flags { zero: true, carry: false });

        let m = run("LDI R0, 1\nRSH R0, R0, R1\nHLT");
        assert_eq!(m.reg(1), 0);
        assert_eq!(m.flags(), Flags { zero: true, carry: false });

        let m = run("LDI R0, 0xFE\nRSH R0, R5, R0\nHLT");
        assert_eq!(m.reg(0), 0x7F);
    }

    #[test]
    fn ldi_leaves_flags() {
        let m = run("SUB R0, R0, R0\nLDI R1, 9\nHLT");
        assert_eq!(m.reg(1), 9);
        assert!(m.flags().zero);
    }

    #[test]
    fn adi_flags_from_result() {
        let m = run("LDI R0, 250\nADI R0, 6\nHLT");
        assert_eq!(m.reg(0), 0);
        assert_eq!(m.flags(), Flags { zero: true, carry: false });

        let m = run("LDI R0, 250\nADI R0, 10\nHLT");
        assert_eq!(m.reg(0), 4);
        assert_eq!(m.flags(), Flags { zero: false, carry: false });
    }

    #[test]
    fn countdown_loop() {
        let m = run("
                LDI R0, 5
                LDI R1, 1
            loop:
                SUB R0, R1, R0
                BRZ done
                JMP loop
            done:
                SEG R0
                HLT
        ");
        assert_eq!(m.reg(0), 0);
        assert_eq!(m.segment(), 0);
        assert!(m.is_halted());
        // 2 loads, 5 subs, 5 branches, 4 jumps, seg, hlt
        assert_eq!(m.cycles(), 18);
    }

    #[test]
    fn brz_not_taken() {
        let m = run("LDI R0, 1\nADD R0, R0, R0\nBRZ 0x20\nSEG R0\nHLT");
        assert_eq!(m.segment(), 2);
        assert!(m.is_halted());
    }

    #[test]
    fn jump_is_absolute() {
        let mut m = machine("NOP\nNOP\nJMP 0x02");
        m.run(3);
        assert_eq!(m.pc(), 2);
    }

    #[test]
    fn plot_toggles_twice() {
        let mut m = machine("LDI R0, 25\nLDI R1, 50\nPLT R0, R1\nPLT R0, R1\nHLT");
        m.run(3);
        // 25 mod 24, 50 mod 24
        assert!(m.screen().get(1, 2));
        assert_eq!(m.screen().lit_count(), 1);
        m.run(10);
        assert!(!m.screen().get(1, 2));
        assert_eq!(m.screen().lit_count(), 0);
    }

    #[test]
    fn segment_overwrites() {
        let m = run("LDI R3, 42\nSEG R3\nLDI R3, 7\nSEG R3\nHLT");
        assert_eq!(m.segment(), 7);
    }

    #[test]
    fn input_register_readable() {
        let mut m = machine("SEG R15\nHLT");
        m.set_input(crate::input::Direction::Left);
        m.run(10);
        assert_eq!(m.segment(), 2);
    }

    #[test]
    fn halted_step_is_noop() {
        let mut m = machine("HLT\nLDI R0, 1");
        assert!(m.step());
        assert!(m.is_halted());
        let pc = m.pc();
        assert!(!m.step());
        assert_eq!(m.pc(), pc);
        assert_eq!(m.reg(0), 0);
        assert_eq!(m.cycles(), 1);
        assert_eq!(m.run(100), 0);
    }

    #[test]
    fn fetch_wraps_around_memory() {
        let mut program = [0u8; 256];
        // LDI R2, 0x33 split across the end of memory
        program[255] = 0xB2;
        program[0] = 0x33;
        let mut m = Machine::with_program(&program).unwrap();
        m.set_pc(255);
        assert!(m.step());
        assert_eq!(m.reg(2), 0x33);
        assert_eq!(m.pc(), 1);
    }

    #[test]
    fn pc_wraps_at_end_of_memory() {
        let mut m = Machine::new();
        m.set_pc(254);
        m.step();
        assert_eq!(m.pc(), 0);
    }

    #[test]
    fn empty_memory_runs_forever() {
        let mut m = Machine::new();
        assert_eq!(m.run(1000), 1000);
        assert_eq!(m.cycles(), 1000);
        assert!(!m.is_halted());
    }
}
