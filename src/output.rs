use std::cell::RefCell;
use std::fmt::Write;

use colored::Colorize;

use crate::state::{Framebuffer, Machine};

/// Text rendering of machine state for the terminal.
///
/// In minimal mode everything is plain ASCII without colour, suited for blackbox tests.
pub struct Output;

impl Output {
    thread_local! {
        static IS_MINIMAL: RefCell<bool> = const { RefCell::new(false) };
    }

    pub fn set_minimal(new_value: bool) -> bool {
        Self::IS_MINIMAL.with(|value| value.replace(new_value))
    }

    pub fn is_minimal() -> bool {
        Self::IS_MINIMAL.with(|value| *value.borrow())
    }

    /// One text line per screen row, top row first.
    pub fn render_screen(screen: &Framebuffer) -> String {
        let minimal = Self::is_minimal();
        let mut out = String::new();
        for row in screen.rows() {
            for &lit in row {
                match (minimal, lit) {
                    (true, true) => out.push('#'),
                    (true, false) => out.push('.'),
                    // Two columns per cell to keep cells roughly square
                    (false, true) => {
                        let _ = write!(out, "{}", "██".yellow());
                    }
                    (false, false) => {
                        let _ = write!(out, "{}", "· ".dimmed());
                    }
                }
            }
            out.push('\n');
        }
        out
    }

    pub fn render_segment(value: u8) -> String {
        let digits = format!("{value:03}");
        if Self::is_minimal() {
            format!("SEG {digits}")
        } else {
            format!("{} {}", "SEG".dimmed(), digits.as_str().red().bold())
        }
    }

    /// Screen followed by segment display.
    pub fn render_frame(machine: &Machine) -> String {
        let mut out = Self::render_screen(machine.screen());
        out.push_str(&Self::render_segment(machine.segment()));
        out.push('\n');
        out
    }

    pub fn render_registers(machine: &Machine) -> String {
        let mut out = String::new();
        let flags = machine.flags();
        if Self::is_minimal() {
            for (i, value) in machine.registers().iter().enumerate() {
                let _ = writeln!(out, "R{i} {value}");
            }
            let _ = writeln!(out, "PC {}", machine.pc());
            let _ = writeln!(out, "ZC {}{}", flags.zero as u8, flags.carry as u8);
            return out;
        }

        let _ = writeln!(out, "{}", "┌─────────────────────────┐".dimmed());
        let _ = writeln!(
            out,
            "{}       {}   {} {}",
            "│".dimmed(),
            "hex  uint".italic().dimmed(),
            "bin".italic().dimmed(),
            "      │".dimmed()
        );
        for (i, value) in machine.registers().iter().enumerate() {
            let _ = writeln!(
                out,
                "{} {}  0x{value:02x}  {value:>3}  {value:08b} {}",
                "│".dimmed(),
                format!("R{i:<2}").as_str().bold(),
                "│".dimmed()
            );
        }
        let _ = writeln!(
            out,
            "{} {}   0x{:02x}   Z {}  C {}     {}",
            "│".dimmed(),
            "PC".bold(),
            machine.pc(),
            flags.zero as u8,
            flags.carry as u8,
            "│".dimmed()
        );
        let _ = writeln!(out, "{}", "└─────────────────────────┘".dimmed());
        out
    }
}
