use miette::{miette, LabeledSpan, Report, Severity};

use crate::isa::Opcode;
use crate::symbol::Span;

// Lexer errors

pub fn lex_unknown(span: Span, src: &str, line: usize) -> Report {
    miette!(
        severity = Severity::Error,
        code = "lex::unknown",
        help = "only mnemonics, registers, labels, integer literals, `,` and `:` are allowed",
        labels = vec![LabeledSpan::at(span, "unknown token")],
        "Encountered an unknown token on line {line}",
    )
    .with_source_code(src.to_string())
}

pub fn lex_invalid_lit(span: Span, src: &str, line: usize) -> Report {
    miette!(
        severity = Severity::Error,
        code = "lex::bad_lit",
        help = "literals are decimal, or prefixed with 0x, 0b or 0o",
        labels = vec![LabeledSpan::at(span, "incorrect literal")],
        "Encountered an invalid literal on line {line}",
    )
    .with_source_code(src.to_string())
}

pub fn lex_negative_lit(span: Span, src: &str, line: usize) -> Report {
    miette!(
        severity = Severity::Error,
        code = "lex::negative_lit",
        help = "values are unsigned bytes, write the two's complement instead (e.g. 255 for -1)",
        labels = vec![LabeledSpan::at(span, "negative literal")],
        "Negative literals are not allowed (line {line})",
    )
    .with_source_code(src.to_string())
}

// Label pass errors

pub fn asm_duplicate_label(span: Span, src: &str, line: usize, name: &str, addr: u8) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::duplicate_label",
        help = "labels can only be defined once per file",
        labels = vec![LabeledSpan::at(span, "duplicate label")],
        "Label `{name}` on line {line} was already bound to address {addr}",
    )
    .with_source_code(src.to_string())
}

pub fn asm_bad_label(span: Span, src: &str, line: usize) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::bad_label",
        help = "labels are identifiers such as `loop` or `draw_1`, and cannot be register names",
        labels = vec![LabeledSpan::at(span, "not a label")],
        "Invalid label definition on line {line}",
    )
    .with_source_code(src.to_string())
}

pub fn asm_too_long(span: Span, src: &str, line: usize) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::too_long",
        help = "program memory holds 128 instructions (256 bytes)",
        labels = vec![LabeledSpan::at(span, "does not fit in memory")],
        "Program does not fit in memory past line {line}",
    )
    .with_source_code(src.to_string())
}

// Encoding pass errors

pub fn asm_unknown_instr(span: Span, src: &str, line: usize, name: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::unknown_instr",
        help = "check the list of available mnemonics (NOP, HLT, ADD, SUB, AND, OR, XOR, NOR, JMP, RSH, LSH, LDI, ADI, BRZ, PLT, SEG)",
        labels = vec![LabeledSpan::at(span, "unknown instruction")],
        "Unknown instruction `{name}` on line {line}",
    )
    .with_source_code(src.to_string())
}

pub fn asm_expected_instr(span: Span, src: &str, line: usize) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::expected_instr",
        help = "lines should start with an optional `label:` followed by an instruction",
        labels = vec![LabeledSpan::at(span, "unexpected token")],
        "Expected an instruction on line {line}",
    )
    .with_source_code(src.to_string())
}

pub fn asm_arity(
    span: Span,
    src: &str,
    line: usize,
    op: Opcode,
    expected: usize,
    found: usize,
) -> Report {
    let plural = if expected == 1 { "" } else { "s" };
    miette!(
        severity = Severity::Error,
        code = "asm::arity",
        help = "operands are separated by commas, e.g. `ADD R1, R2, R3`",
        labels = vec![LabeledSpan::at(span, "wrong operand count")],
        "{op} takes {expected} operand{plural}, found {found} on line {line}",
    )
    .with_source_code(src.to_string())
}

pub fn asm_malformed_operand(span: Span, src: &str, line: usize) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::malformed_operand",
        help = "each operand is a single register, integer literal or label",
        labels = vec![LabeledSpan::at(span, "malformed operand")],
        "Malformed operand on line {line}",
    )
    .with_source_code(src.to_string())
}

pub fn asm_expected_reg(span: Span, src: &str, line: usize) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::expected_reg",
        help = "registers are written R0 to R15",
        labels = vec![LabeledSpan::at(span, "not a register")],
        "Expected a register on line {line}",
    )
    .with_source_code(src.to_string())
}

pub fn asm_reg_range(span: Span, src: &str, line: usize, index: u32) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::reg_range",
        help = "registers are written R0 to R15",
        labels = vec![LabeledSpan::at(span, "register out of range")],
        "Register R{index} does not exist (line {line})",
    )
    .with_source_code(src.to_string())
}

pub fn asm_expected_value(span: Span, src: &str, line: usize) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::expected_value",
        help = "this operand must be an integer literal or a label",
        labels = vec![LabeledSpan::at(span, "not a value")],
        "Expected an integer literal or label on line {line}",
    )
    .with_source_code(src.to_string())
}

pub fn asm_unresolved(span: Span, src: &str, line: usize, name: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::unresolved",
        help = format!("define the label with `{name}:` before or after this line"),
        labels = vec![LabeledSpan::at(span, "unknown label")],
        "Unresolved label `{name}` on line {line}",
    )
    .with_source_code(src.to_string())
}

pub fn asm_value_range(span: Span, src: &str, line: usize, value: u32) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::value_range",
        help = "immediates and addresses are 8 bits wide (0 to 255)",
        labels = vec![LabeledSpan::at(span, "value too large")],
        "Value {value} does not fit in 8 bits (line {line})",
    )
    .with_source_code(src.to_string())
}
