use miette::Result;

use crate::air::{Air, AirStmt};
use crate::error;
use crate::isa::{Instr, Opcode, Register, Shape};
use crate::lexer::{tokenize, Token, TokenKind};
use crate::state::MEMORY_SIZE;
use crate::symbol::{Span, SymbolTable};

/// Bytes occupied by one instruction.
const WORD_SIZE: usize = 2;

/// Assemble source text into its intermediate representation, running both passes.
pub fn assemble(src: &str) -> Result<Air> {
    let parser = AsmParser::new(src)?;
    let symbols = parser.collect_labels()?;
    parser.parse(&symbols)
}

/// Tokens of a single non-empty source line.
struct Line {
    /// 1-based line number
    number: usize,
    /// Label definition at the start of the line, if any
    label: Option<Token>,
    /// Instruction tokens following the label, possibly empty
    body: Vec<Token>,
}

/// Two-pass assembler over tokenized source.
///
/// The first pass binds labels to word addresses, the second encodes every instruction line
/// using those bindings. Either pass stops at the first error.
pub struct AsmParser<'a> {
    /// Reference to the source file
    src: &'a str,
    lines: Vec<Line>,
}

impl<'a> AsmParser<'a> {
    pub fn new(src: &'a str) -> Result<Self> {
        let toks = tokenize(src)?;
        let mut lines = Vec::new();
        for line_toks in toks.split(|tok| tok.kind == TokenKind::Newline) {
            if line_toks.is_empty() {
                continue;
            }
            lines.push(Self::split_label(src, line_toks)?);
        }
        Ok(AsmParser { src, lines })
    }

    fn get_span(&self, span: Span) -> &'a str {
        &self.src[span.range()]
    }

    /// Separate a leading `name:` from the rest of the line.
    fn split_label(src: &str, toks: &[Token]) -> Result<Line> {
        let number = toks[0].line;
        match toks {
            [name, colon, rest @ ..] if colon.kind == TokenKind::Colon => {
                if name.kind != TokenKind::Ident {
                    return Err(error::asm_bad_label(name.span, src, number));
                }
                Ok(Line {
                    number,
                    label: Some(*name),
                    body: rest.to_vec(),
                })
            }
            [colon, ..] if colon.kind == TokenKind::Colon => {
                Err(error::asm_bad_label(colon.span, src, number))
            }
            _ => Ok(Line {
                number,
                label: None,
                body: toks.to_vec(),
            }),
        }
    }

    /// First pass: bind every label to the address of the instruction it precedes.
    ///
    /// A label alone on its line binds to the next instruction line.
    pub fn collect_labels(&self) -> Result<SymbolTable> {
        let mut symbols = SymbolTable::new();
        let mut addr = 0usize;

        for line in &self.lines {
            if let Some(label) = line.label {
                if addr >= MEMORY_SIZE {
                    return Err(error::asm_too_long(label.span, self.src, line.number));
                }
                let name = self.get_span(label.span);
                if let Err(prev) = symbols.insert(name, addr as u8) {
                    return Err(error::asm_duplicate_label(
                        label.span,
                        self.src,
                        line.number,
                        name,
                        prev,
                    ));
                }
            }
            if !line.body.is_empty() {
                addr += WORD_SIZE;
                if addr > MEMORY_SIZE {
                    return Err(error::asm_too_long(
                        Self::body_span(&line.body),
                        self.src,
                        line.number,
                    ));
                }
            }
        }
        Ok(symbols)
    }

    /// Second pass: encode every instruction line.
    pub fn parse(&self, symbols: &SymbolTable) -> Result<Air> {
        let mut air = Air::new();
        for line in &self.lines {
            if line.body.is_empty() {
                continue;
            }
            let instr = self.parse_instr(line, symbols)?;
            air.add_stmt(AirStmt {
                line: line.number,
                span: Self::body_span(&line.body),
                instr,
            });
        }
        Ok(air)
    }

    fn body_span(body: &[Token]) -> Span {
        let first = body[0].span;
        body.last().map_or(first, |last| first.join(last.span))
    }

    fn parse_instr(&self, line: &Line, symbols: &SymbolTable) -> Result<Instr> {
        let (head, rest) = (&line.body[0], &line.body[1..]);
        if head.kind != TokenKind::Ident {
            return Err(error::asm_expected_instr(head.span, self.src, line.number));
        }
        let name = self.get_span(head.span);
        let op: Opcode = name
            .parse()
            .map_err(|_| error::asm_unknown_instr(head.span, self.src, line.number, name))?;

        let operands = self.split_operands(line.number, rest)?;
        let shape = op.shape();
        if operands.len() != shape.arity() {
            return Err(error::asm_arity(
                Self::body_span(&line.body),
                self.src,
                line.number,
                op,
                shape.arity(),
                operands.len(),
            ));
        }

        let reg = |idx: usize| self.expect_reg(line.number, &operands[idx]);
        let value = |idx: usize| self.expect_value(line.number, &operands[idx], symbols);

        let instr = match shape {
            Shape::None => Instr::bare(op),
            Shape::Triple => Instr::triple(op, reg(0)?, reg(1)?, reg(2)?),
            Shape::Shift => {
                let (a, _, c) = (reg(0)?, reg(1)?, reg(2)?);
                Instr::triple(op, a, Register::default(), c)
            }
            Shape::RegImm => Instr::reg_imm(op, reg(0)?, value(1)?),
            Shape::Addr => Instr::addr(op, value(0)?),
            Shape::Plot => Instr::triple(op, reg(0)?, reg(1)?, Register::default()),
            Shape::Reg => Instr::triple(op, reg(0)?, Register::default(), Register::default()),
        };
        Ok(instr)
    }

    /// Operands are single tokens separated by commas.
    fn split_operands(&self, line: usize, toks: &[Token]) -> Result<Vec<Token>> {
        if toks.is_empty() {
            return Ok(Vec::new());
        }
        toks.split(|tok| tok.kind == TokenKind::Comma)
            .enumerate()
            .map(|(i, group)| match group {
                [tok] => Ok(*tok),
                [] => {
                    // Point at the stray comma
                    let comma = toks
                        .iter()
                        .filter(|tok| tok.kind == TokenKind::Comma)
                        .nth(i.saturating_sub(1))
                        .unwrap_or(&toks[0]);
                    Err(error::asm_malformed_operand(comma.span, self.src, line))
                }
                [first, .., last] => Err(error::asm_malformed_operand(
                    first.span.join(last.span),
                    self.src,
                    line,
                )),
            })
            .collect()
    }

    fn expect_reg(&self, line: usize, tok: &Token) -> Result<Register> {
        match tok.kind {
            TokenKind::Reg(idx) => Register::new(idx)
                .ok_or_else(|| error::asm_reg_range(tok.span, self.src, line, idx)),
            _ => Err(error::asm_expected_reg(tok.span, self.src, line)),
        }
    }

    /// Integer literal or label, must fit in 8 bits.
    fn expect_value(&self, line: usize, tok: &Token, symbols: &SymbolTable) -> Result<u8> {
        match tok.kind {
            TokenKind::Lit(val) => u8::try_from(val)
                .map_err(|_| error::asm_value_range(tok.span, self.src, line, val)),
            TokenKind::Ident => {
                let name = self.get_span(tok.span);
                symbols
                    .get(name)
                    .ok_or_else(|| error::asm_unresolved(tok.span, self.src, line, name))
            }
            _ => Err(error::asm_expected_value(tok.span, self.src, line)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bytes(src: &str) -> Vec<u8> {
        assemble(src).unwrap().emit()
    }

    fn err(src: &str) -> String {
        assemble(src).unwrap_err().to_string()
    }

    #[test]
    fn encodes_every_shape() {
        let src = "
            NOP
            HLT
            ADD R1, R2, R3
            NOR r15, r0, r7
            JMP 0x10
            RSH R4, R9, R5
            LSH R1, R0, R1
            LDI R1, 200
            ADI R2, 0b11
            BRZ 4
            PLT R3, R4
            SEG R6
        ";
        assert_eq!(
            bytes(src),
            vec![
                0x00, 0x00, //
                0x10, 0x00, //
                0x21, 0x23, //
                0x7F, 0x07, //
                0x80, 0x10, //
                0x94, 0x05, //
                0xA1, 0x01, //
                0xB1, 0xC8, //
                0xC2, 0x03, //
                0xD0, 0x04, //
                0xE3, 0x40, //
                0xF6, 0x00, //
            ]
        );
    }

    #[test]
    fn label_resolution() {
        let air = assemble("START: LDI R0, 5\nJMP START").unwrap();
        assert_eq!(air.emit(), vec![0xB0, 0x05, 0x80, 0x00]);
    }

    #[test]
    fn label_only_line_binds_next_instruction() {
        let src = "
            ; setup
            LDI R0, 1

            loop:
            ; body
                ADI R0, 1
                JMP LOOP
            end:
            HLT
        ";
        let parser = AsmParser::new(src).unwrap();
        let symbols = parser.collect_labels().unwrap();
        assert_eq!(symbols.get("loop"), Some(2));
        assert_eq!(symbols.get("END"), Some(6));
        let code = parser.parse(&symbols).unwrap().emit();
        assert_eq!(&code[4..6], &[0x80, 0x02]);
    }

    #[test]
    fn labels_as_immediates_and_forward_references() {
        let out = bytes("LDI R1, data\nBRZ data\ndata: HLT");
        assert_eq!(out, vec![0xB1, 0x04, 0xD0, 0x04, 0x10, 0x00]);
    }

    #[test]
    fn case_insensitive() {
        assert_eq!(bytes("Here: add r1, R2, r3\njmp HERE"), bytes("HERE: ADD R1, R2, R3\nJMP here"));
    }

    #[test]
    fn deterministic() {
        let src = "a: LDI R1, 3\nb: PLT R1, R1\nSUB R1, R2, R1\nBRZ a\nJMP b";
        assert_eq!(bytes(src), bytes(src));
    }

    #[test]
    fn unknown_instruction() {
        let msg = err("NOP\nMOV R1, R2");
        assert!(msg.contains("MOV"));
        assert!(msg.contains("line 2"));
    }

    #[test]
    fn wrong_arity() {
        assert!(err("ADD R1, R2").contains("line 1"));
        assert!(err("NOP\nHLT R1").contains("line 2"));
        assert!(err("NOP\nNOP\nRSH R1, R2").contains("line 3"));
        assert!(err("SEG").contains("line 1"));
    }

    #[test]
    fn register_out_of_range() {
        let msg = err("LDI R16, 1");
        assert!(msg.contains("R16"));
        assert!(msg.contains("line 1"));
    }

    #[test]
    fn expected_register() {
        assert!(err("ADD R1, 2, R3").contains("line 1"));
        assert!(err("PLT x, R1").contains("line 1"));
    }

    #[test]
    fn unresolved_label() {
        let msg = err("JMP nowhere");
        assert!(msg.contains("NOWHERE") || msg.contains("nowhere"));
        assert!(msg.contains("line 1"));
    }

    #[test]
    fn value_too_wide() {
        assert!(err("LDI R0, 256").contains("256"));
        assert!(err("NOP\nJMP 0x100").contains("line 2"));
        assert_eq!(bytes("LDI R0, 255"), vec![0xB0, 0xFF]);
    }

    #[test]
    fn register_where_value_expected() {
        assert!(err("JMP R1").contains("line 1"));
    }

    #[test]
    fn malformed_operands() {
        assert!(err("ADD R1 R2, R3").contains("line 1"));
        assert!(err("ADD R1,, R2, R3").contains("line 1"));
        assert!(err("SEG R1,").contains("line 1"));
    }

    #[test]
    fn duplicate_label() {
        let msg = err("a: NOP\nA: HLT");
        assert!(msg.contains("line 2"));
    }

    #[test]
    fn bad_label() {
        assert!(err("R1: NOP").contains("line 1"));
        assert!(err(": NOP").contains("line 1"));
        assert!(err("NOP\n12: NOP").contains("line 2"));
    }

    #[test]
    fn line_must_start_with_instruction() {
        assert!(err("R1, R2").contains("line 1"));
        assert!(err("5").contains("line 1"));
    }

    #[test]
    fn fills_memory_exactly() {
        let src = "NOP\n".repeat(128);
        assert_eq!(bytes(&src).len(), 256);
        let src = "NOP\n".repeat(129);
        assert!(err(&src).contains("line 129"));
        let src = "NOP\n".repeat(128) + "end:";
        assert!(err(&src).contains("line 129"));
    }

    #[test]
    fn no_partial_output() {
        assert!(assemble("LDI R0, 1\nLDI R1, 2\nBOGUS").is_err());
    }

    #[test]
    fn empty_source() {
        assert!(bytes("").is_empty());
        assert!(bytes("; nothing here\n\n").is_empty());
    }
}
