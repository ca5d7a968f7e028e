//! Reader for the ASCII (`aag`) and binary (`aig`) AIGER formats.

use miette::Diagnostic;
use thiserror::Error;

use crate::aig::{aiger_var, Aig, AigerLit, AndGate, Latch, Reset};

#[derive(Debug, Clone, Error, Diagnostic)]
pub enum ParseError {
    #[error("`{found}` is not a valid AIGER header")]
    #[diagnostic(
        code(harrier::aiger::header),
        help("expected `aag M I L O A [B C J F]` or the binary `aig` variant")
    )]
    InvalidHeader { found: String },

    #[error("header counts are inconsistent: M = {max_var} but I + L + A = {node_count}")]
    #[diagnostic(code(harrier::aiger::header_counts))]
    InconsistentHeader { max_var: u32, node_count: u32 },

    #[error("line {line}: expected {expected}, found `{found}`")]
    #[diagnostic(code(harrier::aiger::token))]
    InvalidToken {
        line: usize,
        expected: &'static str,
        found: String,
    },

    #[error("line {line}: literal {literal} exceeds the declared maximum variable {max_var}")]
    #[diagnostic(code(harrier::aiger::literal_range))]
    LiteralOutOfRange {
        line: usize,
        literal: AigerLit,
        max_var: u32,
    },

    #[error("line {line}: {message}")]
    #[diagnostic(code(harrier::aiger::structure))]
    InvalidStructure { line: usize, message: String },

    #[error("unexpected end of file while reading {expected}")]
    #[diagnostic(code(harrier::aiger::eof))]
    UnexpectedEof { expected: &'static str },

    #[error("{message}")]
    #[diagnostic(code(harrier::aiger::malformed))]
    MalformedCircuit { message: String },

    #[error("the input is not valid UTF-8 where text was expected")]
    #[diagnostic(code(harrier::aiger::encoding))]
    InvalidEncoding,
}

#[derive(Debug, Clone, Copy)]
struct Header {
    binary: bool,
    max_var: u32,
    inputs: u32,
    latches: u32,
    outputs: u32,
    ands: u32,
    bad: u32,
    constraints: u32,
    justice: u32,
    fairness: u32,
}

/// Parses either AIGER format, dispatching on the magic word.
pub fn parse(bytes: &[u8]) -> Result<Aig, ParseError> {
    if bytes.starts_with(b"aig ") || bytes == b"aig" {
        parse_binary(bytes)
    } else {
        let text = std::str::from_utf8(bytes).map_err(|_| ParseError::InvalidEncoding)?;
        parse_ascii(text)
    }
}

/// Parses the ASCII `aag` format.
pub fn parse_ascii(source: &str) -> Result<Aig, ParseError> {
    let mut lines = Lines::new(source);

    let header = parse_header(lines.next("the header")?, lines.number())?;
    if header.binary {
        return Err(ParseError::InvalidHeader {
            found: "aig (binary header in ASCII input)".into(),
        });
    }

    let mut aig = Aig {
        max_var: header.max_var,
        ..Aig::default()
    };

    for _ in 0..header.inputs {
        let (line, number) = lines.next_numbered("an input definition")?;
        let lit = parse_literal_token(single_token(line, number, "an input literal")?, number)?;
        check_literal(lit, header.max_var, number)?;
        check_even(lit, number, "an input")?;
        aig.inputs.push(lit);
    }

    for _ in 0..header.latches {
        let (line, number) = lines.next_numbered("a latch definition")?;
        let tokens: Vec<&str> = line.split_ascii_whitespace().collect();
        if tokens.len() != 2 && tokens.len() != 3 {
            return Err(ParseError::InvalidToken {
                line: number,
                expected: "`lit next [reset]`",
                found: line.to_string(),
            });
        }

        let lit = parse_literal_token(tokens[0], number)?;
        let next = parse_literal_token(tokens[1], number)?;
        check_literal(lit, header.max_var, number)?;
        check_literal(next, header.max_var, number)?;
        check_even(lit, number, "a latch")?;

        let reset = match tokens.get(2) {
            None => Reset::Zero,
            Some(token) => parse_reset(parse_literal_token(token, number)?, lit, number)?,
        };

        aig.latches.push(Latch { lit, next, reset });
    }

    for _ in 0..header.outputs {
        let (line, number) = lines.next_numbered("an output definition")?;
        let lit = parse_literal_token(single_token(line, number, "an output literal")?, number)?;
        check_literal(lit, header.max_var, number)?;
        aig.outputs.push(lit);
    }

    for _ in 0..header.bad {
        let (line, number) = lines.next_numbered("a bad-state definition")?;
        let lit = parse_literal_token(single_token(line, number, "a bad-state literal")?, number)?;
        check_literal(lit, header.max_var, number)?;
        aig.bad.push(lit);
    }

    for _ in 0..header.constraints {
        let (line, number) = lines.next_numbered("an invariant constraint definition")?;
        let lit = parse_literal_token(single_token(line, number, "a constraint literal")?, number)?;
        check_literal(lit, header.max_var, number)?;
        aig.constraints.push(lit);
    }

    // Justice properties list their sizes first, then all literals.
    let mut justice_sizes = Vec::with_capacity(header.justice as usize);
    for _ in 0..header.justice {
        let (line, number) = lines.next_numbered("a justice property size")?;
        let size = parse_literal_token(single_token(line, number, "a justice property size")?, number)?;
        justice_sizes.push(size);
    }
    for size in justice_sizes {
        let mut lits = Vec::with_capacity(size as usize);
        for _ in 0..size {
            let (line, number) = lines.next_numbered("a justice property literal")?;
            let lit =
                parse_literal_token(single_token(line, number, "a justice literal")?, number)?;
            check_literal(lit, header.max_var, number)?;
            lits.push(lit);
        }
        aig.justice.push(lits);
    }

    for _ in 0..header.fairness {
        let (line, number) = lines.next_numbered("a fairness constraint definition")?;
        let lit = parse_literal_token(single_token(line, number, "a fairness literal")?, number)?;
        check_literal(lit, header.max_var, number)?;
        aig.fairness.push(lit);
    }

    for _ in 0..header.ands {
        let (line, number) = lines.next_numbered("an AND gate definition")?;
        let tokens: Vec<&str> = line.split_ascii_whitespace().collect();
        if tokens.len() != 3 {
            return Err(ParseError::InvalidToken {
                line: number,
                expected: "`lhs rhs0 rhs1`",
                found: line.to_string(),
            });
        }

        let lhs = parse_literal_token(tokens[0], number)?;
        let rhs0 = parse_literal_token(tokens[1], number)?;
        let rhs1 = parse_literal_token(tokens[2], number)?;
        for lit in [lhs, rhs0, rhs1] {
            check_literal(lit, header.max_var, number)?;
        }
        check_even(lhs, number, "an AND gate")?;

        aig.ands.push(AndGate { lhs, rhs0, rhs1 });
    }

    // Symbol table and comments may follow; they are ignored.

    check_shape(&aig, &header)?;
    Ok(aig)
}

/// Parses the binary `aig` format.
pub fn parse_binary(bytes: &[u8]) -> Result<Aig, ParseError> {
    let mut cursor = Cursor::new(bytes);

    let header_line = cursor.line("the header")?;
    let header = parse_header(&header_line, 1)?;
    if !header.binary {
        return Err(ParseError::InvalidHeader { found: header_line });
    }

    let mut aig = Aig {
        max_var: header.max_var,
        ..Aig::default()
    };

    // Inputs are implicit in the binary format.
    for i in 0..header.inputs {
        aig.inputs.push(2 * (i + 1));
    }

    for i in 0..header.latches {
        let number = cursor.line_number();
        let line = cursor.line("a latch definition")?;
        let tokens: Vec<&str> = line.split_ascii_whitespace().collect();
        if tokens.is_empty() || tokens.len() > 2 {
            return Err(ParseError::InvalidToken {
                line: number,
                expected: "`next [reset]`",
                found: line,
            });
        }

        let lit = 2 * (header.inputs + i + 1);
        let next = parse_literal_token(tokens[0], number)?;
        check_literal(next, header.max_var, number)?;

        let reset = match tokens.get(1) {
            None => Reset::Zero,
            Some(token) => parse_reset(parse_literal_token(token, number)?, lit, number)?,
        };

        aig.latches.push(Latch { lit, next, reset });
    }

    for _ in 0..header.outputs {
        let number = cursor.line_number();
        let line = cursor.line("an output definition")?;
        let lit = parse_literal_token(single_token(&line, number, "an output literal")?, number)?;
        check_literal(lit, header.max_var, number)?;
        aig.outputs.push(lit);
    }

    for _ in 0..header.bad {
        let number = cursor.line_number();
        let line = cursor.line("a bad-state definition")?;
        let lit = parse_literal_token(single_token(&line, number, "a bad-state literal")?, number)?;
        check_literal(lit, header.max_var, number)?;
        aig.bad.push(lit);
    }

    for _ in 0..header.constraints {
        let number = cursor.line_number();
        let line = cursor.line("an invariant constraint definition")?;
        let lit = parse_literal_token(single_token(&line, number, "a constraint literal")?, number)?;
        check_literal(lit, header.max_var, number)?;
        aig.constraints.push(lit);
    }

    let mut justice_sizes = Vec::with_capacity(header.justice as usize);
    for _ in 0..header.justice {
        let number = cursor.line_number();
        let line = cursor.line("a justice property size")?;
        let size =
            parse_literal_token(single_token(&line, number, "a justice property size")?, number)?;
        justice_sizes.push(size);
    }
    for size in justice_sizes {
        let mut lits = Vec::with_capacity(size as usize);
        for _ in 0..size {
            let number = cursor.line_number();
            let line = cursor.line("a justice property literal")?;
            let lit =
                parse_literal_token(single_token(&line, number, "a justice literal")?, number)?;
            check_literal(lit, header.max_var, number)?;
            lits.push(lit);
        }
        aig.justice.push(lits);
    }

    for _ in 0..header.fairness {
        let number = cursor.line_number();
        let line = cursor.line("a fairness constraint definition")?;
        let lit = parse_literal_token(single_token(&line, number, "a fairness literal")?, number)?;
        check_literal(lit, header.max_var, number)?;
        aig.fairness.push(lit);
    }

    // AND gates are delta-encoded: lhs is implicit and consecutive,
    // and the operands are stored as `lhs - rhs0` and `rhs0 - rhs1`
    // in a 7-bit variable-length encoding.
    for i in 0..header.ands {
        let lhs = 2 * (header.inputs + header.latches + i + 1);
        let delta0 = cursor.varint()?;
        let delta1 = cursor.varint()?;

        let rhs0 = lhs
            .checked_sub(delta0)
            .ok_or_else(|| cursor.structure_error("AND gate delta underflows its left operand"))?;
        let rhs1 = rhs0
            .checked_sub(delta1)
            .ok_or_else(|| cursor.structure_error("AND gate delta underflows its right operand"))?;

        aig.ands.push(AndGate { lhs, rhs0, rhs1 });
    }

    check_shape(&aig, &header)?;
    Ok(aig)
}

fn parse_header(line: &str, number: usize) -> Result<Header, ParseError> {
    let mut tokens = line.split_ascii_whitespace();

    let binary = match tokens.next() {
        Some("aag") => false,
        Some("aig") => true,
        _ => {
            return Err(ParseError::InvalidHeader {
                found: line.to_string(),
            })
        }
    };

    let mut counts = [0u32; 9];
    let mut given = 0;
    for (i, token) in tokens.enumerate() {
        if i >= counts.len() {
            return Err(ParseError::InvalidHeader {
                found: line.to_string(),
            });
        }
        counts[i] = parse_literal_token(token, number)?;
        given = i + 1;
    }
    if given < 5 {
        return Err(ParseError::InvalidHeader {
            found: line.to_string(),
        });
    }

    let [max_var, inputs, latches, outputs, ands, bad, constraints, justice, fairness] = counts;

    if binary && max_var != inputs + latches + ands {
        return Err(ParseError::InconsistentHeader {
            max_var,
            node_count: inputs + latches + ands,
        });
    }
    if !binary && max_var < inputs + latches + ands {
        return Err(ParseError::InconsistentHeader {
            max_var,
            node_count: inputs + latches + ands,
        });
    }

    Ok(Header {
        binary,
        max_var,
        inputs,
        latches,
        outputs,
        ands,
        bad,
        constraints,
        justice,
        fairness,
    })
}

fn parse_reset(reset: AigerLit, latch: AigerLit, line: usize) -> Result<Reset, ParseError> {
    match reset {
        0 => Ok(Reset::Zero),
        1 => Ok(Reset::One),
        lit if lit == latch => Ok(Reset::Nondet),
        lit => Err(ParseError::InvalidStructure {
            line,
            message: format!("a latch reset must be 0, 1 or the latch literal, found {lit}"),
        }),
    }
}

fn parse_literal_token(token: &str, line: usize) -> Result<u32, ParseError> {
    token.parse().map_err(|_| ParseError::InvalidToken {
        line,
        expected: "an unsigned integer",
        found: token.to_string(),
    })
}

fn single_token<'a>(
    line: &'a str,
    number: usize,
    expected: &'static str,
) -> Result<&'a str, ParseError> {
    let mut tokens = line.split_ascii_whitespace();
    match (tokens.next(), tokens.next()) {
        (Some(token), None) => Ok(token),
        _ => Err(ParseError::InvalidToken {
            line: number,
            expected,
            found: line.to_string(),
        }),
    }
}

fn check_literal(lit: AigerLit, max_var: u32, line: usize) -> Result<(), ParseError> {
    if aiger_var(lit) > max_var {
        return Err(ParseError::LiteralOutOfRange {
            line,
            literal: lit,
            max_var,
        });
    }
    Ok(())
}

fn check_even(lit: AigerLit, line: usize, what: &str) -> Result<(), ParseError> {
    if lit & 1 == 1 {
        return Err(ParseError::InvalidStructure {
            line,
            message: format!("{what} must be defined by an uncomplemented literal, found {lit}"),
        });
    }
    Ok(())
}

/// Definitions must not collide: every variable is an input, a latch or
/// a gate at most once, and never the constant.
fn check_shape(aig: &Aig, header: &Header) -> Result<(), ParseError> {
    let mut defined = vec![false; header.max_var as usize + 1];
    let mut define = |lit: AigerLit, what: &str| -> Result<(), ParseError> {
        let var = aiger_var(lit) as usize;
        if var == 0 || defined[var] {
            return Err(ParseError::MalformedCircuit {
                message: format!("literal {lit} redefines an existing node as {what}"),
            });
        }
        defined[var] = true;
        Ok(())
    };

    for &input in &aig.inputs {
        define(input, "an input")?;
    }
    for latch in &aig.latches {
        define(latch.lit, "a latch")?;
    }
    for and in &aig.ands {
        define(and.lhs, "an AND gate")?;
    }
    Ok(())
}

struct Lines<'a> {
    inner: std::str::Lines<'a>,
    number: usize,
}

impl<'a> Lines<'a> {
    fn new(source: &'a str) -> Self {
        Lines {
            inner: source.lines(),
            number: 0,
        }
    }

    fn number(&self) -> usize {
        self.number
    }

    fn next(&mut self, expected: &'static str) -> Result<&'a str, ParseError> {
        self.number += 1;
        self.inner
            .next()
            .ok_or(ParseError::UnexpectedEof { expected })
    }

    fn next_numbered(&mut self, expected: &'static str) -> Result<(&'a str, usize), ParseError> {
        let line = self.next(expected)?;
        Ok((line, self.number))
    }
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
    line: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Cursor {
            bytes,
            pos: 0,
            line: 0,
        }
    }

    fn line_number(&self) -> usize {
        self.line + 1
    }

    fn line(&mut self, expected: &'static str) -> Result<String, ParseError> {
        if self.pos >= self.bytes.len() {
            return Err(ParseError::UnexpectedEof { expected });
        }

        let rest = &self.bytes[self.pos..];
        let end = rest
            .iter()
            .position(|&b| b == b'\n')
            .ok_or(ParseError::UnexpectedEof { expected })?;

        self.pos += end + 1;
        self.line += 1;

        std::str::from_utf8(&rest[..end])
            .map(str::to_string)
            .map_err(|_| ParseError::InvalidEncoding)
    }

    fn varint(&mut self) -> Result<u32, ParseError> {
        let mut value: u32 = 0;
        let mut shift = 0;

        loop {
            let byte = *self
                .bytes
                .get(self.pos)
                .ok_or(ParseError::UnexpectedEof {
                    expected: "a delta-encoded AND gate",
                })?;
            self.pos += 1;

            if shift >= 32 {
                return Err(self.structure_error("AND gate delta does not fit in 32 bits"));
            }
            value |= u32::from(byte & 0x7f) << shift;
            shift += 7;

            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
    }

    fn structure_error(&self, message: &str) -> ParseError {
        ParseError::InvalidStructure {
            line: self.line_number(),
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aig::{aiger_not, AIGER_TRUE};

    #[test]
    fn parses_a_minimal_ascii_file() {
        let aig = parse_ascii("aag 0 0 0 0 0\n").unwrap();

        assert_eq!(aig.max_var, 0);
        assert!(aig.inputs.is_empty());
        assert!(aig.latches.is_empty());
        assert!(aig.outputs.is_empty());
        assert!(aig.ands.is_empty());
    }

    #[test]
    fn parses_a_latch_with_default_reset() {
        let aig = parse_ascii("aag 1 0 1 1 0\n2 1\n3\n").unwrap();

        assert_eq!(aig.latches.len(), 1);
        assert_eq!(
            aig.latches[0],
            Latch {
                lit: 2,
                next: AIGER_TRUE,
                reset: Reset::Zero
            }
        );
        assert_eq!(aig.outputs, vec![3]);
    }

    #[test]
    fn parses_explicit_latch_resets() {
        let aig = parse_ascii("aag 2 0 2 0 0 1\n2 2 1\n4 4 4\n2\n").unwrap();

        assert_eq!(aig.latches[0].reset, Reset::One);
        assert_eq!(aig.latches[1].reset, Reset::Nondet);
        assert_eq!(aig.bad, vec![2]);
    }

    #[test]
    fn rejects_an_invalid_reset() {
        let err = parse_ascii("aag 2 0 2 0 0\n2 2 4\n4 4\n").unwrap_err();
        assert!(matches!(err, ParseError::InvalidStructure { .. }));
    }

    #[test]
    fn parses_and_gates() {
        let aig = parse_ascii("aag 3 2 0 1 1\n2\n4\n6\n6 4 2\n").unwrap();

        assert_eq!(aig.inputs, vec![2, 4]);
        assert_eq!(
            aig.ands,
            vec![AndGate {
                lhs: 6,
                rhs0: 4,
                rhs1: 2
            }]
        );
    }

    #[test]
    fn skips_symbols_and_comments() {
        let source = "aag 1 1 0 1 0\n2\n2\ni0 request\no0 grant\nc\nanything goes here\n";
        let aig = parse_ascii(source).unwrap();

        assert_eq!(aig.inputs, vec![2]);
        assert_eq!(aig.outputs, vec![2]);
    }

    #[test]
    fn rejects_garbage_headers() {
        for source in ["", "nonsense\n", "aag x y\n", "aag 1 2\n"] {
            assert!(matches!(
                parse_ascii(source),
                Err(ParseError::InvalidHeader { .. }) | Err(ParseError::UnexpectedEof { .. })
                    | Err(ParseError::InvalidToken { .. })
            ));
        }
    }

    #[test]
    fn parses_constraint_justice_and_fairness_sections() {
        // One invariant constraint.
        let aig = parse_ascii("aag 1 0 1 0 0 1 1\n2 2\n2\n3\n").unwrap();
        assert_eq!(aig.bad, vec![2]);
        assert_eq!(aig.constraints, vec![3]);

        // One justice property of two literals.
        let aig = parse_ascii("aag 1 0 1 0 0 0 0 1\n2 2\n2\n2\n3\n").unwrap();
        assert_eq!(aig.justice, vec![vec![2, 3]]);

        // One fairness constraint.
        let aig = parse_ascii("aag 1 0 1 0 0 1 0 0 1\n2 2\n2\n3\n").unwrap();
        assert_eq!(aig.bad, vec![2]);
        assert_eq!(aig.fairness, vec![3]);
    }

    #[test]
    fn truncated_justice_sections_are_rejected() {
        // The size line promises two literals but only one follows.
        let err = parse_ascii("aag 1 0 1 0 0 0 0 1\n2 2\n2\n2\n").unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedEof { .. }));
    }

    #[test]
    fn rejects_truncated_files() {
        let err = parse_ascii("aag 3 2 0 1 1\n2\n4\n").unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedEof { .. }));
    }

    #[test]
    fn rejects_out_of_range_literals() {
        let err = parse_ascii("aag 1 1 0 1 0\n2\n4\n").unwrap_err();
        assert!(matches!(err, ParseError::LiteralOutOfRange { .. }));
    }

    #[test]
    fn rejects_redefined_nodes() {
        let err = parse_ascii("aag 2 2 0 0 0\n2\n2\n").unwrap_err();
        assert!(matches!(err, ParseError::MalformedCircuit { .. }));
    }

    #[test]
    fn parses_the_binary_format() {
        let mut bytes = b"aig 3 2 0 1 1\n6\n".to_vec();
        // lhs = 6, rhs0 = 6 - 2 = 4, rhs1 = 4 - 2 = 2.
        bytes.extend_from_slice(&[0x02, 0x02]);

        let aig = parse_binary(&bytes).unwrap();

        assert_eq!(aig.inputs, vec![2, 4]);
        assert_eq!(aig.outputs, vec![6]);
        assert_eq!(
            aig.ands,
            vec![AndGate {
                lhs: 6,
                rhs0: 4,
                rhs1: 2
            }]
        );
    }

    #[test]
    fn binary_deltas_use_seven_bit_groups() {
        // A single gate over 130 inputs exercises the continuation bit:
        // lhs = 264, rhs0 = 264 - 200 = 64, rhs1 = 64 - 1 = 63.
        let mut bytes = b"aig 131 130 0 1 1\n264\n".to_vec();
        bytes.extend_from_slice(&[0xc8, 0x01, 0x01]);

        let aig = parse_binary(&bytes).unwrap();

        assert_eq!(aig.ands.len(), 1);
        assert_eq!(
            aig.ands[0],
            AndGate {
                lhs: 264,
                rhs0: 64,
                rhs1: 63
            }
        );
    }

    #[test]
    fn dispatches_on_the_magic_word() {
        let ascii = parse(b"aag 1 1 0 1 0\n2\n3\n").unwrap();
        assert_eq!(ascii.outputs, vec![aiger_not(2)]);

        let binary = parse(b"aig 1 1 0 1 0\n2\n").unwrap();
        assert_eq!(binary.inputs, vec![2]);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// The reader returns an error on malformed input instead
            /// of panicking.
            #[test]
            fn never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
                let _ = parse(&bytes);
            }

            /// Headers with declared but missing bodies always error
            /// out instead of producing a truncated circuit.
            #[test]
            fn truncated_bodies_are_rejected(inputs in 1u32..8, latches in 1u32..8) {
                let source = format!("aag {} {inputs} {latches} 0 0\n", inputs + latches);
                prop_assert!(parse_ascii(&source).is_err());
            }
        }
    }
}
