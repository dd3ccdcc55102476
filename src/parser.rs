use fxhash::FxBuildHasher;
use indexmap::IndexMap;
use miette::Result;

use crate::{
    error::{self, AsmError},
    lexer::{tokenize, Token, TokenKind},
    opcode::{Opcode, Word, MAX_VALUE},
    span::Span,
    unit::{AsmUnit, MemoryImage},
};

/// Feeds the statements of a JohnnyScript source into an [`AsmUnit`], one line at a time.
pub struct AsmParser<'a> {
    /// Reference to the source file
    src: &'a str,
    unit: AsmUnit,
    /// Where each jump target is used, for reporting unresolved jumps
    jump_sites: IndexMap<&'a str, Vec<Span>, FxBuildHasher>,
}

impl<'a> AsmParser<'a> {
    pub fn new(src: &'a str) -> Self {
        AsmParser {
            src,
            unit: AsmUnit::new(),
            jump_sites: IndexMap::default(),
        }
    }

    /// Parse every line and lay out the program. Stops at the first syntax, declaration or
    /// reference error.
    pub fn parse(mut self) -> Result<MemoryImage> {
        let mut line: Vec<Token> = Vec::new();
        for tok in tokenize(self.src) {
            match tok.kind {
                TokenKind::Newline => {
                    self.parse_line(&line)?;
                    line.clear();
                }
                TokenKind::Unknown => return Err(error::lex_unknown(tok.span, self.src)),
                kind if kind.is_trivia() => {}
                _ => line.push(tok),
            }
        }
        self.parse_line(&line)?;

        let AsmParser {
            src,
            unit,
            jump_sites,
        } = self;
        unit.finish().map_err(|e| {
            let spans: Vec<Span> = match &e {
                AsmError::UnresolvedJumps { names } => names
                    .iter()
                    .filter_map(|name| jump_sites.get(name.as_str()))
                    .flatten()
                    .copied()
                    .collect(),
                _ => Vec::new(),
            };
            error::asm_error(e, &spans, src)
        })
    }

    fn get_span(&self, span: Span) -> &'a str {
        &self.src[span.as_range()]
    }

    /// Dispatch a single line, given without whitespace or comments.
    fn parse_line(&mut self, toks: &[Token]) -> Result<()> {
        use TokenKind::*;

        let (Some(first), Some(last)) = (toks.first(), toks.last()) else {
            return Ok(());
        };
        let stmt = first.span.to(last.span);

        let res = match toks {
            [Token { kind: Ident, span }, Token { kind: Colon, .. }] => {
                let name = self.get_span(*span);
                self.unit.declare_jump_point(name)
            }
            [var @ Token { kind: Var, .. }, Token { kind: Int, span }] => {
                let name = self.var_name(var)?;
                let value = self.expect_lit(*span)?;
                self.unit.declare_variable(name, value)
            }
            [Token { kind: Int, span }] => {
                let value = self.expect_lit(*span)?;
                self.unit.emit_code(Word::data(value));
                Ok(())
            }
            [Token { kind: Ident, span }] => {
                let op = self.expect_opcode(*span)?;
                self.unit.emit_code(Word::instr(op, 0));
                Ok(())
            }
            [Token { kind: Ident, span }, Token {
                kind: Ident,
                span: target,
            }] => {
                let op = self.expect_opcode(*span)?;
                if op != Opcode::Jmp {
                    return Err(error::parse_unexpected(
                        *target,
                        self.src,
                        "an address or a #variable",
                    ));
                }
                let target = *target;
                let name = self.get_span(target);
                self.jump_sites.entry(name).or_default().push(target);
                self.unit.emit_jump(name);
                Ok(())
            }
            [Token { kind: Ident, span }, var @ Token { kind: Var, .. }] => {
                let op = self.expect_opcode(*span)?;
                let name = self.var_name(var)?;
                self.unit.emit_code_with_variable(op, name)
            }
            [Token { kind: Ident, span }, Token { kind: Int, span: addr }] => {
                let op = self.expect_opcode(*span)?;
                let addr = self.expect_lit(*addr)?;
                self.unit.emit_code(Word::instr(op, addr));
                Ok(())
            }
            [_, _, extra, ..] => {
                return Err(error::parse_too_many_parts(extra.span.to(last.span), self.src))
            }
            [_, second] => {
                return Err(error::parse_unexpected(
                    second.span,
                    self.src,
                    "`MNEMONIC operand`, `#name value` or `name:`",
                ))
            }
            [first] => {
                return Err(error::parse_unexpected(
                    first.span,
                    self.src,
                    "a mnemonic, a value or `name:`",
                ))
            }
            [] => unreachable!("empty lines return early"),
        };
        res.map_err(|e| error::asm_error(e, &[stmt], self.src))
    }

    /// Name of a `#name` token, without the leading `#`.
    fn var_name(&self, tok: &Token) -> Result<&'a str> {
        let name = &self.get_span(tok.span)[1..];
        if name.is_empty() {
            return Err(error::parse_unexpected(
                tok.span,
                self.src,
                "a variable name after `#`",
            ));
        }
        Ok(name)
    }

    fn expect_opcode(&self, span: Span) -> Result<Opcode> {
        self.get_span(span)
            .parse()
            .map_err(|e| error::parse_mnemonic(span, self.src, e))
    }

    /// Decimal literal that fits in a memory cell.
    fn expect_lit(&self, span: Span) -> Result<u16> {
        match self.get_span(span).parse::<u16>() {
            Ok(val) if val <= MAX_VALUE => Ok(val),
            Ok(_) => Err(error::parse_bad_lit(span, self.src, None)),
            Err(e) => Err(error::parse_bad_lit(span, self.src, Some(e))),
        }
    }
}
