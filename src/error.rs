use std::{error::Error, fmt, num::ParseIntError};

use miette::{miette, LabeledSpan, Report, Severity};

use crate::{
    opcode::{UnknownMnemonic, MAX_VALUE},
    span::{line_of, Span},
    unit::MEMORY_SIZE,
};

/// Error raised by the assembly unit while laying out a program.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AsmError {
    DuplicateVariable { name: String },
    DuplicateJumpPoint { name: String },
    /// Variable used before (or without) being declared
    VariableNotDeclared { name: String },
    /// Every jump target that was never declared, in order of first use
    UnresolvedJumps { names: Vec<String> },
    /// Program needs `required` words but memory only has `MEMORY_SIZE`
    CapacityOverflow { required: usize },
    ValueOutOfRange { value: u16 },
}

impl Error for AsmError {}

impl fmt::Display for AsmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AsmError::DuplicateVariable { name } => {
                write!(f, "Variable cannot be defined twice: `{}`", name)
            }
            AsmError::DuplicateJumpPoint { name } => {
                write!(f, "Jump point cannot be defined twice: `{}`", name)
            }
            AsmError::VariableNotDeclared { name } => {
                write!(f, "Variable used before declaration: `{}`", name)
            }
            AsmError::UnresolvedJumps { names } => {
                let names = names
                    .iter()
                    .map(|name| format!("`{name}`"))
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "Jumps to undeclared jump points: {}", names)
            }
            AsmError::CapacityOverflow { required } => {
                write!(
                    f,
                    "Program needs {} words, memory holds {}",
                    required, MEMORY_SIZE
                )
            }
            AsmError::ValueOutOfRange { value } => {
                write!(f, "Value {} does not fit in a memory cell", value)
            }
        }
    }
}

/// Prefix for messages pointing at a single source line.
fn at_line(src: &str, span: Span) -> String {
    let (number, text) = line_of(src, span);
    format!("line {number}: `{}`", text.trim())
}

// Lexer errors

pub fn lex_unknown(span: Span, src: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "lex::unknown",
        help = "comments start with //, variables with #",
        labels = vec![LabeledSpan::at(span, "unknown token")],
        "Encountered an unknown token at {}",
        at_line(src, span),
    )
    .with_source_code(src.to_string())
}

// Parser errors

pub fn parse_too_many_parts(span: Span, src: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "parse::too_many_parts",
        help = "a line holds at most a mnemonic and one operand",
        labels = vec![LabeledSpan::at(span, "unexpected operand")],
        "Too many parts at {}",
        at_line(src, span),
    )
    .with_source_code(src.to_string())
}

pub fn parse_bad_lit(span: Span, src: &str, e: Option<ParseIntError>) -> Report {
    let reason = match e {
        Some(e) => e.to_string(),
        None => format!("larger than {MAX_VALUE}"),
    };
    miette!(
        severity = Severity::Error,
        code = "parse::bad_lit",
        help = "values and addresses range from 0 to 999",
        labels = vec![LabeledSpan::at(span, "incorrect literal")],
        "Encountered an invalid literal ({reason}) at {}",
        at_line(src, span),
    )
    .with_source_code(src.to_string())
}

pub fn parse_mnemonic(span: Span, src: &str, e: UnknownMnemonic) -> Report {
    miette!(
        severity = Severity::Error,
        code = "parse::mnemonic",
        help = "available: TAKE, ADD, SUB, SAVE, JMP, TST, INC, DEC, NULL, HLT",
        labels = vec![LabeledSpan::at(span, "unknown mnemonic")],
        "{e} at {}",
        at_line(src, span),
    )
    .with_source_code(src.to_string())
}

pub fn parse_unexpected(span: Span, src: &str, expected: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "parse::unexpected_token",
        help = format!("expected {expected}"),
        labels = vec![LabeledSpan::at(span, "unexpected token")],
        "Malformed statement at {}",
        at_line(src, span),
    )
    .with_source_code(src.to_string())
}

// Assembly errors

/// Lift an error from the assembly unit into a diagnostic. `spans` label the
/// statements responsible for it.
pub fn asm_error(e: AsmError, spans: &[Span], src: &str) -> Report {
    let (code, help, label) = match &e {
        AsmError::DuplicateVariable { .. } => (
            "asm::duplicate_variable",
            "variables may only be declared once per file",
            "duplicate variable",
        ),
        AsmError::DuplicateJumpPoint { .. } => (
            "asm::duplicate_jump_point",
            "jump points may only be declared once per file",
            "duplicate jump point",
        ),
        AsmError::VariableNotDeclared { .. } => (
            "asm::undeclared_variable",
            "declare the variable with `#name value` above its first use",
            "undeclared variable",
        ),
        AsmError::UnresolvedJumps { .. } => (
            "asm::unresolved_jumps",
            "declare the jump point with `name:` anywhere in the file",
            "unresolved jump",
        ),
        AsmError::CapacityOverflow { .. } => (
            "asm::capacity",
            "shorten the program or use fewer variables",
            "does not fit",
        ),
        AsmError::ValueOutOfRange { .. } => (
            "asm::value_range",
            "values range from 0 to 999",
            "value out of range",
        ),
    };
    let labels: Vec<LabeledSpan> = spans
        .iter()
        .map(|&span| LabeledSpan::at(span, label))
        .collect();
    let message = match spans {
        [span] => format!("{e} at {}", at_line(src, *span)),
        _ => e.to_string(),
    };
    miette!(
        severity = Severity::Error,
        code = code,
        help = help,
        labels = labels,
        "{message}",
    )
    .with_source_code(src.to_string())
}
