use fxhash::FxBuildHasher;
use indexmap::IndexMap;

use crate::{
    error::AsmError,
    opcode::{Opcode, Word, MAX_VALUE},
};

/// Number of words in Johnny memory.
pub const MEMORY_SIZE: usize = 1000;

// Insertion-ordered, so variables keep their declaration order
type FxMap<K, V> = IndexMap<K, V, FxBuildHasher>;

/// Position within the emitted code, before variables are laid out in front of it.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct CodeOffs(pub usize);

/// Word of code as emitted during the scan.
#[derive(Clone, PartialEq, Eq, Debug)]
enum CodeWord {
    Resolved(Word),
    /// Jump to the named jump point, filled in by `finish`
    Jump(String),
}

/// Jump waiting for its target to be known.
#[derive(Clone, PartialEq, Eq, Debug)]
struct JumpRef {
    target: String,
    offs: CodeOffs,
}

/// Collects variables, jump points and code during a single scan over the source, then lays
/// them out into a [`MemoryImage`].
///
/// Variables must be declared before they are referenced. Jumps may refer to jump points
/// declared anywhere, so they are only checked once the whole source has been seen.
#[derive(Default, Debug)]
pub struct AsmUnit {
    /// Name -> initial value, in declaration order
    variables: FxMap<String, u16>,
    /// Name -> offset of the word following the declaration
    jump_points: FxMap<String, CodeOffs>,
    code: Vec<CodeWord>,
    jumps: Vec<JumpRef>,
}

impl AsmUnit {
    pub fn new() -> Self {
        AsmUnit::default()
    }

    /// Declare a variable, giving it the next free storage slot.
    pub fn declare_variable(&mut self, name: &str, value: u16) -> Result<(), AsmError> {
        if self.variables.contains_key(name) {
            return Err(AsmError::DuplicateVariable {
                name: name.to_string(),
            });
        }
        if value > MAX_VALUE {
            return Err(AsmError::ValueOutOfRange { value });
        }
        self.variables.insert(name.to_string(), value);
        Ok(())
    }

    pub fn emit_code(&mut self, word: Word) {
        self.code.push(CodeWord::Resolved(word));
    }

    /// Emit `op` addressing the storage slot of an already declared variable.
    pub fn emit_code_with_variable(&mut self, op: Opcode, name: &str) -> Result<(), AsmError> {
        let slot = self
            .slot_of(name)
            .ok_or_else(|| AsmError::VariableNotDeclared {
                name: name.to_string(),
            })?;
        self.emit_code(Word::instr(op, slot));
        Ok(())
    }

    /// Mark the position of the next emitted word as a jump target.
    pub fn declare_jump_point(&mut self, name: &str) -> Result<(), AsmError> {
        if self.jump_points.contains_key(name) {
            return Err(AsmError::DuplicateJumpPoint {
                name: name.to_string(),
            });
        }
        self.jump_points
            .insert(name.to_string(), CodeOffs(self.code.len()));
        Ok(())
    }

    pub fn emit_jump(&mut self, target: &str) {
        self.jumps.push(JumpRef {
            target: target.to_string(),
            offs: CodeOffs(self.code.len()),
        });
        self.code.push(CodeWord::Jump(target.to_string()));
    }

    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    pub fn code_len(&self) -> usize {
        self.code.len()
    }

    /// Memory address holding the variable. Slots start at 1, word 0 is the entry jump.
    pub fn slot_of(&self, name: &str) -> Option<u16> {
        self.variables
            .get_index_of(name)
            .map(|idx| (idx + 1) as u16)
    }

    pub fn jump_point(&self, name: &str) -> Option<CodeOffs> {
        self.jump_points.get(name).copied()
    }

    /// Lay out the program and resolve all jumps.
    ///
    /// Memory starts with a jump over the variables, followed by the variables in declaration
    /// order, followed by the code. Every jump to an undeclared jump point is reported at once.
    pub fn finish(self) -> Result<MemoryImage, AsmError> {
        let vars = self.variables.len();
        let required = 1 + vars + self.code.len();
        if required > MEMORY_SIZE {
            return Err(AsmError::CapacityOverflow { required });
        }
        let code_start = 1 + vars;
        let mut words = vec![Word::EMPTY; MEMORY_SIZE];

        words[0] = Word::instr(Opcode::Jmp, code_start as u16);
        for (i, &value) in self.variables.values().enumerate() {
            words[1 + i] = Word::data(value);
        }
        for (i, word) in self.code.iter().enumerate() {
            if let CodeWord::Resolved(word) = word {
                words[code_start + i] = *word;
            }
        }

        let mut unresolved: Vec<String> = Vec::new();
        for jump in &self.jumps {
            match self.jump_points.get(&jump.target) {
                Some(CodeOffs(dest)) => {
                    // Jump point after the last word of a full memory points past the end
                    let addr = code_start + dest;
                    if addr > MAX_VALUE as usize {
                        return Err(AsmError::CapacityOverflow { required: addr + 1 });
                    }
                    words[code_start + jump.offs.0] = Word::instr(Opcode::Jmp, addr as u16);
                }
                None if unresolved.contains(&jump.target) => {}
                None => unresolved.push(jump.target.clone()),
            }
        }
        if !unresolved.is_empty() {
            return Err(AsmError::UnresolvedJumps { names: unresolved });
        }

        Ok(MemoryImage { words })
    }
}

/// Final contents of Johnny memory, always `MEMORY_SIZE` words long.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct MemoryImage {
    words: Vec<Word>,
}

impl MemoryImage {
    pub fn get(&self, addr: usize) -> Option<&Word> {
        self.words.get(addr)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn words(&self) -> &[Word] {
        &self.words
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Word> {
        self.words.iter()
    }
}

impl<'a> IntoIterator for &'a MemoryImage {
    type Item = &'a Word;
    type IntoIter = std::slice::Iter<'a, Word>;

    fn into_iter(self) -> Self::IntoIter {
        self.words.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jmp(addr: u16) -> Word {
        Word::instr(Opcode::Jmp, addr)
    }

    fn assert_empty_from(image: &MemoryImage, start: usize) {
        assert!(image.words()[start..].iter().all(Word::is_empty));
    }

    #[test]
    fn empty_program() {
        let image = AsmUnit::new().finish().unwrap();
        assert_eq!(image.len(), MEMORY_SIZE);
        assert_eq!(image.get(0), Some(&jmp(1)));
        assert_eq!(image.get(0).unwrap().to_string(), "5001");
        assert_empty_from(&image, 1);
    }

    #[test]
    fn single_variable() {
        let mut unit = AsmUnit::new();
        unit.declare_variable("tst", 5).unwrap();
        let image = unit.finish().unwrap();
        assert_eq!(image.get(0).unwrap().to_string(), "5002");
        assert_eq!(image.get(1).unwrap().to_string(), "005");
        assert_empty_from(&image, 2);
    }

    #[test]
    fn plain_code() {
        let mut unit = AsmUnit::new();
        unit.emit_code(Word::instr(Opcode::Add, 1));
        let image = unit.finish().unwrap();
        assert_eq!(image.get(0), Some(&jmp(1)));
        assert_eq!(image.get(1).unwrap().to_string(), "2001");
        assert_empty_from(&image, 2);
    }

    #[test]
    fn variable_reference() {
        let mut unit = AsmUnit::new();
        unit.declare_variable("tst", 5).unwrap();
        unit.emit_code_with_variable(Opcode::Add, "tst").unwrap();
        let image = unit.finish().unwrap();
        assert_eq!(image.get(0).unwrap().to_string(), "5002");
        assert_eq!(image.get(1).unwrap().to_string(), "005");
        assert_eq!(image.get(2).unwrap().to_string(), "2001");
        assert_empty_from(&image, 3);
    }

    #[test]
    fn variable_reference_without_declaration() {
        let mut unit = AsmUnit::new();
        assert_eq!(
            unit.emit_code_with_variable(Opcode::Add, "tst"),
            Err(AsmError::VariableNotDeclared { name: "tst".into() })
        );
        assert_eq!(unit.code_len(), 0);
    }

    #[test]
    fn variable_declared_after_use() {
        let mut unit = AsmUnit::new();
        assert!(unit.emit_code_with_variable(Opcode::Take, "x").is_err());
        unit.declare_variable("x", 1).unwrap();
        assert!(unit.emit_code_with_variable(Opcode::Take, "x").is_ok());
    }

    #[test]
    fn duplicate_variable() {
        let mut unit = AsmUnit::new();
        unit.declare_variable("tst", 5).unwrap();
        assert_eq!(
            unit.declare_variable("tst", 8),
            Err(AsmError::DuplicateVariable { name: "tst".into() })
        );
        assert_eq!(unit.variable_count(), 1);
    }

    #[test]
    fn variable_value_too_large() {
        let mut unit = AsmUnit::new();
        assert_eq!(
            unit.declare_variable("big", 1000),
            Err(AsmError::ValueOutOfRange { value: 1000 })
        );
        assert!(unit.declare_variable("max", 999).is_ok());
    }

    #[test]
    fn jump_after_jump_point() {
        let mut unit = AsmUnit::new();
        unit.declare_jump_point("tst").unwrap();
        unit.emit_jump("tst");
        let image = unit.finish().unwrap();
        assert_eq!(image.get(0).unwrap().to_string(), "5001");
        assert_eq!(image.get(1).unwrap().to_string(), "5001");
        assert_empty_from(&image, 2);
    }

    #[test]
    fn jump_before_jump_point() {
        let mut unit = AsmUnit::new();
        unit.emit_jump("tst");
        unit.declare_jump_point("tst").unwrap();
        unit.emit_code(Word::instr(Opcode::Hlt, 0));
        let image = unit.finish().unwrap();
        assert_eq!(image.get(0).unwrap().to_string(), "5001");
        // Jump point marks the word following it, not the jump itself
        assert_eq!(image.get(1), Some(&jmp(2)));
        assert_eq!(image.get(2).unwrap().to_string(), "10000");
        assert_empty_from(&image, 3);
    }

    #[test]
    fn jump_point_after_last_word() {
        let mut unit = AsmUnit::new();
        unit.declare_variable("x", 4).unwrap();
        unit.emit_jump("end");
        unit.emit_code(Word::instr(Opcode::Inc, 1));
        unit.declare_jump_point("end").unwrap();
        let image = unit.finish().unwrap();
        // 1 + V + C = 4, the first unused word
        assert_eq!(image.get(2), Some(&jmp(4)));
        assert_eq!(image.get(4), Some(&Word::EMPTY));
        assert_empty_from(&image, 4);
    }

    #[test]
    fn jump_point_past_full_memory() {
        let mut unit = AsmUnit::new();
        unit.emit_jump("end");
        for _ in 0..998 {
            unit.emit_code(Word::instr(Opcode::Inc, 1));
        }
        unit.declare_jump_point("end").unwrap();
        assert_eq!(unit.code_len(), 999);
        assert_eq!(
            unit.finish(),
            Err(AsmError::CapacityOverflow { required: 1001 })
        );
    }

    #[test]
    fn jump_point_at_last_word() {
        let mut unit = AsmUnit::new();
        unit.emit_jump("end");
        for _ in 0..997 {
            unit.emit_code(Word::instr(Opcode::Inc, 1));
        }
        unit.declare_jump_point("end").unwrap();
        unit.emit_code(Word::instr(Opcode::Hlt, 0));
        let image = unit.finish().unwrap();
        assert_eq!(image.get(1), Some(&jmp(999)));
        assert_eq!(image.get(999), Some(&Word::instr(Opcode::Hlt, 0)));
    }

    #[test]
    fn jump_targets_shift_with_variables() {
        let mut unit = AsmUnit::new();
        unit.emit_code(Word::instr(Opcode::Inc, 0));
        unit.declare_jump_point("here").unwrap();
        unit.emit_jump("here");
        unit.declare_variable("a", 1).unwrap();
        unit.declare_variable("b", 2).unwrap();
        let image = unit.finish().unwrap();
        // Code starts at 3, jump point sits at code offset 1
        assert_eq!(image.get(0), Some(&jmp(3)));
        assert_eq!(image.get(4), Some(&jmp(4)));
    }

    #[test]
    fn duplicate_jump_point() {
        let mut unit = AsmUnit::new();
        unit.declare_jump_point("tst").unwrap();
        assert_eq!(
            unit.declare_jump_point("tst"),
            Err(AsmError::DuplicateJumpPoint { name: "tst".into() })
        );
    }

    #[test]
    fn variables_and_jump_points_are_separate() {
        let mut unit = AsmUnit::new();
        unit.declare_variable("x", 0).unwrap();
        assert!(unit.declare_jump_point("x").is_ok());
    }

    #[test]
    fn unresolved_jumps_are_collected() {
        let mut unit = AsmUnit::new();
        unit.emit_jump("first");
        unit.emit_jump("known");
        unit.emit_jump("second");
        unit.emit_jump("first");
        unit.declare_jump_point("known").unwrap();
        assert_eq!(
            unit.finish(),
            Err(AsmError::UnresolvedJumps {
                names: vec!["first".into(), "second".into()]
            })
        );
    }

    #[test]
    fn capacity_overflow() {
        let mut unit = AsmUnit::new();
        unit.declare_variable("x", 0).unwrap();
        for _ in 0..998 {
            unit.emit_code(Word::instr(Opcode::Inc, 1));
        }
        let full = unit.finish().unwrap();
        assert_eq!(full.len(), MEMORY_SIZE);
        assert_eq!(full.get(999), Some(&Word::instr(Opcode::Inc, 1)));

        let mut unit = AsmUnit::new();
        unit.declare_variable("x", 0).unwrap();
        for _ in 0..999 {
            unit.emit_jump("nowhere");
        }
        // Capacity is checked before jumps are resolved
        assert_eq!(
            unit.finish(),
            Err(AsmError::CapacityOverflow { required: 1001 })
        );
    }

    #[test]
    fn program() {
        let mut unit = AsmUnit::new();
        unit.declare_variable("z3", 0).unwrap();
        unit.emit_code_with_variable(Opcode::Null, "z3").unwrap();
        unit.declare_jump_point("start").unwrap();
        unit.emit_code_with_variable(Opcode::Take, "z3").unwrap();
        unit.declare_variable("z1", 5).unwrap();
        unit.emit_code_with_variable(Opcode::Add, "z1").unwrap();
        unit.declare_variable("z2", 3).unwrap();
        unit.emit_code_with_variable(Opcode::Save, "z2").unwrap();
        unit.emit_code_with_variable(Opcode::Dec, "z1").unwrap();
        unit.emit_code_with_variable(Opcode::Tst, "z1").unwrap();
        unit.emit_jump("start");
        unit.emit_code(Word::instr(Opcode::Hlt, 0));

        assert_eq!(unit.slot_of("z1"), Some(2));
        assert_eq!(unit.jump_point("start"), Some(CodeOffs(1)));

        let image = unit.finish().unwrap();
        let expected = [
            "5004", "000", "005", "003", "9001", "1001", "2002", "4003", "8002", "6002", "5005",
            "10000",
        ];
        for (addr, word) in expected.iter().enumerate() {
            assert_eq!(&image.get(addr).unwrap().to_string(), word, "word {addr}");
        }
        assert_empty_from(&image, expected.len());
    }
}
