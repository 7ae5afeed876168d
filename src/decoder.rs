use std::sync::Arc;

use thiserror::Error;

use crate::opcodes::{Opcode, get_opcode};

const JUMPDEST: u8 = 0x5b;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DecoderError {
    #[error("Invalid opcode 0x{0:02x} found at position {1}")]
    InvalidOpcode(u8, usize),
    #[error("Unexpected end of bytecode after {0} instruction at position {1}")]
    UnexpectedEndOfBytecode(String, usize),
}

#[derive(Debug)]
pub struct Instruction {
    pub opcode: Opcode,
    pub offset: usize,
    pub argument: Option<Vec<u8>>,
}

impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04x}: {}", self.offset, self.opcode.name())?;
        if let Some(arg) = &self.argument {
            write!(f, " 0x{}", hex::encode(arg))?;
        }
        Ok(())
    }
}

/// Code together with its valid jump destinations.
#[derive(Clone, Debug, Default)]
pub struct Bytecode {
    code: Arc<[u8]>,
    jumpdests: Vec<bool>,
}

impl Bytecode {
    /// Marks every JUMPDEST byte that is not inside a PUSH immediate.
    pub fn analyze(code: Arc<[u8]>) -> Self {
        let mut jumpdests = vec![false; code.len()];
        let mut pos = 0;
        while pos < code.len() {
            let byte = code[pos];
            if byte == JUMPDEST {
                jumpdests[pos] = true;
            }
            pos += 1 + get_opcode(byte).push_width();
        }
        Self { code, jumpdests }
    }

    pub fn is_jumpdest(&self, offset: usize) -> bool {
        self.jumpdests.get(offset).copied().unwrap_or_default()
    }

    pub fn code(&self) -> &[u8] {
        &self.code
    }

    pub fn shared(&self) -> Arc<[u8]> {
        self.code.clone()
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }
}

pub struct Decoder;

impl Decoder {
    /// Disassembles `code`. Truncated PUSH immediates at the end are an error
    /// here, although execution treats the missing bytes as zeros.
    pub fn decode(code: &[u8]) -> Result<Vec<Instruction>, DecoderError> {
        let mut instructions = Vec::new();

        let mut pos = 0;
        while pos < code.len() {
            let opcode = get_opcode(code[pos]);
            if !opcode.is_defined() {
                return Err(DecoderError::InvalidOpcode(code[pos], pos));
            }
            let mut instruction = Instruction {
                opcode,
                offset: pos,
                argument: None,
            };

            pos += 1;

            let push_bytes = opcode.push_width();
            if push_bytes > 0 {
                let end = pos + push_bytes;
                if end > code.len() {
                    return Err(DecoderError::UnexpectedEndOfBytecode(opcode.name(), pos));
                }
                instruction.argument = Some(code[pos..end].to_vec());
                pos = end;
            }

            instructions.push(instruction);
        }

        Ok(instructions)
    }
}
