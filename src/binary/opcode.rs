use num_derive::FromPrimitive;

/// Opcodes that may appear in a constant initializer.
#[derive(Debug, Clone, Copy, FromPrimitive, PartialEq, Eq)]
pub enum Opcode {
    End = 0x0B,
    I32Const = 0x41,
    I64Const = 0x42,
}
