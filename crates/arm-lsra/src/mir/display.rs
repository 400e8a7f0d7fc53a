use std::fmt;

use crate::abi;

use super::{BinaryOp, Cond, Function, Inst, InstKind, Operand};

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::VReg(v) => write!(f, "v{v}"),
            Operand::PReg(r) if *r == abi::FRAME_POINTER => write!(f, "fp"),
            Operand::PReg(r) => write!(f, "r{r}"),
            Operand::Imm(i) => write!(f, "#{i}"),
            Operand::Label(l) => write!(f, ".L{l}"),
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::Div => "sdiv",
            BinaryOp::And => "and",
            BinaryOp::Orr => "orr",
            BinaryOp::Eor => "eor",
            BinaryOp::Lsl => "lsl",
            BinaryOp::Asr => "asr",
        };
        f.write_str(name)
    }
}

impl fmt::Display for Cond {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Cond::Eq => "eq",
            Cond::Ne => "ne",
            Cond::Lt => "lt",
            Cond::Le => "le",
            Cond::Gt => "gt",
            Cond::Ge => "ge",
        };
        f.write_str(name)
    }
}

impl fmt::Display for Inst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.kind, self.defs.as_slice(), self.uses.as_slice()) {
            (InstKind::Mov, [d], [u]) => write!(f, "mov {d}, {u}"),
            (InstKind::Binary(op), [d], [l, r]) => write!(f, "{op} {d}, {l}, {r}"),
            (InstKind::Load, [d], [Operand::Imm(i)]) => write!(f, "ldr {d}, ={i}"),
            (InstKind::Load, [d], [b]) => write!(f, "ldr {d}, [{b}]"),
            (InstKind::Load, [d], [b, x]) => write!(f, "ldr {d}, [{b}, {x}]"),
            (InstKind::Store, [], [s, b, x]) => write!(f, "str {s}, [{b}, {x}]"),
            (InstKind::Cmp, [], [l, r]) => write!(f, "cmp {l}, {r}"),
            (InstKind::Branch(None), [], [t]) => write!(f, "b {t}"),
            (InstKind::Branch(Some(c)), [], [t]) => write!(f, "b{c} {t}"),
            (InstKind::Ret, [], []) => write!(f, "bx lr"),
            _ => write!(f, "<malformed {:?}>", self.kind),
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "func {} {{", self.name)?;
        for b in self.blocks() {
            writeln!(f, ".L{}:", self.block(b).label)?;
            for &id in self.insts(b) {
                writeln!(f, "    {}", self.inst(id))?;
            }
        }
        writeln!(f, "}}")
    }
}
