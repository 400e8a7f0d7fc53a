use super::{BlockId, Operand, Slot};

/// Three-operand ALU operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    And,
    Orr,
    Eor,
    Lsl,
    Asr,
}

/// Branch conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cond {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstKind {
    /// `mov dst, src`
    Mov,
    /// `<op> dst, lhs, rhs`
    Binary(BinaryOp),
    /// `ldr dst, =imm`, `ldr dst, [base]` or `ldr dst, [base, off]`
    Load,
    /// `str src, [base, off]`
    Store,
    /// `cmp lhs, rhs`
    Cmp,
    /// `b label` / `b<cond> label`
    Branch(Option<Cond>),
    /// `bx lr`
    Ret,
}

/// One machine instruction: a kind plus its operand slots, partitioned into
/// the written (`defs`) and read (`uses`) views.
#[derive(Debug, Clone)]
pub struct Inst {
    pub kind: InstKind,
    pub(crate) defs: Vec<Operand>,
    pub(crate) uses: Vec<Operand>,
    /// Linearization index. Zero until the current allocator round numbers
    /// the instruction; invalidated the moment a new round begins.
    pub no: i32,
    pub(crate) block: BlockId,
}

impl Inst {
    #[must_use]
    pub fn new(kind: InstKind, defs: Vec<Operand>, uses: Vec<Operand>) -> Self {
        Self {
            kind,
            defs,
            uses,
            no: 0,
            block: BlockId::DETACHED,
        }
    }

    #[must_use]
    pub fn mov(dst: Operand, src: Operand) -> Self {
        Self::new(InstKind::Mov, vec![dst], vec![src])
    }

    #[must_use]
    pub fn binary(op: BinaryOp, dst: Operand, lhs: Operand, rhs: Operand) -> Self {
        Self::new(InstKind::Binary(op), vec![dst], vec![lhs, rhs])
    }

    /// `addr` is either a single literal/base operand or a base plus offset.
    #[must_use]
    pub fn load(dst: Operand, addr: Vec<Operand>) -> Self {
        Self::new(InstKind::Load, vec![dst], addr)
    }

    #[must_use]
    pub fn store(src: Operand, base: Operand, off: Operand) -> Self {
        Self::new(InstKind::Store, vec![], vec![src, base, off])
    }

    #[must_use]
    pub fn cmp(lhs: Operand, rhs: Operand) -> Self {
        Self::new(InstKind::Cmp, vec![], vec![lhs, rhs])
    }

    #[must_use]
    pub fn branch(cond: Option<Cond>, target: Operand) -> Self {
        Self::new(InstKind::Branch(cond), vec![], vec![target])
    }

    #[must_use]
    pub fn ret() -> Self {
        Self::new(InstKind::Ret, vec![], vec![])
    }

    /// The block this instruction belongs to.
    #[must_use]
    pub fn block(&self) -> BlockId {
        self.block
    }

    #[must_use]
    pub fn defs(&self) -> &[Operand] {
        &self.defs
    }

    #[must_use]
    pub fn uses(&self) -> &[Operand] {
        &self.uses
    }

    pub fn defs_mut(&mut self) -> &mut [Operand] {
        &mut self.defs
    }

    pub fn uses_mut(&mut self) -> &mut [Operand] {
        &mut self.uses
    }

    #[must_use]
    pub fn operand(&self, slot: Slot) -> &Operand {
        match slot {
            Slot::Def(i) => &self.defs[i],
            Slot::Use(i) => &self.uses[i],
        }
    }

    pub fn operand_mut(&mut self, slot: Slot) -> &mut Operand {
        match slot {
            Slot::Def(i) => &mut self.defs[i],
            Slot::Use(i) => &mut self.uses[i],
        }
    }

    #[must_use]
    pub const fn is_terminating(&self) -> bool {
        matches!(self.kind, InstKind::Branch(_) | InstKind::Ret)
    }
}
