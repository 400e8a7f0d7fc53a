mod builder;
mod display;
mod function;
mod inst;
mod operand;

pub use builder::FunctionBuilder;
pub use function::{Block, BlockId, Function, InstId, MachineUnit};
pub use inst::{BinaryOp, Cond, Inst, InstKind};
pub use operand::{Operand, OperandRef, OperandSet, Slot};
