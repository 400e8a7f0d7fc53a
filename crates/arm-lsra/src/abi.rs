//! Target ABI constants (registers, addressing, frame layout).
//!
//! This module centralizes the machine parameters the allocator depends on
//! so the passes, the spill emitter, and the tests agree on them.

// ── Registers ──

/// General-purpose registers handed out by the allocator (r4-r10).
///
/// r0-r3 are argument/scratch registers owned by the calling convention
/// and r11-r15 have fixed roles, so neither side is allocatable.
pub const ALLOCATABLE_REGS: [u8; 7] = [4, 5, 6, 7, 8, 9, 10];

/// Frame pointer (r11). Base register for spill-slot addressing.
pub const FRAME_POINTER: u8 = 11;

// ── Addressing ──

/// Largest immediate offset a load/store can encode directly.
///
/// Displacements outside `[-255, 255]` must be materialized into a
/// register first.
pub const MAX_LOAD_STORE_OFFSET: i32 = 255;

// ── Frame layout ──

/// Size of one spill slot in bytes.
pub const SPILL_SLOT_BYTES: u32 = 4;

/// Ceiling on the per-function stack frame. `Function::alloc_stack`
/// refuses requests that would push the frame past this.
pub const MAX_FRAME_BYTES: u32 = 1024 * 1024;
