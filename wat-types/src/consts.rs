//! Fixed bounds for the interpreter. Not user-configurable in this scope.

/// Size in bytes of a single linear memory page.
pub const WASM_PAGE_SIZE: usize = 64 * 1024;

/// Maximum total number of values that may live on the operand stack at once,
/// summed across every frame.
pub const MAX_STACK_SLOTS: usize = 1024;
