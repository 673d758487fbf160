// ── EWEF Atoms Layer ───────────────────────────────────────────────────────
// Pure data: types, constants, errors, collaborator traits, weight tables.
// Zero side effects, no I/O.
// Dependency rule: atoms may only depend on std and external pure crates.
// Nothing here may import from engine/.

pub mod constants;
pub mod error;
pub mod traits;
pub mod types;
pub mod weights;
