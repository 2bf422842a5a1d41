// ============================================================================
// STATE MODULE - Store unidireccional (acciones + reducers puros)
// ============================================================================

pub mod actions;
pub mod app_state;
pub mod reducers;
pub mod store;

pub use actions::*;
pub use app_state::*;
pub use reducers::reduce;
pub use store::*;
