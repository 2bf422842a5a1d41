// Utils compartidos

pub mod constants;
pub mod cookies;
pub mod slug;

pub use constants::*;
pub use cookies::*;
pub use slug::*;
