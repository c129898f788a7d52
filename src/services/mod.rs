pub mod preference;
pub mod recommendation;
pub mod session;
pub mod store;
