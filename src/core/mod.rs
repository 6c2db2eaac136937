pub mod context;
pub mod env;
pub mod helpers;
pub mod key;
