pub mod application;
pub mod auth;
pub mod common;
pub mod locker;
pub mod reminder;

pub use application::*;
pub use auth::*;
pub use common::*;
pub use locker::*;
pub use reminder::*;
