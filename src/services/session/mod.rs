pub mod driver;
pub mod ledger;
pub mod runner;
pub mod timer;

pub use driver::{GuidedSession, SessionSettings};
pub use runner::{SessionHandle, SessionIntent, SessionRunner};
