pub mod console;
pub mod narrator;
pub mod session;
