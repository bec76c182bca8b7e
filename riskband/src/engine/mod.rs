pub mod fusion;
pub mod output;
pub mod signals;
