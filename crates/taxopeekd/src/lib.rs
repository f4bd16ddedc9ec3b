pub mod cli;
pub mod logging;
pub mod preview;
pub mod serve;
