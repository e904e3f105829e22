pub mod cli;
pub mod clock;
pub mod conf;
pub mod logging;
pub mod store;
pub mod tail;
pub mod tally;
