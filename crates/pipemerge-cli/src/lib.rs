//! Library components of the pipemerge command-line tool.

pub mod logging;
