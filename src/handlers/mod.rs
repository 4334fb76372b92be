//! Command handlers, one module per subcommand.

pub mod fill;
pub mod history;
pub mod init;
pub mod load;
pub mod marks;
pub mod status;
