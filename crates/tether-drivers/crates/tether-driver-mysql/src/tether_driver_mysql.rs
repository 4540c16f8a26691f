//! MySQL/MariaDB driver implementation

mod connection;
mod driver;
pub mod options;

pub use connection::MySqlConnection;
pub use driver::MySqlDriver;
