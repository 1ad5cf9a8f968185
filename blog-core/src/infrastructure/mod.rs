pub mod database;
pub mod logging;
pub mod password;
pub mod settings;
