pub mod db;
pub mod loader;
pub mod logging;
pub mod parser;
