pub mod access;
pub mod config;
pub mod db;
pub mod model;
pub mod ops;
pub mod order;
pub mod output;
pub mod paths;
pub mod router;
pub mod subscribe;
pub mod suggest;
pub mod tui;
pub mod validate;
pub mod watch;
