pub mod config;
pub mod csv;
pub mod db;
pub mod pdf;
pub mod security;
