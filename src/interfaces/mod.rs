pub mod csv;
pub mod demo;
