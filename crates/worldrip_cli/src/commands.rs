pub mod extract;
pub mod schemas;
