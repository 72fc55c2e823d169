pub mod absolute;
pub mod origin;
