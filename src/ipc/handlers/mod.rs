pub mod baseline;
pub mod core;
pub mod document;
pub mod principal;
pub mod selection;
pub mod session;
pub mod teacher;
pub mod tutor;
