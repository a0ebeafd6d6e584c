pub mod enums;
pub mod script;
