pub mod constants;
pub mod defaults;
