pub mod counter;
pub mod hello;
