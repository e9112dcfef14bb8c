pub mod buffer;
pub mod descriptor;
