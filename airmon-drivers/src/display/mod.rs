//! Display drivers

pub mod render;
pub mod st7735;

pub use st7735::St7735;
