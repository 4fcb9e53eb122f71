pub mod constants;
pub mod params;

pub use constants::*;
pub use params::*;
