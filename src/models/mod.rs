pub mod image;
pub mod openai;
pub mod record;

pub use image::*;
pub use openai::*;
pub use record::*;
