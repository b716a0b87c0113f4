pub mod batch;
pub mod document;
pub mod image;
pub mod system;
pub mod video;
