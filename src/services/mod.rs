pub mod lifecycle;
pub mod polish;
pub mod timeline;
pub mod visibility;
