pub mod collection;
pub mod filters;
pub mod media_item;

pub use collection::*;
pub use filters::*;
pub use media_item::*;
