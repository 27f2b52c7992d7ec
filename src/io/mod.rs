// Import/Export functionality for sales data

pub mod document;
pub mod export;
pub mod import;
pub mod invoice;

pub use document::*;
pub use export::*;
pub use import::*;
pub use invoice::*;
