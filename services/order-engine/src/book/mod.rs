//! Depth book infrastructure
//!
//! Price levels, one side of a book, and the per-product collection.

pub mod book_side;
pub mod depth_book;
pub mod price_level;

pub use book_side::{BookSide, DepthLevel};
pub use depth_book::{BookDelta, DepthBook, DepthBooks, DepthSnapshot};
pub use price_level::{BookEntry, PriceLevel};
