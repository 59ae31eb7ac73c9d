//! Page implementations.
//!
//! - [`InMemoryPage`] - Arena-backed page for the CLI and tests
//! - [`PageFixture`] - JSON description of a page and its vendors

mod fixture;
mod memory_page;

pub use fixture::{LinkFixture, PageFixture, VendorFixture};
pub use memory_page::InMemoryPage;
