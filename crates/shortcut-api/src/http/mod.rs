//! HTTP implementation of [`ShortcutApi`](crate::traits::ShortcutApi).

mod client;
mod files;
mod stories;
mod workspace;

pub use client::{DEFAULT_BASE_URL, HttpClient};
pub use files::guess_content_type;
pub use stories::{GROUP_PAGE_SIZE, SEARCH_PAGE_SIZE};
