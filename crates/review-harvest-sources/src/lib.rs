pub mod browser;
pub mod defense;
pub mod douban;
pub mod error;
pub mod extract;
pub mod traits;

pub use browser::BrowserSession;
pub use douban::{CommentFeed, ReviewFeed};
pub use error::SourceError;
pub use extract::{ExtractContext, ExtractRules};
pub use traits::ReviewSource;
