pub mod comments;
pub mod reviews;

pub use comments::CommentFeed;
pub use reviews::ReviewFeed;

/// Movie portal base URL shared by both feeds.
pub(crate) const BASE_URL: &str = "https://movie.douban.com";
