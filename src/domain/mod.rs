pub mod feed;
pub mod item;

pub use feed::{Dialect, FeedImage, FeedMeta, XmlDecl};
pub use item::{Article, ArticleSource, Enclosure};
