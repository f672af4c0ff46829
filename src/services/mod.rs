pub mod comment_service;
pub mod comment_tree;
pub mod feed_service;
pub mod ranking;
pub mod vote_service;

pub use comment_service::CommentService;
pub use feed_service::FeedRanker;
pub use vote_service::VoteService;
