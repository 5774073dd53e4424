pub mod aggregate;
pub mod cascade;
pub mod comments;
pub mod images;
pub mod posts;
pub mod topics;
pub mod users;
pub mod votes;
