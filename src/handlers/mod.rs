pub mod auth;
pub mod comment;
pub mod image;
pub mod post;
pub mod profile;
pub mod topic;
pub mod vote;
