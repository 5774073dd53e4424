// src/models/mod.rs

pub mod comment;
pub mod post;
pub mod topic;
pub mod user;
pub mod vote;
