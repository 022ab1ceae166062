//! Application services: accounts, feeds, posts, follows and administration.

pub mod accounts;
pub mod admin;
pub mod error;
pub mod feed;
pub mod follows;
pub mod pagination;
pub mod posts;
pub mod repos;
