//! Yatube: a small social blogging service with author feeds, groups,
//! comments and subscriptions.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
