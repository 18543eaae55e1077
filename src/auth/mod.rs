pub mod claims;
pub mod dto;
pub(crate) mod extractors;
pub mod guard;
pub mod jwt;
pub mod password;
pub mod repo;
pub mod repo_types;
pub mod services;
