//! Repositories over the store

pub mod book;
pub mod user;

pub use book::BookRepository;
pub use user::UserRepository;
