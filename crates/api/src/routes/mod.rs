pub mod books;
pub mod ops;
pub mod orders;
pub mod reports;
