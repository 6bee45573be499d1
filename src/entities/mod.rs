pub mod car;
pub mod customer;
pub mod user;
