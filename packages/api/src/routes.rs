pub mod auth;
pub mod catalog;
pub mod contact;
pub mod health;
pub mod order;
pub mod products_info;
