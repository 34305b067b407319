pub mod cart;
pub mod categories;
pub mod groups;
pub mod menu;
pub mod orders;
