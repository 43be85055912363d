pub mod catalog;
pub mod friends;
pub mod health;
pub mod preferences;
pub mod profiles;
pub mod statuses;
pub mod swipe;
