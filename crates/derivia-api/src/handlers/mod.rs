pub mod derivative;
pub mod health;
