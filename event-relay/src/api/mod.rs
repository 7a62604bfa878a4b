pub mod health;
pub mod identify;
pub mod track;
pub mod utils;
