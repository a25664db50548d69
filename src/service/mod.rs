pub mod filter;
pub mod ships;
