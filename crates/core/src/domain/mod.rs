pub mod insight;
pub mod news;
pub mod quote;
