pub mod ellipse;
pub mod stats;
pub mod trajectory;
