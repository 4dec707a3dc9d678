mod catalog;

pub use catalog::{Farm, Product, ProductFilter};
