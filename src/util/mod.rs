pub mod element;

pub use element::Element;
