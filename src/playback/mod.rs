pub mod controller;
pub mod element;
