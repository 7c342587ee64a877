pub mod docs;
pub mod gallery;
pub mod model;
pub mod story;
pub mod user;
