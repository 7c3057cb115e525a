pub mod location;
pub mod summary;
pub mod trip;
