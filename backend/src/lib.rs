pub mod classifier;
pub mod config;
pub mod diagnosis;
pub mod enhance;
pub mod guide;
pub mod imaging;
pub mod routes;
