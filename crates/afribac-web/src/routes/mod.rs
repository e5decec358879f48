mod command;
mod health;

pub use command::command_routes;
pub use health::health_routes;
