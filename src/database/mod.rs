pub mod query;
pub mod relations;
pub mod schema;
pub mod store;
pub mod user_state;
