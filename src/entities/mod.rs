//! Database-backed entities. Each handle wraps one row id and issues a
//! query per accessor; [`cache::EntityCache`] deduplicates the handles.

pub mod cache;
pub mod operator;
pub mod readiness;
pub mod service;
pub mod user;

pub use cache::EntityCache;
pub use operator::Operator;
pub use readiness::is_service_ready;
pub use service::Service;
pub use user::TgUser;
