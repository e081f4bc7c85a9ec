pub mod connection;
pub mod roles;
pub mod schema;
pub mod users;

pub use connection::*;
pub use roles::SurrealRoleStore;
pub use schema::*;
pub use users::SurrealUserStore;

use crate::store::StoreError;

/// Map a SurrealDB failure onto the store error space.
///
/// Unique index violations become [`StoreError::Conflict`]. Remote engines
/// only report them as query text, so the message is checked as well.
pub(crate) fn store_error(err: surrealdb::Error) -> StoreError {
    let unique_violation = matches!(
        err,
        surrealdb::Error::Db(surrealdb::error::Db::IndexExists { .. })
    );
    let message = err.to_string();
    if unique_violation || message.contains("already contains") {
        StoreError::Conflict(message)
    } else {
        StoreError::Database(message)
    }
}
