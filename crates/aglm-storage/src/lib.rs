// Driver-agnostic relational storage for tasks and task_events.
//
// Both sqlite and mysql are supported through sqlx's `Any` driver: the same
// query/update/insert statements run unmodified against either backend,
// because they stick to portable SQL (COALESCE, plain UPDATE-then-INSERT
// upserts, no dialect-specific syntax). Only schema creation branches on the
// configured driver, since auto-increment syntax genuinely differs.

mod error;
mod models;
mod store;

pub use error::StoreError;
pub use models::{NewTask, TaskEventRow, TaskRow, TaskUpdate};
pub use store::{Driver, Store};
