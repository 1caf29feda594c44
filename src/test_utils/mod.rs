use rusqlite::Connection;

use crate::{
    db::initialize,
    password::PasswordHash,
    user::{UserID, Username, create_user},
};

/// An in-memory database with every table created and foreign keys enabled.
pub(crate) fn get_test_connection() -> Connection {
    let connection =
        Connection::open_in_memory().expect("Could not create in-memory SQLite database");
    initialize(&connection).expect("Could not initialize database");

    connection
}

/// Insert a user with a placeholder password hash.
pub(crate) fn create_test_user(connection: &Connection, username: &str) -> UserID {
    create_user(
        Username::new(username).expect("Invalid test username"),
        PasswordHash::new_unchecked("hunter2"),
        connection,
    )
    .expect("Could not create test user")
    .id
}
