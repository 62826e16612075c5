//! Code for creating the user table and fetching the bookkeeper account from
//! the database.
//!
//! The application serves the books of a single business, so there is
//! typically exactly one user. The account is provisioned with the
//! `set_password` binary rather than a registration page.

use std::fmt::Display;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{Error, PasswordHash};

/// A newtype wrapper for integer user IDs.
///
/// This helps disambiguate user IDs from other types of IDs, leading to better compile time
/// errors, and more flexible generics that can have distinct implementations for multiple ID types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct UserID(i64);

impl UserID {
    /// Create a new user ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Cast the user ID to a 64 bit integer.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for UserID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A user of the application.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    /// The user's ID in the application database.
    pub id: UserID,
    /// The name the user logs in with.
    pub username: String,
    /// The user's password hash.
    pub password_hash: PasswordHash,
}

/// Create the user table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_user_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS user (
                id INTEGER PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                password TEXT NOT NULL
                )",
        (),
    )?;

    Ok(())
}

/// Create and insert a new user into the database.
///
/// # Errors
/// Returns a [Error::SqlError] if an SQL related error occurred.
pub fn create_user(
    username: &str,
    password_hash: PasswordHash,
    connection: &Connection,
) -> Result<User, Error> {
    connection.execute(
        "INSERT INTO user (username, password) VALUES (?1, ?2)",
        (username, password_hash.as_ref()),
    )?;

    let id = UserID::new(connection.last_insert_rowid());

    Ok(User {
        id,
        username: username.to_owned(),
        password_hash,
    })
}

/// Retrieve a user from the database by their user name.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if there is no user called `username`,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_user_by_name(username: &str, connection: &Connection) -> Result<User, Error> {
    let user = connection
        .prepare("SELECT id, username, password FROM user WHERE username = :username")?
        .query_one(&[(":username", &username)], |row| {
            Ok(User {
                id: UserID::new(row.get(0)?),
                username: row.get(1)?,
                password_hash: PasswordHash::new_unchecked(&row.get::<usize, String>(2)?),
            })
        })?;

    Ok(user)
}

/// Set a new password hash for the user called `username`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if there is no user called `username`,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_password(
    username: &str,
    password_hash: PasswordHash,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE user SET password = ?1 WHERE username = ?2",
        (password_hash.as_ref(), username),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}
