//! Provision or reset the bookkeeper account from the command line.
//!
//! There is no registration page, the single account is managed with this
//! tool instead.

use clap::Parser;
use rusqlite::Connection;

use poultry_ledger::{
    Error, PasswordHash, ValidatedPassword, create_user, get_user_by_name, initialize_db,
    update_password,
};

/// Set the password for the bookkeeper account, creating it if needed.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long)]
    db_path: String,

    /// The name the user logs in with.
    #[arg(long, default_value = "admin")]
    username: String,
}

fn main() {
    let args = Args::parse();

    let connection = Connection::open(&args.db_path).expect("Could not open the database file.");
    initialize_db(&connection).expect("Could not initialize the database.");

    let password =
        rpassword::prompt_password("New password: ").expect("Could not read the password.");
    let confirmation =
        rpassword::prompt_password("Confirm password: ").expect("Could not read the password.");

    if password != confirmation {
        eprintln!("The passwords do not match.");
        std::process::exit(1);
    }

    let password = match ValidatedPassword::new(&password) {
        Ok(password) => password,
        Err(Error::TooWeak(feedback)) => {
            eprintln!("The password is too easy to guess: {feedback}");
            std::process::exit(1);
        }
        Err(error) => {
            eprintln!("Could not validate the password: {error}");
            std::process::exit(1);
        }
    };

    let password_hash = PasswordHash::new(password).expect("Could not hash the password.");

    match get_user_by_name(&args.username, &connection) {
        Ok(_) => {
            update_password(&args.username, password_hash, &connection)
                .expect("Could not update the password.");
            println!("Updated the password for {}.", args.username);
        }
        Err(Error::NotFound) => {
            create_user(&args.username, password_hash, &connection)
                .expect("Could not create the user.");
            println!("Created the user {}.", args.username);
        }
        Err(error) => {
            eprintln!("Could not look up {}: {error}", args.username);
            std::process::exit(1);
        }
    }
}
