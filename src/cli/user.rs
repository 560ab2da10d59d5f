use crate::db::TracingSink;
use crate::models::NewUser;
use crate::repositories::{SqliteUserRepository, Store, UserRepository};
use crate::{Config, Database};
use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

use super::UserCommand;

pub async fn run(config_path: &Path, command: UserCommand) -> Result<()> {
    let config = Config::load(config_path)?;
    let db = Database::open(&config.database.path, config.database.pool_size)?;
    db.migrate()?;
    let users = SqliteUserRepository::new(Store::new(db, Arc::new(TracingSink)));

    match command {
        UserCommand::Add {
            username,
            email,
            password,
        } => {
            let password = match password {
                Some(p) => p,
                None => {
                    let p = rpassword::prompt_password("Password: ")?;
                    let p_confirm = rpassword::prompt_password("Confirm password: ")?;
                    if p != p_confirm {
                        anyhow::bail!("Passwords do not match");
                    }
                    p
                }
            };

            let new_user = NewUser {
                username,
                email,
                password,
            };
            if let Err(errors) = new_user.validate().into_result() {
                let messages: Vec<String> = errors
                    .iter()
                    .map(|(field, message)| format!("{}: {}", field, message))
                    .collect();
                anyhow::bail!("Invalid user: {}", messages.join("; "));
            }
            if !users.check_username_availability(&new_user.username)? {
                anyhow::bail!("User '{}' already exists", new_user.username);
            }

            users.create(&new_user)?;
            tracing::info!("User '{}' created", new_user.username);
        }
        UserCommand::List => {
            println!("{:<6} {:<20} {:<30}", "ID", "USERNAME", "EMAIL");
            println!("{}", "-".repeat(58));
            for user in users.find_all()? {
                println!("{:<6} {:<20} {:<30}", user.id, user.username, user.email);
            }
        }
        UserCommand::Remove { username } => match users.find_by_username(&username)? {
            Some(user) => {
                users.delete_one_by_id(user.id)?;
                tracing::info!("User '{}' removed", username);
            }
            None => tracing::warn!("User '{}' not found", username),
        },
    }

    Ok(())
}
