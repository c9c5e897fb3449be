use crate::auth::hash_password;
use crate::db::DbPool;
use crate::models::{NewPeriod, NewUser};
use anyhow::Result;
use chrono::{Datelike, Utc};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

pub fn seed_defaults(pool: &DbPool) -> Result<()> {
    let mut conn = pool.get()?;
    tracing::info!("Seeding default values...");

    seed_users(&mut conn)?;
    seed_period(&mut conn)?;

    Ok(())
}

fn seed_users(conn: &mut SqliteConnection) -> Result<()> {
    use crate::schema::users::dsl::*;

    let exists: i64 = users
        .filter(username.eq("admin"))
        .count()
        .get_result(conn)?;

    if exists == 0 {
        tracing::info!("Seeding user: admin");
        let new_user = NewUser {
            username: "admin".to_string(),
            password_hash: hash_password("admin")?,
            role: "admin".to_string(),
        };

        diesel::insert_into(users).values(&new_user).execute(conn)?;
        tracing::warn!("Default admin account created with password 'admin'; change it");
    }
    Ok(())
}

/// Creates the current term when no period exists yet, so a fresh install
/// has somewhere to put subjects.
fn seed_period(conn: &mut SqliteConnection) -> Result<()> {
    use crate::schema::periods::dsl::*;

    let count: i64 = periods.count().get_result(conn)?;
    if count > 0 {
        return Ok(());
    }

    let today = Utc::now().date_naive();
    let term = if today.month() <= 6 { 1 } else { 2 };
    let period_code = format!("{}-{}", today.year(), term);

    tracing::info!("Seeding period: {}", period_code);
    diesel::insert_into(periods)
        .values(&NewPeriod {
            name: format!("Period {}", period_code),
            code: period_code,
            is_active: true,
        })
        .execute(conn)?;

    Ok(())
}
