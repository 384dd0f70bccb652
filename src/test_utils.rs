pub mod test_helpers {
    use std::{str::FromStr, sync::Arc, time::Duration};

    use chrono::{NaiveDate, NaiveTime};
    use sqlx::{
        sqlite::{SqliteConnectOptions, SqlitePoolOptions},
        SqlitePool,
    };
    use tempfile::NamedTempFile;

    use crate::models::slot::{format_date, format_time};
    use crate::services::FixedClock;
    use crate::AppState;

    /// Hour of day the test clock is pinned to; same-day slots after it
    /// are still bookable.
    pub const CLOCK_HOUR: u32 = 8;

    /// Create a new in-memory SQLite database for testing
    pub async fn create_test_db() -> Result<SqlitePool, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(pool)
    }

    /// Temporary file-backed database shared by `connections` connections.
    /// Needed where tests race several writers against each other.
    pub async fn create_test_db_file(
        connections: u32,
    ) -> Result<(SqlitePool, NamedTempFile), sqlx::Error> {
        let temp_file = NamedTempFile::new().map_err(sqlx::Error::Io)?;
        let db_path = temp_file
            .path()
            .to_str()
            .ok_or_else(|| sqlx::Error::Configuration("Invalid database path".into()))?;

        let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", db_path))?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(10));

        let pool = SqlitePoolOptions::new()
            .max_connections(connections.max(1))
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok((pool, temp_file))
    }

    /// Insert a test user with hashed password
    pub async fn insert_test_user(
        pool: &SqlitePool,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<i64, sqlx::Error> {
        use argon2::{
            password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
            Argon2,
        };

        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| {
                sqlx::Error::Configuration(format!("Password hashing failed: {}", e).into())
            })?
            .to_string();

        let result =
            sqlx::query("INSERT INTO users (name, email, password_hash) VALUES (?, ?, ?)")
                .bind(name)
                .bind(email)
                .bind(password_hash)
                .execute(pool)
                .await?;

        Ok(result.last_insert_rowid())
    }

    /// Insert one bookable slot
    pub async fn insert_slot(
        pool: &SqlitePool,
        date: NaiveDate,
        time: NaiveTime,
        is_available: bool,
    ) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO available_slots (slot_date, slot_time, is_available) VALUES (?, ?, ?)",
        )
        .bind(format_date(date))
        .bind(format_time(time))
        .bind(is_available)
        .execute(pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// A clock pinned to `CLOCK_HOUR` on `today`.
    pub fn fixed_clock(today: NaiveDate) -> Arc<FixedClock> {
        let opening = NaiveTime::from_hms_opt(CLOCK_HOUR, 0, 0).unwrap_or(NaiveTime::MIN);
        Arc::new(FixedClock(today.and_time(opening)))
    }

    /// Full application state over `pool` with a pinned clock.
    pub fn test_state(pool: SqlitePool, today: NaiveDate) -> AppState {
        AppState::new(pool, fixed_clock(today), 7)
    }
}
