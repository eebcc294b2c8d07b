//! Directory seeding.
//!
//! Generates fake managers, teachers and students and inserts them into the
//! `users`, `students` and `teachers` tables.

use std::time::Instant;

use fake::Fake;
use fake::faker::name::en::{FirstName, LastName};
use rayon::prelude::*;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};

use classroll_models::{Role, UserId};

use super::models::UserSeed;

/// Generates `count` users holding `role`.
pub fn generate_users(role: Role, count: usize) -> Vec<UserSeed> {
    (0..count)
        .into_par_iter()
        .map(|_| generate_user(role))
        .collect()
}

fn generate_user(role: Role) -> UserSeed {
    let id = UserId::new();
    let first_name: String = FirstName().fake();
    let last_name: String = LastName().fake();
    let tag = id.into_inner().simple().to_string();

    let code = match role {
        Role::Student => Some(format!("S{}", tag[..10].to_uppercase())),
        Role::Teacher => Some(format!("T{}", tag[..10].to_uppercase())),
        Role::Manager => None,
    };

    UserSeed {
        id,
        email: format!(
            "{}.{}+{}@example.com",
            first_name.to_lowercase(),
            last_name.to_lowercase(),
            &tag[..8]
        ),
        full_name: format!("{first_name} {last_name}"),
        role,
        code,
    }
}

/// Inserts users and their role rows in one transaction.
pub async fn seed_users(db: &PgPool, users: &[UserSeed]) -> Result<(), sqlx::Error> {
    let start_time = Instant::now();
    println!("👥 Seeding {} users...", users.len());

    let mut tx = db.begin().await?;

    // 4 params per user
    const BATCH_SIZE: usize = 1000;
    for chunk in users.chunks(BATCH_SIZE) {
        insert_users_chunk(&mut tx, chunk).await?;
        insert_role_rows(&mut tx, chunk, Role::Student).await?;
        insert_role_rows(&mut tx, chunk, Role::Teacher).await?;
    }

    tx.commit().await?;

    println!(
        "   ✓ Inserted {} users in {:?}",
        users.len(),
        start_time.elapsed()
    );
    Ok(())
}

async fn insert_users_chunk(
    tx: &mut Transaction<'_, Postgres>,
    users: &[UserSeed],
) -> Result<(), sqlx::Error> {
    if users.is_empty() {
        return Ok(());
    }

    let mut query = QueryBuilder::<Postgres>::new("INSERT INTO users (id, full_name, email, role) ");
    query.push_values(users, |mut row, user| {
        row.push_bind(user.id)
            .push_bind(&user.full_name)
            .push_bind(&user.email)
            .push_bind(user.role);
    });
    query.build().execute(&mut **tx).await?;
    Ok(())
}

async fn insert_role_rows(
    tx: &mut Transaction<'_, Postgres>,
    users: &[UserSeed],
    role: Role,
) -> Result<(), sqlx::Error> {
    let rows: Vec<(&UserSeed, &str)> = users
        .iter()
        .filter(|u| u.role == role)
        .filter_map(|u| u.code.as_deref().map(|code| (u, code)))
        .collect();
    if rows.is_empty() {
        return Ok(());
    }

    let table = match role {
        Role::Student => "INSERT INTO students (user_id, student_code) ",
        Role::Teacher => "INSERT INTO teachers (user_id, teacher_code) ",
        Role::Manager => return Ok(()),
    };

    let mut query = QueryBuilder::<Postgres>::new(table);
    query.push_values(rows, |mut row, (user, code)| {
        row.push_bind(user.id).push_bind(code);
    });
    query.build().execute(&mut **tx).await?;
    Ok(())
}
