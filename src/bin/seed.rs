use chrono::Duration;
use little_lemon_api::{
    config::AppConfig,
    db::{create_pool, run_migrations},
    middleware::auth::Claims,
};
use rust_decimal::Decimal;
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url, 2).await?;
    // Ensure migrations are applied.
    run_migrations(&pool).await?;

    let admin_id = ensure_user(&pool, "admin", "admin@littlelemon.test", true).await?;
    let manager_id = ensure_user(&pool, "mario", "mario@littlelemon.test", false).await?;
    let crew_id = ensure_user(&pool, "adrian", "adrian@littlelemon.test", false).await?;
    let customer_id = ensure_user(&pool, "tilly", "tilly@littlelemon.test", false).await?;

    ensure_membership(&pool, manager_id, "Manager").await?;
    ensure_membership(&pool, crew_id, "Delivery crew").await?;

    seed_menu(&pool).await?;

    println!("Seed completed. Development tokens (valid 7 days):");
    for (name, id) in [
        ("admin", admin_id),
        ("mario (manager)", manager_id),
        ("adrian (delivery crew)", crew_id),
        ("tilly (customer)", customer_id),
    ] {
        let token = Claims::new(id, Duration::days(7))
            .sign(&config.jwt_secret)
            .map_err(|e| anyhow::anyhow!(e.to_string()))?;
        println!("  {name}: Bearer {token}");
    }
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    username: &str,
    email: &str,
    is_staff: bool,
) -> anyhow::Result<Uuid> {
    let (user_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, username, email, is_staff)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (username) DO UPDATE SET email = EXCLUDED.email, is_staff = EXCLUDED.is_staff
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(username)
    .bind(email)
    .bind(is_staff)
    .fetch_one(pool)
    .await?;

    println!("Ensured user {username} (staff={is_staff})");
    Ok(user_id)
}

async fn ensure_membership(pool: &sqlx::PgPool, user_id: Uuid, group: &str) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO user_groups (user_id, group_id)
        SELECT $1, id FROM groups WHERE name = $2
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(group)
    .execute(pool)
    .await?;
    Ok(())
}

async fn seed_menu(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let categories = [
        ("appetizers", "Appetizers"),
        ("main-course", "Main Course"),
        ("desserts", "Desserts"),
        ("drinks", "Drinks"),
    ];
    for (slug, title) in categories {
        sqlx::query(
            r#"
            INSERT INTO categories (id, slug, title)
            VALUES ($1, $2, $3)
            ON CONFLICT (slug) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(slug)
        .bind(title)
        .execute(pool)
        .await?;
    }

    let items = [
        ("Bruschetta", "appetizers", Decimal::new(750, 2), true),
        ("Greek Salad", "appetizers", Decimal::new(1250, 2), false),
        ("Grilled Fish", "main-course", Decimal::new(2000, 2), true),
        ("Lemon Chicken", "main-course", Decimal::new(1800, 2), false),
        ("Lemon Dessert", "desserts", Decimal::new(500, 2), false),
        ("Fresh Lemonade", "drinks", Decimal::new(350, 2), false),
    ];
    for (title, slug, price, featured) in items {
        sqlx::query(
            r#"
            INSERT INTO menu_items (id, title, price, featured, category_id)
            SELECT $1, $2, $3, $4, c.id FROM categories c
            WHERE c.slug = $5
              AND NOT EXISTS (SELECT 1 FROM menu_items m WHERE m.title = $2)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(title)
        .bind(price)
        .bind(featured)
        .bind(slug)
        .execute(pool)
        .await?;
    }

    println!("Seeded menu");
    Ok(())
}
