use sea_orm::sea_query::{Index, OnConflict, PostgresQueryBuilder};
use sea_orm::*;
use tracing::info;

use crate::entity::{favorite, follow, recipe, shopping_cart, tag};

/// Default tags seeded on startup: (name, color, slug).
pub const DEFAULT_TAGS: &[(&str, &str, &str)] = &[
    ("Breakfast", "#E26C2D", "breakfast"),
    ("Lunch", "#49B64E", "lunch"),
    ("Dinner", "#8775D2", "dinner"),
];

/// Check constraints schema sync cannot express: (table, name, condition).
const CHECK_CONSTRAINTS: &[(&str, &str, &str)] = &[
    ("recipe", "recipe_cooking_time_positive", "cooking_time > 0"),
    ("ingredient_recipe", "ingredient_recipe_amount_positive", "amount > 0"),
    ("follow", "follow_no_self_follow", "user_id <> author_id"),
];

/// Seed the `tag` table with defaults, leaving existing tags untouched.
pub async fn seed_default_tags(db: &DatabaseConnection) -> Result<(), DbErr> {
    let mut inserted = 0u32;
    for &(name, color, slug) in DEFAULT_TAGS {
        let model = tag::ActiveModel {
            name: Set(name.to_string()),
            color: Set(color.to_string()),
            slug: Set(slug.to_string()),
            ..Default::default()
        };

        let result = tag::Entity::insert(model)
            .on_conflict(OnConflict::new().do_nothing().to_owned())
            .exec_without_returning(db)
            .await;

        match result {
            Ok(n) if n > 0 => inserted += 1,
            Ok(_) | Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(e),
        }
    }

    if inserted > 0 {
        info!("Seeded {} new tags", inserted);
    }

    Ok(())
}

async fn ensure_index(db: &DatabaseConnection, name: &str, stmt: &str) {
    match db.execute_unprepared(stmt).await {
        Ok(_) => info!("Ensured index {} exists", name),
        Err(e) => tracing::warn!("Failed to create index {}: {}", name, e),
    }
}

/// Ensure check constraints and secondary indexes exist.
///
/// Every statement is idempotent, so this runs on each startup. A failed
/// check constraint is an error; a failed index only logs a warning.
pub async fn ensure_constraints(db: &DatabaseConnection) -> Result<(), DbErr> {
    for &(table, name, condition) in CHECK_CONSTRAINTS {
        let stmt = format!(
            "DO $$ BEGIN \
                IF NOT EXISTS (SELECT 1 FROM pg_constraint WHERE conname = '{name}') THEN \
                    ALTER TABLE \"{table}\" ADD CONSTRAINT \"{name}\" CHECK ({condition}); \
                END IF; \
            END $$;"
        );
        db.execute_unprepared(&stmt).await?;
        info!("Ensured constraint {} exists", name);
    }

    // Recipe listing filters by author and orders by id.
    let stmt = Index::create()
        .if_not_exists()
        .name("idx_recipe_author")
        .table(recipe::Entity)
        .col(recipe::Column::AuthorId)
        .to_string(PostgresQueryBuilder);
    ensure_index(db, "idx_recipe_author", &stmt).await;

    // Reverse lookups from a recipe, used when deleting it.
    let stmt = Index::create()
        .if_not_exists()
        .name("idx_favorite_recipe")
        .table(favorite::Entity)
        .col(favorite::Column::RecipeId)
        .to_string(PostgresQueryBuilder);
    ensure_index(db, "idx_favorite_recipe", &stmt).await;

    let stmt = Index::create()
        .if_not_exists()
        .name("idx_shopping_cart_recipe")
        .table(shopping_cart::Entity)
        .col(shopping_cart::Column::RecipeId)
        .to_string(PostgresQueryBuilder);
    ensure_index(db, "idx_shopping_cart_recipe", &stmt).await;

    let stmt = Index::create()
        .if_not_exists()
        .name("idx_follow_author")
        .table(follow::Entity)
        .col(follow::Column::AuthorId)
        .to_string(PostgresQueryBuilder);
    ensure_index(db, "idx_follow_author", &stmt).await;

    Ok(())
}
