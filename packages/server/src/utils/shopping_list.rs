use std::fmt::Write;

use sea_orm::sea_query::{Expr, Func};
use sea_orm::*;

use crate::entity::{ingredient, ingredient_recipe, shopping_cart};

pub const SHOPPING_LIST_FILENAME: &str = "shopping_list.txt";
pub const EMPTY_SHOPPING_LIST: &str = "Shopping list is empty.";

/// One aggregated line of the shopping list.
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult)]
pub struct ShoppingListItem {
    pub name: String,
    pub measurement_unit: String,
    pub total_amount: i64,
}

/// Sum ingredient amounts across every recipe in the user's cart, grouped by
/// (name, unit) and ordered by the first contributing ingredient line.
pub async fn aggregate_shopping_cart<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
) -> Result<Vec<ShoppingListItem>, DbErr> {
    let cart_recipes = shopping_cart::Entity::find()
        .select_only()
        .column(shopping_cart::Column::RecipeId)
        .filter(shopping_cart::Column::UserId.eq(user_id))
        .into_query();

    ingredient_recipe::Entity::find()
        .select_only()
        .inner_join(ingredient::Entity)
        .column_as(ingredient::Column::Name, "name")
        .column_as(ingredient::Column::MeasurementUnit, "measurement_unit")
        .column_as(
            Expr::expr(Func::sum(Expr::col((
                ingredient_recipe::Entity,
                ingredient_recipe::Column::Amount,
            )))),
            "total_amount",
        )
        .filter(ingredient_recipe::Column::RecipeId.in_subquery(cart_recipes))
        .group_by(ingredient::Column::Name)
        .group_by(ingredient::Column::MeasurementUnit)
        .order_by_asc(Expr::expr(Func::min(Expr::col((
            ingredient_recipe::Entity,
            ingredient_recipe::Column::Id,
        )))))
        .into_model::<ShoppingListItem>()
        .all(db)
        .await
}

/// Render the aggregated items as a numbered plain-text list.
pub fn render_shopping_list(items: &[ShoppingListItem]) -> String {
    if items.is_empty() {
        return format!("{EMPTY_SHOPPING_LIST}\n");
    }
    let mut out = String::new();
    for (n, item) in items.iter().enumerate() {
        let _ = writeln!(
            out,
            "{}. {} - {} {}",
            n + 1,
            item.name,
            item.total_amount,
            item.measurement_unit
        );
    }
    out
}
