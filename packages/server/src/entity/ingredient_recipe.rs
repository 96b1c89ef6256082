use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// An ingredient line of a recipe. Row ids follow submission order.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ingredient_recipe")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique_key = "recipe_ingredient")]
    pub recipe_id: i32,
    #[sea_orm(unique_key = "recipe_ingredient")]
    pub ingredient_id: i32,

    pub amount: i32,

    #[sea_orm(belongs_to, from = "recipe_id", to = "id")]
    pub recipe: HasOne<super::recipe::Entity>,
    #[sea_orm(belongs_to, from = "ingredient_id", to = "id")]
    pub ingredient: HasOne<super::ingredient::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
