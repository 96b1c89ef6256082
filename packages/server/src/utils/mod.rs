pub mod hash;
pub mod jwt;
pub mod recipe;
pub mod recipe_list;
pub mod shopping_list;
pub mod subscription;
