use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::config::AppConfig;
use crate::handlers;
use crate::state::AppState;

pub fn api_routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .merge(auth_routes())
        .merge(user_routes())
        .merge(catalog_routes())
        .merge(recipe_routes(config))
}

pub fn media_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(handlers::media::get_image))
}

fn auth_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(handlers::auth::login))
}

fn user_routes() -> OpenApiRouter<AppState> {
    use handlers::users;

    OpenApiRouter::new()
        .routes(routes!(users::register, users::list_users))
        .routes(routes!(users::me))
        .routes(routes!(users::set_password))
        .routes(routes!(users::subscriptions))
        .routes(routes!(users::get_user))
        .routes(routes!(users::subscribe, users::unsubscribe))
}

fn catalog_routes() -> OpenApiRouter<AppState> {
    use handlers::{ingredients, tags};

    OpenApiRouter::new()
        .routes(routes!(tags::list_tags))
        .routes(routes!(tags::get_tag))
        .routes(routes!(ingredients::list_ingredients))
        .routes(routes!(ingredients::get_ingredient))
}

fn recipe_routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    use handlers::recipes;

    let writes = OpenApiRouter::new()
        .routes(routes!(recipes::list_recipes, recipes::create_recipe))
        .routes(routes!(
            recipes::get_recipe,
            recipes::update_recipe,
            recipes::delete_recipe
        ))
        .layer(recipes::recipe_body_limit(&config.media));

    let lists = OpenApiRouter::new()
        .routes(routes!(recipes::add_favorite, recipes::remove_favorite))
        .routes(routes!(
            recipes::add_to_shopping_cart,
            recipes::remove_from_shopping_cart
        ))
        .routes(routes!(recipes::download_shopping_cart));

    writes.merge(lists)
}
