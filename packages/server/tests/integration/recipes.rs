use sea_orm::{EntityTrait, PaginatorTrait};
use serde_json::json;

use foodgram_server::entity::recipe;

use crate::common::{TestApp, recipe_body, routes};

/// `(ingredient id, amount)` pairs of a recipe response, in response order.
fn ingredient_pairs(body: &serde_json::Value) -> Vec<(i64, i64)> {
    body["ingredients"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| (i["id"].as_i64().unwrap(), i["amount"].as_i64().unwrap()))
        .collect()
}

mod create {
    use super::*;

    #[tokio::test]
    async fn created_recipe_matches_submitted_ingredients_and_tags() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice").await;
        let flour = app.create_ingredient("flour", "g").await;
        let egg = app.create_ingredient("egg", "pcs").await;
        let breakfast = app.tag_id("breakfast").await;

        let res = app
            .post_with_token(
                routes::RECIPES,
                &recipe_body("Pancakes", &[breakfast], &[(egg, 2), (flour, 200)]),
                &alice.token,
            )
            .await;

        assert_eq!(res.status, 201, "create failed: {}", res.text);
        assert_eq!(
            ingredient_pairs(&res.body),
            vec![(egg as i64, 2), (flour as i64, 200)]
        );
        assert_eq!(res.body["ingredients"][1]["name"], "flour");
        assert_eq!(res.body["ingredients"][1]["measurement_unit"], "g");
        assert_eq!(res.body["tags"][0]["slug"], "breakfast");
        assert_eq!(res.body["author"]["id"], alice.id);
        assert_eq!(res.body["is_favorited"], false);
        assert_eq!(res.body["is_in_shopping_cart"], false);
        assert_eq!(res.body["cooking_time"], 15);
    }

    #[tokio::test]
    async fn author_is_the_requester_even_if_payload_names_another() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice").await;
        let bob = app.create_authenticated_user("bob").await;
        let flour = app.create_ingredient("flour", "g").await;

        let mut body = recipe_body("Bread", &[], &[(flour, 500)]);
        body["author"] = json!(bob.id);
        let res = app.post_with_token(routes::RECIPES, &body, &alice.token).await;

        assert_eq!(res.status, 201, "create failed: {}", res.text);
        assert_eq!(res.body["author"]["id"], alice.id);
    }

    #[tokio::test]
    async fn image_is_stored_and_served() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice").await;
        let flour = app.create_ingredient("flour", "g").await;

        let id = app
            .create_recipe(&alice.token, "Bread", &[], &[(flour, 500)])
            .await;
        let res = app.get_without_token(&routes::recipe(id)).await;
        let image_url = res.body["image"].as_str().unwrap().to_string();
        assert!(image_url.starts_with("/media/"), "unexpected url {image_url}");
        assert!(image_url.ends_with(".png"));

        let image = app.get_without_token(&image_url).await;
        assert_eq!(image.status, 200);
        assert_eq!(image.header("content-type"), "image/png");

        let missing = app.get_without_token("/media/not-a-name.png").await;
        assert_eq!(missing.status, 404);
    }

    #[tokio::test]
    async fn duplicate_ingredient_is_rejected_and_nothing_is_written() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice").await;
        let flour = app.create_ingredient("flour", "g").await;

        let res = app
            .post_with_token(
                routes::RECIPES,
                &recipe_body("Bread", &[], &[(flour, 200), (flour, 300)]),
                &alice.token,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
        assert_eq!(res.body["message"], format!("Duplicate ingredient {flour}"));
        assert_eq!(recipe::Entity::find().count(&app.db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn unknown_ingredient_is_not_found_and_rolls_back() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice").await;
        let flour = app.create_ingredient("flour", "g").await;

        let res = app
            .post_with_token(
                routes::RECIPES,
                &recipe_body("Bread", &[], &[(flour, 200), (999_999, 1)]),
                &alice.token,
            )
            .await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
        assert_eq!(recipe::Entity::find().count(&app.db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn invalid_payloads_are_rejected() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice").await;
        let flour = app.create_ingredient("flour", "g").await;

        let mut zero_time = recipe_body("Bread", &[], &[(flour, 200)]);
        zero_time["cooking_time"] = json!(0);
        let mut bad_image = recipe_body("Bread", &[], &[(flour, 200)]);
        bad_image["image"] = json!("data:text/plain;base64,aGVsbG8=");
        let cases = [
            recipe_body("Bread", &[], &[]),
            recipe_body("Bread", &[], &[(flour, 0)]),
            recipe_body("Bread", &[999_999], &[(flour, 200)]),
            zero_time,
            bad_image,
        ];

        for body in cases {
            let res = app.post_with_token(routes::RECIPES, &body, &alice.token).await;
            assert_eq!(res.status, 400, "accepted {body}: {}", res.text);
        }
        assert_eq!(recipe::Entity::find().count(&app.db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn anonymous_user_cannot_create() {
        let app = TestApp::spawn().await;
        let flour = app.create_ingredient("flour", "g").await;

        let res = app
            .post_without_token(routes::RECIPES, &recipe_body("Bread", &[], &[(flour, 1)]))
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_MISSING");
    }
}

mod update_and_delete {
    use super::*;

    #[tokio::test]
    async fn ingredient_set_is_replaced_not_merged() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice").await;
        let a = app.create_ingredient("apple", "pcs").await;
        let b = app.create_ingredient("butter", "g").await;
        let id = app.create_recipe(&alice.token, "Crumble", &[], &[(a, 1)]).await;

        let res = app
            .patch_with_token(
                &routes::recipe(id),
                &json!({"ingredients": [{"id": b, "amount": 2}]}),
                &alice.token,
            )
            .await;

        assert_eq!(res.status, 200, "update failed: {}", res.text);
        assert_eq!(ingredient_pairs(&res.body), vec![(b as i64, 2)]);
        assert_eq!(res.body["name"], "Crumble");
    }

    #[tokio::test]
    async fn partial_update_keeps_untouched_fields() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice").await;
        let flour = app.create_ingredient("flour", "g").await;
        let lunch = app.tag_id("lunch").await;
        let id = app
            .create_recipe(&alice.token, "Bread", &[lunch], &[(flour, 500)])
            .await;

        let res = app
            .patch_with_token(
                &routes::recipe(id),
                &json!({"name": "Rye bread", "cooking_time": 90}),
                &alice.token,
            )
            .await;

        assert_eq!(res.status, 200, "update failed: {}", res.text);
        assert_eq!(res.body["name"], "Rye bread");
        assert_eq!(res.body["cooking_time"], 90);
        assert_eq!(res.body["tags"][0]["id"], lunch);
        assert_eq!(ingredient_pairs(&res.body), vec![(flour as i64, 500)]);

        let cleared = app
            .patch_with_token(&routes::recipe(id), &json!({"tags": []}), &alice.token)
            .await;
        assert_eq!(cleared.status, 200);
        assert!(cleared.body["tags"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_update_leaves_tags_and_ingredients_untouched() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice").await;
        let flour = app.create_ingredient("flour", "g").await;
        let breakfast = app.tag_id("breakfast").await;
        let dinner = app.tag_id("dinner").await;
        let id = app
            .create_recipe(&alice.token, "Bread", &[breakfast], &[(flour, 500)])
            .await;

        let res = app
            .patch_with_token(
                &routes::recipe(id),
                &json!({
                    "name": "Renamed",
                    "tags": [dinner],
                    "ingredients": [{"id": 999_999, "amount": 1}],
                }),
                &alice.token,
            )
            .await;
        assert_eq!(res.status, 404, "update should fail: {}", res.text);
        assert_eq!(res.body["code"], "NOT_FOUND");

        let res = app.get_without_token(&routes::recipe(id)).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["name"], "Bread");
        let tags: Vec<i64> = res.body["tags"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["id"].as_i64().unwrap())
            .collect();
        assert_eq!(tags, vec![breakfast as i64]);
        assert_eq!(ingredient_pairs(&res.body), vec![(flour as i64, 500)]);
    }

    #[tokio::test]
    async fn non_author_cannot_update_or_delete() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice").await;
        let bob = app.create_authenticated_user("bob").await;
        let flour = app.create_ingredient("flour", "g").await;
        let id = app
            .create_recipe(&alice.token, "Bread", &[], &[(flour, 500)])
            .await;

        let update = app
            .patch_with_token(&routes::recipe(id), &json!({"name": "Mine now"}), &bob.token)
            .await;
        assert_eq!(update.status, 403);
        assert_eq!(update.body["code"], "PERMISSION_DENIED");

        let delete = app.delete_with_token(&routes::recipe(id), &bob.token).await;
        assert_eq!(delete.status, 403);

        let res = app.get_without_token(&routes::recipe(id)).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["name"], "Bread");
    }

    #[tokio::test]
    async fn author_can_delete_and_recipe_disappears_from_lists() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice").await;
        let bob = app.create_authenticated_user("bob").await;
        let flour = app.create_ingredient("flour", "g").await;
        let id = app
            .create_recipe(&alice.token, "Bread", &[], &[(flour, 500)])
            .await;
        app.post_with_token(&routes::favorite(id), &json!({}), &bob.token)
            .await;
        app.post_with_token(&routes::shopping_cart(id), &json!({}), &bob.token)
            .await;

        let res = app.delete_with_token(&routes::recipe(id), &alice.token).await;
        assert_eq!(res.status, 204, "delete failed: {}", res.text);

        assert_eq!(app.get_without_token(&routes::recipe(id)).await.status, 404);
        let download = app
            .get_with_token(routes::DOWNLOAD_SHOPPING_CART, &bob.token)
            .await;
        assert_eq!(download.text.trim_end(), "Shopping list is empty.");
    }

    #[tokio::test]
    async fn missing_recipe_is_not_found() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice").await;

        let res = app
            .patch_with_token(&routes::recipe(999_999), &json!({"name": "x"}), &alice.token)
            .await;
        assert_eq!(res.status, 404);

        let res = app.delete_with_token(&routes::recipe(999_999), &alice.token).await;
        assert_eq!(res.status, 404);
    }
}

mod listing {
    use super::*;

    fn ids(body: &serde_json::Value) -> Vec<i64> {
        body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["id"].as_i64().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn recipes_are_listed_newest_first_with_pagination() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice").await;
        let flour = app.create_ingredient("flour", "g").await;
        let mut created = Vec::new();
        for name in ["One", "Two", "Three"] {
            created.push(app.create_recipe(&alice.token, name, &[], &[(flour, 1)]).await as i64);
        }

        let res = app
            .get_without_token(&format!("{}?limit=2", routes::RECIPES))
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(ids(&res.body), vec![created[2], created[1]]);
        assert_eq!(res.body["pagination"]["total"], 3);
        assert_eq!(res.body["pagination"]["total_pages"], 2);

        let res = app
            .get_without_token(&format!("{}?page=18446744073709551615", routes::RECIPES))
            .await;
        assert_eq!(res.status, 400, "huge page accepted: {}", res.text);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn filters_by_tags_and_author() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice").await;
        let bob = app.create_authenticated_user("bob").await;
        let flour = app.create_ingredient("flour", "g").await;
        let breakfast = app.tag_id("breakfast").await;
        let lunch = app.tag_id("lunch").await;
        let dinner = app.tag_id("dinner").await;

        let r1 = app
            .create_recipe(&alice.token, "Porridge", &[breakfast], &[(flour, 1)])
            .await as i64;
        let r2 = app
            .create_recipe(&bob.token, "Soup", &[lunch, dinner], &[(flour, 1)])
            .await as i64;
        let _r3 = app
            .create_recipe(&bob.token, "Stew", &[dinner], &[(flour, 1)])
            .await;

        let res = app
            .get_without_token(&format!("{}?tags=breakfast&tags=lunch", routes::RECIPES))
            .await;
        assert_eq!(res.status, 200, "tag filter failed: {}", res.text);
        assert_eq!(ids(&res.body), vec![r2, r1]);

        let res = app
            .get_without_token(&format!("{}?author={}", routes::RECIPES, alice.id))
            .await;
        assert_eq!(ids(&res.body), vec![r1]);
    }

    #[tokio::test]
    async fn membership_filters_apply_only_to_authenticated_requests() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice").await;
        let flour = app.create_ingredient("flour", "g").await;
        let r1 = app
            .create_recipe(&alice.token, "One", &[], &[(flour, 1)])
            .await as i64;
        let r2 = app
            .create_recipe(&alice.token, "Two", &[], &[(flour, 1)])
            .await as i64;
        app.post_with_token(&routes::favorite(r1 as i32), &json!({}), &alice.token)
            .await;
        app.post_with_token(&routes::shopping_cart(r2 as i32), &json!({}), &alice.token)
            .await;

        let res = app
            .get_with_token(&format!("{}?is_favorited=1", routes::RECIPES), &alice.token)
            .await;
        assert_eq!(ids(&res.body), vec![r1]);
        assert_eq!(res.body["data"][0]["is_favorited"], true);

        let res = app
            .get_with_token(
                &format!("{}?is_in_shopping_cart=true", routes::RECIPES),
                &alice.token,
            )
            .await;
        assert_eq!(ids(&res.body), vec![r2]);
        assert_eq!(res.body["data"][0]["is_in_shopping_cart"], true);

        let res = app
            .get_without_token(&format!("{}?is_favorited=1", routes::RECIPES))
            .await;
        assert_eq!(ids(&res.body), vec![r2, r1]);
        assert_eq!(res.body["data"][0]["is_favorited"], false);

        let res = app
            .get_with_token(&format!("{}?is_favorited=0", routes::RECIPES), &alice.token)
            .await;
        assert_eq!(ids(&res.body), vec![r2, r1]);
    }
}
