pub mod error;
pub mod extract;
pub mod handlers;
pub mod models;
pub mod state;

pub use state::ApiState;

use std::sync::Arc;

use axum::{
    Router, middleware as axum_middleware,
    routing::{MethodRouter, get},
};

use crate::cache::{CachedRoute, CachingDispatcher, ResourceKind, response_cache_layer};

/// Resource routes, each wrapped by the caching dispatcher for its kind.
pub fn build_api_router(state: ApiState, dispatcher: Arc<CachingDispatcher>) -> Router {
    let group = |kind: ResourceKind, routes: Vec<(&'static str, MethodRouter<ApiState>)>| {
        routes
            .into_iter()
            .fold(Router::new(), |router, (path, method_router)| {
                router.route(path, method_router)
            })
            .route_layer(axum_middleware::from_fn_with_state(
                CachedRoute::new(dispatcher.clone(), kind),
                response_cache_layer,
            ))
    };

    Router::new()
        .merge(group(
            ResourceKind::DatasetCollection,
            vec![(
                "/datasets/",
                get(handlers::list_datasets).post(handlers::create_dataset),
            )],
        ))
        .merge(group(
            ResourceKind::DatasetInstance,
            vec![
                (
                    "/datasets/{owner}/{dataset}/",
                    get(handlers::get_dataset)
                        .put(handlers::replace_dataset)
                        .patch(handlers::patch_dataset)
                        .delete(handlers::delete_dataset),
                ),
                // Numeric id alias. The segment keeps the `{owner}` name because
                // the router allows one parameter name per position.
                (
                    "/datasets/{owner}/",
                    get(handlers::get_dataset_by_id)
                        .put(handlers::replace_dataset_by_id)
                        .patch(handlers::patch_dataset_by_id)
                        .delete(handlers::delete_dataset_by_id),
                ),
            ],
        ))
        .merge(group(
            ResourceKind::PlaceCollection,
            vec![
                (
                    "/datasets/{owner}/{dataset}/places/",
                    get(handlers::list_dataset_places).post(handlers::create_dataset_place),
                ),
                (
                    "/places/",
                    get(handlers::list_places).post(handlers::create_place),
                ),
            ],
        ))
        .merge(group(
            ResourceKind::PlaceInstance,
            vec![(
                "/places/{id}/",
                get(handlers::get_place)
                    .put(handlers::replace_place)
                    .patch(handlers::patch_place)
                    .delete(handlers::delete_place),
            )],
        ))
        .merge(group(
            ResourceKind::SubmissionCollection,
            vec![(
                "/places/{id}/{submission_type}/",
                get(handlers::list_submissions).post(handlers::create_submission),
            )],
        ))
        .merge(group(
            ResourceKind::SubmissionInstance,
            vec![(
                "/places/{id}/{submission_type}/{sid}/",
                get(handlers::get_submission)
                    .put(handlers::replace_submission)
                    .patch(handlers::patch_submission)
                    .delete(handlers::delete_submission),
            )],
        ))
        .merge(group(
            ResourceKind::Activity,
            vec![
                (
                    "/datasets/{owner}/{dataset}/activity/",
                    get(handlers::list_dataset_activity),
                ),
                ("/activity/", get(handlers::list_activity)),
            ],
        ))
        .with_state(state)
}
