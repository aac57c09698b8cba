//! Entity CRUD routes built from the resolved model.
//! Each entity gets `/<path_segment>` (list, create) and `/<path_segment>/:id` (read, update, delete),
//! registered only for the operations it declares; other verbs answer 405.

use crate::config::Operation;
use crate::handlers::entity::{create, delete as delete_handler, list, read, update};
use crate::state::AppState;
use axum::{routing::MethodRouter, Router};

pub fn entity_routes(state: AppState, trailing_slash: bool) -> Router {
    let mut router = Router::new();
    for entity in &state.model.entities {
        let mut collection: MethodRouter<AppState> = MethodRouter::new();
        let mut item: MethodRouter<AppState> = MethodRouter::new();
        let mut has_collection = false;
        let mut has_item = false;
        if entity.allows(Operation::Read) {
            collection = collection.get(list);
            item = item.get(read);
            has_collection = true;
            has_item = true;
        }
        if entity.allows(Operation::Create) {
            collection = collection.post(create);
            has_collection = true;
        }
        if entity.allows(Operation::Update) {
            item = item.put(update);
            has_item = true;
        }
        if entity.allows(Operation::Delete) {
            item = item.delete(delete_handler);
            has_item = true;
        }

        let base = format!("/{}", entity.path_segment);
        if has_collection {
            if trailing_slash {
                router = router.route(&format!("{}/", base), collection.clone());
            }
            router = router.route(&base, collection);
        }
        if has_item {
            router = router.route(&format!("{}/:id", base), item);
        }
    }
    router.with_state(state)
}
