use axum::{Router, routing::{get, post}};
use crate::{AppState, controllers::watch_controller};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route("/watch", get(watch_controller::get_watch_page))
        .route("/watch/list", get(watch_controller::get_watch_list))
        .route("/watch/new", get(watch_controller::get_new_dialog))
        .route("/watch/dialog", post(watch_controller::post_dialog))
        .route("/watch/dialog/cancel", post(watch_controller::post_dialog_cancel))
        .route("/watch/delete", post(watch_controller::post_delete))
        .route("/watch/reload", post(watch_controller::post_reload))
        .route("/watch/stop", post(watch_controller::post_stop))
        .route("/watch/:id/edit", get(watch_controller::get_edit_dialog))
        .route("/watch/:id/delete", get(watch_controller::get_delete_prompt))
}
