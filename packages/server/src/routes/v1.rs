use axum::{
    Router,
    routing::{get, post, put},
};

use crate::handlers;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().nest("/meshes", mesh_routes())
}

fn mesh_routes() -> Router<AppState> {
    let crud = Router::new()
        .route("/", get(handlers::mesh::list_meshes))
        .route(
            "/{id}",
            get(handlers::mesh::get_mesh)
                .patch(handlers::mesh::update_mesh)
                .delete(handlers::mesh::delete_mesh),
        )
        .route("/{id}/state", put(handlers::mesh::update_mesh_state))
        .route("/{id}/files", get(handlers::mesh::list_mesh_files))
        .route(
            "/{id}/files/{file_id}",
            get(handlers::mesh::download_mesh_file),
        );

    let upload = Router::new()
        .route("/", post(handlers::mesh::create_mesh))
        .layer(handlers::mesh::upload_body_limit());

    crud.merge(upload)
}
