use common::MeshId;
use serde_json::json;

use crate::common::{TestApp, new_user, routes};

mod mesh_upload {
    use super::*;

    #[tokio::test]
    async fn upload_creates_mesh_in_processing_state() {
        let app = TestApp::spawn().await;
        let user = new_user();

        let res = app
            .upload_mesh(
                &user,
                "victorian-armchair",
                &[("chair.obj", b"o chair"), ("chair.mtl", b"newmtl wood")],
            )
            .await;

        assert_eq!(res.status, 201, "upload failed: {}", res.text);
        assert_eq!(res.body["name"].as_str().unwrap(), "victorian-armchair");
        assert_eq!(res.body["state"].as_str().unwrap(), "processing");
        assert_eq!(res.body["version"].as_u64().unwrap(), 1);
        assert_eq!(res.body["owner"].as_str().unwrap(), user);
        assert!(res.body["files"].as_str().is_some());
    }

    #[tokio::test]
    async fn upload_without_files_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app.upload_mesh(&new_user(), "empty-mesh", &[]).await;

        assert_eq!(res.status, 400);
        assert_eq!(res.error_code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn upload_without_name_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app
            .upload_mesh_without_name(&new_user(), &[("chair.obj", b"o chair")])
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.error_code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn duplicate_name_is_rejected_across_users() {
        let app = TestApp::spawn().await;
        app.create_mesh(&new_user(), "taken-name").await;

        let res = app
            .upload_mesh(&new_user(), "taken-name", &[("other.obj", b"o other")])
            .await;

        assert_eq!(res.status, 409);
        assert_eq!(res.error_code(), "CONFLICT");
    }
}

mod identity {
    use super::*;

    #[tokio::test]
    async fn request_without_identity_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app.get_anonymous(routes::MESHES).await;

        assert_eq!(res.status, 401);
        assert_eq!(res.error_code(), "IDENTITY_MISSING");
    }

    #[tokio::test]
    async fn malformed_identity_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app.get_as(routes::MESHES, "not-a-uuid").await;

        assert_eq!(res.status, 401);
        assert_eq!(res.error_code(), "IDENTITY_INVALID");
    }
}

mod mesh_get {
    use super::*;

    #[tokio::test]
    async fn owner_can_fetch_their_mesh() {
        let app = TestApp::spawn().await;
        let user = new_user();
        let id = app.create_mesh(&user, "fetch-me").await;

        let res = app.get_as(&routes::mesh(&id), &user).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.id(), id);
        assert_eq!(res.body["name"].as_str().unwrap(), "fetch-me");
    }

    #[tokio::test]
    async fn non_owner_gets_forbidden_for_existing_mesh() {
        let app = TestApp::spawn().await;
        let id = app.create_mesh(&new_user(), "someone-elses").await;

        let res = app.get_as(&routes::mesh(&id), &new_user()).await;

        assert_eq!(res.status, 403);
        assert_eq!(res.error_code(), "FORBIDDEN");
    }

    #[tokio::test]
    async fn missing_mesh_is_not_found_regardless_of_caller() {
        let app = TestApp::spawn().await;
        let ghost = MeshId::generate().to_string();

        let res = app.get_as(&routes::mesh(&ghost), &new_user()).await;

        assert_eq!(res.status, 404);
        assert_eq!(res.error_code(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn malformed_mesh_id_is_a_validation_error() {
        let app = TestApp::spawn().await;

        let res = app.get_as(&routes::mesh("not-an-id"), &new_user()).await;

        assert_eq!(res.status, 400);
        assert_eq!(res.error_code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn list_returns_only_the_callers_meshes_in_creation_order() {
        let app = TestApp::spawn().await;
        let user = new_user();
        let first = app.create_mesh(&user, "first-mesh").await;
        let second = app.create_mesh(&user, "second-mesh").await;
        app.create_mesh(&new_user(), "foreign-mesh").await;

        let res = app.get_as(routes::MESHES, &user).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["total"].as_u64().unwrap(), 2);
        let ids: Vec<&str> = res.body["meshes"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec![first.as_str(), second.as_str()]);
    }
}

mod mesh_update {
    use super::*;

    #[tokio::test]
    async fn rename_bumps_version() {
        let app = TestApp::spawn().await;
        let user = new_user();
        let id = app.create_mesh(&user, "old-name").await;

        let res = app
            .patch_as(&routes::mesh(&id), &json!({"name": "new-name"}), &user)
            .await;

        assert_eq!(res.status, 200, "rename failed: {}", res.text);
        assert_eq!(res.body["name"].as_str().unwrap(), "new-name");
        assert_eq!(res.body["version"].as_u64().unwrap(), 2);
    }

    #[tokio::test]
    async fn rename_onto_taken_name_conflicts() {
        let app = TestApp::spawn().await;
        let user = new_user();
        app.create_mesh(&user, "occupied").await;
        let id = app.create_mesh(&user, "renamable").await;

        let res = app
            .patch_as(&routes::mesh(&id), &json!({"name": "occupied"}), &user)
            .await;

        assert_eq!(res.status, 409);
        assert_eq!(res.error_code(), "CONFLICT");
    }

    #[tokio::test]
    async fn rename_frees_the_old_name() {
        let app = TestApp::spawn().await;
        let user = new_user();
        let id = app.create_mesh(&user, "original").await;

        let res = app
            .patch_as(&routes::mesh(&id), &json!({"name": "changed"}), &user)
            .await;
        assert_eq!(res.status, 200);

        let reuse = app
            .upload_mesh(&user, "original", &[("again.obj", b"o again")])
            .await;
        assert_eq!(reuse.status, 201);
    }

    #[tokio::test]
    async fn non_owner_cannot_update() {
        let app = TestApp::spawn().await;
        let id = app.create_mesh(&new_user(), "protected").await;

        let res = app
            .patch_as(&routes::mesh(&id), &json!({"short_desc": "new"}), &new_user())
            .await;

        assert_eq!(res.status, 403);
    }
}

mod mesh_state {
    use super::*;

    #[tokio::test]
    async fn state_transition_is_applied_and_bumps_version() {
        let app = TestApp::spawn().await;
        let user = new_user();
        let id = app.create_mesh(&user, "processing-done").await;

        let res = app
            .put_as(&routes::mesh_state(&id), &json!({"state": "ready"}), &user)
            .await;
        assert_eq!(res.status, 204, "state update failed: {}", res.text);

        let read = app.get_as(&routes::mesh(&id), &user).await;
        assert_eq!(read.body["state"].as_str().unwrap(), "ready");
        assert_eq!(read.body["version"].as_u64().unwrap(), 2);
    }

    #[tokio::test]
    async fn setting_the_current_state_is_a_noop() {
        let app = TestApp::spawn().await;
        let user = new_user();
        let id = app.create_mesh(&user, "noop-state").await;

        let res = app
            .put_as(
                &routes::mesh_state(&id),
                &json!({"state": "processing"}),
                &user,
            )
            .await;
        assert_eq!(res.status, 204);

        let read = app.get_as(&routes::mesh(&id), &user).await;
        assert_eq!(read.body["state"].as_str().unwrap(), "processing");
        assert_eq!(read.body["version"].as_u64().unwrap(), 1);
    }

    #[tokio::test]
    async fn unknown_state_is_rejected() {
        let app = TestApp::spawn().await;
        let user = new_user();
        let id = app.create_mesh(&user, "bad-state").await;

        let res = app
            .put_as(&routes::mesh_state(&id), &json!({"state": "melted"}), &user)
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.error_code(), "VALIDATION_ERROR");
    }
}

mod mesh_delete {
    use super::*;

    #[tokio::test]
    async fn owner_can_delete_and_the_mesh_is_gone() {
        let app = TestApp::spawn().await;
        let user = new_user();
        let id = app.create_mesh(&user, "short-lived").await;

        let res = app.delete_as(&routes::mesh(&id), &user).await;
        assert_eq!(res.status, 204);

        let read = app.get_as(&routes::mesh(&id), &user).await;
        assert_eq!(read.status, 404);
    }

    #[tokio::test]
    async fn delete_frees_the_name() {
        let app = TestApp::spawn().await;
        let user = new_user();
        let id = app.create_mesh(&user, "recycled").await;

        app.delete_as(&routes::mesh(&id), &user).await;

        let res = app
            .upload_mesh(&user, "recycled", &[("v2.obj", b"o v2")])
            .await;
        assert_eq!(res.status, 201);
    }

    #[tokio::test]
    async fn non_owner_cannot_delete() {
        let app = TestApp::spawn().await;
        let owner = new_user();
        let id = app.create_mesh(&owner, "keep-out").await;

        let res = app.delete_as(&routes::mesh(&id), &new_user()).await;
        assert_eq!(res.status, 403);

        let read = app.get_as(&routes::mesh(&id), &owner).await;
        assert_eq!(read.status, 200);
    }
}
