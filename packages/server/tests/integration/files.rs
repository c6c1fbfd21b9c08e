use crate::common::{TestApp, new_user, routes};

mod file_listing {
    use super::*;

    #[tokio::test]
    async fn collection_preserves_upload_order_and_derives_views() {
        let app = TestApp::spawn().await;
        let user = new_user();

        let upload = app
            .upload_mesh(
                &user,
                "full-scene",
                &[
                    ("chair.obj", b"o chair".as_slice()),
                    ("chair.mtl", b"newmtl wood".as_slice()),
                    ("room.blend", b"BLENDER-v400".as_slice()),
                ],
            )
            .await;
        assert_eq!(upload.status, 201, "upload failed: {}", upload.text);

        let res = app.get_as(&routes::mesh_files(&upload.id()), &user).await;
        assert_eq!(res.status, 200);

        let files = res.body["original_files"].as_array().unwrap();
        assert_eq!(files.len(), 3);
        let names: Vec<&str> = files
            .iter()
            .map(|f| f["filename"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["chair.obj", "chair.mtl", "room.blend"]);

        // room.blend fills the scene slot; chair.obj pairs with chair.mtl.
        let blend_id = files[2]["id"].as_str().unwrap();
        assert_eq!(res.body["scene_file"].as_str().unwrap(), blend_id);

        let pairs = res.body["obj_mtl_pairs"].as_array().unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(
            pairs[0]["obj"].as_str().unwrap(),
            files[0]["id"].as_str().unwrap()
        );
        assert_eq!(
            pairs[0]["mtl"].as_str().unwrap(),
            files[1]["id"].as_str().unwrap()
        );
    }

    #[tokio::test]
    async fn file_entries_carry_size_and_checksum() {
        let app = TestApp::spawn().await;
        let user = new_user();

        let upload = app
            .upload_mesh(&user, "checksummed", &[("model.obj", b"o 12345")])
            .await;
        let res = app.get_as(&routes::mesh_files(&upload.id()), &user).await;

        let entry = &res.body["original_files"][0];
        assert_eq!(entry["size"].as_u64().unwrap(), 7);
        assert_eq!(entry["checksum"].as_str().unwrap().len(), 64);
    }

    #[tokio::test]
    async fn non_owner_cannot_list_files() {
        let app = TestApp::spawn().await;
        let id = app.create_mesh(&new_user(), "private-files").await;

        let res = app.get_as(&routes::mesh_files(&id), &new_user()).await;
        assert_eq!(res.status, 403);
    }
}

mod file_download {
    use super::*;

    async fn upload_one(app: &TestApp, user: &str, name: &str) -> (String, String) {
        let upload = app
            .upload_mesh(user, name, &[("model.obj", b"o downloadable")])
            .await;
        assert_eq!(upload.status, 201, "upload failed: {}", upload.text);
        let mesh_id = upload.id();

        let files = app.get_as(&routes::mesh_files(&mesh_id), user).await;
        let file_id = files.body["original_files"][0]["id"]
            .as_str()
            .unwrap()
            .to_string();
        (mesh_id, file_id)
    }

    #[tokio::test]
    async fn download_streams_content_with_caching_headers() {
        let app = TestApp::spawn().await;
        let user = new_user();
        let (mesh_id, file_id) = upload_one(&app, &user, "download-me").await;

        let res = app
            .get_as(&routes::mesh_file(&mesh_id, &file_id), &user)
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(res.text, "o downloadable");
        assert!(res.headers.get("etag").is_some());
        let disposition = res.headers.get("content-disposition").unwrap();
        assert!(disposition.to_str().unwrap().contains("model.obj"));
    }

    #[tokio::test]
    async fn matching_etag_yields_not_modified() {
        let app = TestApp::spawn().await;
        let user = new_user();
        let (mesh_id, file_id) = upload_one(&app, &user, "cached").await;

        let first = app
            .get_as(&routes::mesh_file(&mesh_id, &file_id), &user)
            .await;
        let etag = first.headers.get("etag").unwrap().to_str().unwrap();

        let second = app
            .get_with_headers(
                &routes::mesh_file(&mesh_id, &file_id),
                &user,
                &[("If-None-Match", etag)],
            )
            .await;
        assert_eq!(second.status, 304);
    }

    #[tokio::test]
    async fn file_outside_the_mesh_is_not_found() {
        let app = TestApp::spawn().await;
        let user = new_user();
        let (mesh_a, _) = upload_one(&app, &user, "mesh-a").await;
        let (_, file_b) = upload_one(&app, &user, "mesh-b").await;

        // file_b belongs to mesh-b, so mesh-a must not serve it.
        let res = app.get_as(&routes::mesh_file(&mesh_a, &file_b), &user).await;
        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn non_owner_cannot_download() {
        let app = TestApp::spawn().await;
        let owner = new_user();
        let (mesh_id, file_id) = upload_one(&app, &owner, "owner-only").await;

        let res = app
            .get_as(&routes::mesh_file(&mesh_id, &file_id), &new_user())
            .await;
        assert_eq!(res.status, 403);
    }
}
