use std::net::SocketAddr;
use std::sync::Arc;

use common::UserId;
use common::storage::filesystem::FilesystemBlobStore;
use reqwest::Client;
use serde_json::Value;
use tempfile::TempDir;

use server::catalog::MemoryCatalog;
use server::config::{AppConfig, CorsConfig, GcConfig, ServerConfig, StorageConfig};
use server::service::MeshService;
use server::state::AppState;

pub mod routes {
    pub const MESHES: &str = "/api/v1/meshes";

    pub fn mesh(id: &str) -> String {
        format!("/api/v1/meshes/{id}")
    }

    pub fn mesh_state(id: &str) -> String {
        format!("/api/v1/meshes/{id}/state")
    }

    pub fn mesh_files(id: &str) -> String {
        format!("/api/v1/meshes/{id}/files")
    }

    pub fn mesh_file(id: &str, file_id: &str) -> String {
        format!("/api/v1/meshes/{id}/files/{file_id}")
    }
}

pub struct TestApp {
    addr: SocketAddr,
    client: Client,
    /// Keeps the blob store directory alive for the test's duration.
    _store_dir: TempDir,
}

pub struct TestResponse {
    pub status: u16,
    pub headers: reqwest::header::HeaderMap,
    pub body: Value,
    pub text: String,
}

impl TestResponse {
    async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let headers = res.headers().clone();
        let text = res.text().await.expect("Failed to read response body");
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);
        Self {
            status,
            headers,
            body,
            text,
        }
    }

    /// The `id` field of the response body.
    pub fn id(&self) -> String {
        self.body["id"]
            .as_str()
            .expect("Response should contain an id")
            .to_string()
    }

    /// The `code` field of an error body.
    pub fn error_code(&self) -> &str {
        self.body["code"]
            .as_str()
            .expect("Response should contain an error code")
    }
}

/// A fresh user identity for one test.
pub fn new_user() -> String {
    UserId::generate().to_string()
}

impl TestApp {
    pub async fn spawn() -> Self {
        let store_dir = TempDir::new().expect("Failed to create blob store directory");

        let config = Arc::new(AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors: CorsConfig {
                    allow_origins: vec![],
                    max_age: 3600,
                },
            },
            storage: StorageConfig {
                root: store_dir.path().to_string_lossy().into_owned(),
                max_blob_size: 64 * 1024 * 1024,
            },
            gc: GcConfig {
                grace_seconds: 3600,
                interval_seconds: 0,
            },
        });

        let store = Arc::new(
            FilesystemBlobStore::new(store_dir.path().to_path_buf(), config.storage.max_blob_size)
                .await
                .expect("Failed to create blob store"),
        );
        let catalog = Arc::new(MemoryCatalog::new());
        let state = AppState {
            config,
            service: MeshService::new(store, catalog),
        };

        let app = server::build_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            client: Client::new(),
            _store_dir: store_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Upload a mesh as `user`: metadata fields plus one part per file.
    pub async fn upload_mesh(
        &self,
        user: &str,
        name: &str,
        files: &[(&str, &[u8])],
    ) -> TestResponse {
        let mut form = reqwest::multipart::Form::new()
            .text("name", name.to_string())
            .text("short_desc", format!("{name} (short)"))
            .text("long_desc", format!("{name} (long)"));
        for (filename, bytes) in files {
            let part =
                reqwest::multipart::Part::bytes(bytes.to_vec()).file_name(filename.to_string());
            form = form.part("file", part);
        }

        let res = self
            .client
            .post(self.url(routes::MESHES))
            .header("X-User-Id", user)
            .multipart(form)
            .send()
            .await
            .expect("Failed to send multipart upload request");

        TestResponse::from_response(res).await
    }

    /// Upload files with no `name` field.
    pub async fn upload_mesh_without_name(&self, user: &str, files: &[(&str, &[u8])]) -> TestResponse {
        let mut form = reqwest::multipart::Form::new();
        for (filename, bytes) in files {
            let part =
                reqwest::multipart::Part::bytes(bytes.to_vec()).file_name(filename.to_string());
            form = form.part("file", part);
        }

        let res = self
            .client
            .post(self.url(routes::MESHES))
            .header("X-User-Id", user)
            .multipart(form)
            .send()
            .await
            .expect("Failed to send multipart upload request");

        TestResponse::from_response(res).await
    }

    pub async fn get_as(&self, path: &str, user: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .header("X-User-Id", user)
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn get_anonymous(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn get_with_headers(
        &self,
        path: &str,
        user: &str,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let mut req = self.client.get(self.url(path)).header("X-User-Id", user);
        for (key, value) in headers {
            req = req.header(*key, *value);
        }
        let res = req.send().await.expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn patch_as(&self, path: &str, body: &Value, user: &str) -> TestResponse {
        let res = self
            .client
            .patch(self.url(path))
            .header("X-User-Id", user)
            .json(body)
            .send()
            .await
            .expect("Failed to send PATCH request");

        TestResponse::from_response(res).await
    }

    pub async fn put_as(&self, path: &str, body: &Value, user: &str) -> TestResponse {
        let res = self
            .client
            .put(self.url(path))
            .header("X-User-Id", user)
            .json(body)
            .send()
            .await
            .expect("Failed to send PUT request");

        TestResponse::from_response(res).await
    }

    pub async fn delete_as(&self, path: &str, user: &str) -> TestResponse {
        let res = self
            .client
            .delete(self.url(path))
            .header("X-User-Id", user)
            .send()
            .await
            .expect("Failed to send DELETE request");

        TestResponse::from_response(res).await
    }

    /// Upload a single-file mesh and return its mesh ID.
    pub async fn create_mesh(&self, user: &str, name: &str) -> String {
        let res = self
            .upload_mesh(user, name, &[("model.obj", b"o model")])
            .await;
        assert_eq!(res.status, 201, "create_mesh failed: {}", res.text);
        res.id()
    }
}
