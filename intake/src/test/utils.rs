use axum_test::TestServer;
use axum_test::multipart::Part;
use tempfile::TempDir;

use crate::{Application, Config};

pub const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR\x00\x00\x00\x01\x00\x00\x00\x01\x08\x06";
pub const GIF: &[u8] = b"GIF89a\x01\x00\x01\x00\x80\x00\x00\xff\xff\xff\x00\x00\x00";
pub const PDF: &[u8] = b"%PDF-1.7\n%\xe2\xe3\xcf\xd3\n1 0 obj\n<<>>\nendobj\n";

/// Config pointing at a fresh temporary upload directory.
pub fn create_test_config() -> (Config, TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config = Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        upload_dir: dir.path().join("uploads"),
        ..Config::default()
    };
    (config, dir)
}

pub async fn create_test_app(config: Config) -> TestServer {
    Application::new(config)
        .await
        .expect("Failed to create application")
        .into_test_server()
}

pub fn file_part(bytes: &'static [u8], file_name: &str) -> Part {
    Part::bytes(bytes).file_name(file_name.to_string())
}

/// Names of the files currently in `dir`, sorted.
pub fn stored_files(dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .expect("Failed to read upload dir")
        .map(|entry| entry.expect("Failed to read dir entry").file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
