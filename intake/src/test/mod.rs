pub mod utils;

use axum::http::StatusCode;
use axum_test::multipart::{MultipartForm, Part};
use serde_json::json;

use crate::api::models::slugs::SlugResponse;
use crate::json::Envelope;
use crate::naming::STORED_NAME_LEN;
use crate::upload::UploadedFile;
use utils::{GIF, PDF, PNG, create_test_app, create_test_config, file_part, stored_files};

#[test_log::test(tokio::test)]
async fn test_healthz() {
    let (config, _dir) = create_test_config();
    let server = create_test_app(config).await;

    let response = server.get("/healthz").await;
    response.assert_status(StatusCode::OK);
    assert_eq!(response.text(), "OK");
}

#[test_log::test(tokio::test)]
async fn test_upload_single_allowed_file() {
    let (mut config, _dir) = create_test_config();
    config.uploads.allowed_content_types = vec!["image/png".to_string()];
    let upload_dir = config.upload_dir.clone();
    let server = create_test_app(config).await;

    let response = server
        .post("/files")
        .multipart(MultipartForm::new().add_part("file", file_part(PNG, "img.png")))
        .await;

    response.assert_status(StatusCode::CREATED);
    let stored: Vec<UploadedFile> = response.json();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].original_name, "img.png");
    assert_eq!(stored[0].size_bytes, PNG.len() as u64);
    assert_eq!(stored[0].stored_name.len(), STORED_NAME_LEN + ".png".len());
    assert_eq!(std::fs::read(upload_dir.join(&stored[0].stored_name)).unwrap(), PNG);
}

#[test_log::test(tokio::test)]
async fn test_upload_keeps_original_name_without_directories() {
    let (mut config, _dir) = create_test_config();
    config.uploads.rename_on_store = false;
    let upload_dir = config.upload_dir.clone();
    let server = create_test_app(config).await;

    let response = server
        .post("/files")
        .multipart(MultipartForm::new().add_part("file", file_part(PDF, "../../etc/report.pdf")))
        .await;

    response.assert_status(StatusCode::CREATED);
    let stored: Vec<UploadedFile> = response.json();
    assert_eq!(stored[0].stored_name, "report.pdf");
    assert_eq!(stored[0].original_name, stored[0].stored_name);
    assert_eq!(stored_files(&upload_dir), ["report.pdf"]);
}

#[test_log::test(tokio::test)]
async fn test_upload_rejects_sniffed_type_outside_allow_list() {
    let (mut config, _dir) = create_test_config();
    config.uploads.allowed_content_types = vec!["image/jpeg".to_string(), "image/png".to_string()];
    let upload_dir = config.upload_dir.clone();
    let server = create_test_app(config).await;

    // The declared part type is ignored, only the bytes count
    let part = Part::bytes(GIF).file_name("fake.png").mime_type("image/png");
    let response = server
        .post("/files")
        .multipart(MultipartForm::new().add_part("file", part))
        .await;

    response.assert_status(StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let envelope: Envelope = response.json();
    assert!(envelope.error);
    assert_eq!(envelope.message, "the uploaded file type image/gif is not permitted");
    assert!(stored_files(&upload_dir).is_empty());
}

#[test_log::test(tokio::test)]
async fn test_upload_multiple_files_in_order() {
    let (config, _dir) = create_test_config();
    let upload_dir = config.upload_dir.clone();
    let server = create_test_app(config).await;

    let response = server
        .post("/files")
        .multipart(
            MultipartForm::new()
                .add_text("purpose", "gallery")
                .add_part("file", file_part(PNG, "first.png"))
                .add_part("file", file_part(GIF, "second.gif")),
        )
        .await;

    response.assert_status(StatusCode::CREATED);
    let stored: Vec<UploadedFile> = response.json();
    let originals: Vec<_> = stored.iter().map(|f| f.original_name.as_str()).collect();
    assert_eq!(originals, ["first.png", "second.gif"]);
    assert_ne!(stored[0].stored_name, stored[1].stored_name);
    assert_eq!(stored_files(&upload_dir).len(), 2);
}

#[test_log::test(tokio::test)]
async fn test_upload_failure_reports_files_already_stored() {
    let (mut config, _dir) = create_test_config();
    config.uploads.allowed_content_types = vec!["image/png".to_string()];
    let upload_dir = config.upload_dir.clone();
    let server = create_test_app(config).await;

    let response = server
        .post("/files")
        .multipart(
            MultipartForm::new()
                .add_part("file", file_part(PNG, "ok.png"))
                .add_part("file", file_part(GIF, "bad.gif")),
        )
        .await;

    response.assert_status(StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let envelope: Envelope = response.json();
    assert!(envelope.error);
    let stored: Vec<UploadedFile> = serde_json::from_value(envelope.data.expect("stored records")).unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].original_name, "ok.png");
    assert_eq!(stored_files(&upload_dir), [stored[0].stored_name.clone()]);
}

#[test_log::test(tokio::test)]
async fn test_upload_too_large_writes_nothing() {
    let (mut config, _dir) = create_test_config();
    config.uploads.max_total_bytes = 1024;
    let upload_dir = config.upload_dir.clone();
    let server = create_test_app(config).await;

    let big: &'static [u8] = Box::leak(vec![b'a'; 4096].into_boxed_slice());
    let response = server
        .post("/files")
        .multipart(
            MultipartForm::new()
                .add_part("file", file_part(PNG, "small.png"))
                .add_part("file", file_part(big, "big.txt")),
        )
        .await;

    response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
    let envelope: Envelope = response.json();
    assert_eq!(envelope.message, "the uploaded file is too big (limit 1024 bytes)");
    // The form is read completely before anything is written
    assert!(stored_files(&upload_dir).is_empty());
}

#[test_log::test(tokio::test)]
async fn test_upload_one() {
    let (config, _dir) = create_test_config();
    let server = create_test_app(config).await;

    let response = server
        .post("/files/one")
        .multipart(MultipartForm::new().add_part("file", file_part(b"just some notes\n", "notes.txt")))
        .await;

    response.assert_status(StatusCode::CREATED);
    let stored: UploadedFile = response.json();
    assert_eq!(stored.original_name, "notes.txt");
    assert_eq!(stored.size_bytes, 16);
}

#[test_log::test(tokio::test)]
async fn test_upload_one_without_file() {
    let (config, _dir) = create_test_config();
    let server = create_test_app(config).await;

    let response = server
        .post("/files/one")
        .multipart(MultipartForm::new().add_text("purpose", "nothing attached"))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let envelope: Envelope = response.json();
    assert!(envelope.error);
    assert_eq!(envelope.message, "no file was provided");
}

#[test_log::test(tokio::test)]
async fn test_download_stored_file() {
    let (config, _dir) = create_test_config();
    let server = create_test_app(config).await;

    let upload = server
        .post("/files/one")
        .multipart(MultipartForm::new().add_part("file", file_part(PDF, "report.pdf")))
        .await;
    upload.assert_status(StatusCode::CREATED);
    let stored: UploadedFile = upload.json();

    let response = server.get(&format!("/files/{}", stored.stored_name)).await;

    response.assert_status(StatusCode::OK);
    assert_eq!(
        response.header("content-disposition"),
        format!("attachment; filename=\"{}\"", stored.stored_name).as_str()
    );
    assert_eq!(response.as_bytes().as_ref(), PDF);
}

#[test_log::test(tokio::test)]
async fn test_download_rejects_paths() {
    let (config, _dir) = create_test_config();
    let server = create_test_app(config).await;

    let response = server.get("/files/..%2Fconfig.yaml").await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = server.get("/files/missing.txt").await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[test_log::test(tokio::test)]
async fn test_slug_from_strict_json() {
    let (config, _dir) = create_test_config();
    let server = create_test_app(config).await;

    let response = server.post("/slugs").json(&json!({"text": "Now is the time!"})).await;

    response.assert_status(StatusCode::OK);
    let slug: SlugResponse = response.json();
    assert_eq!(slug.slug, "now-is-the-time");
}

#[test_log::test(tokio::test)]
async fn test_slug_rejects_bad_bodies() {
    let (config, _dir) = create_test_config();
    let server = create_test_app(config).await;

    let cases = [
        (r#"{"text":"a","extra":1}"#, r#"body contains unknown key "extra""#),
        ("", "body must not be empty"),
        (r#"{"text":1}"#, r#"body contains incorrect JSON type for field "text""#),
        (r#"{"text":"a"}{"text":"b"}"#, "body must contain only one JSON value"),
        (r#"{"text":"!!!"}"#, "after removing characters, slug is zero length"),
    ];

    for (body, message) in cases {
        let response = server.post("/slugs").text(body).await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let envelope: Envelope = response.json();
        assert!(envelope.error, "body: {body}");
        assert_eq!(envelope.message, message, "body: {body}");
    }
}

#[test_log::test(tokio::test)]
async fn test_slug_body_limit_and_lenient_policy() {
    let (mut config, _dir) = create_test_config();
    config.json.max_body_bytes = 32;
    config.json.allow_unknown_fields = true;
    let server = create_test_app(config).await;

    let response = server.post("/slugs").json(&json!({"text": "ok", "extra": true})).await;
    response.assert_status(StatusCode::OK);

    let response = server
        .post("/slugs")
        .json(&json!({"text": "this body is definitely longer than thirty-two bytes"}))
        .await;
    response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
    let envelope: Envelope = response.json();
    assert_eq!(envelope.message, "body must not be larger than 32 bytes");
}
