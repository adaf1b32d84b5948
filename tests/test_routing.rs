use std::fs;

use switchyard::config::StaticFilesConfig;
use switchyard::http::request::{Method, Request, RequestBuilder};
use switchyard::http::response::StatusCode;
use switchyard::routing::{Handler, HandlerError, Router, StaticFiles};

fn get(path: &str) -> Request {
    RequestBuilder::new()
        .method(Method::GET)
        .path(path)
        .build()
        .unwrap()
}

fn site() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("index.html"), "home").unwrap();
    fs::write(dir.path().join("hello.txt"), "hello there").unwrap();
    fs::create_dir(dir.path().join("docs")).unwrap();
    fs::write(dir.path().join("docs").join("index.html"), "docs home").unwrap();
    dir
}

#[test]
fn test_static_files_serves_file() {
    let dir = site();
    let files = StaticFiles::new("site", dir.path());

    let response = files.handle(&get("/site/hello.txt")).unwrap();
    assert_eq!(response.status, StatusCode::Ok);
    assert_eq!(response.body, b"hello there");
}

#[test]
fn test_static_files_directory_serves_index() {
    let dir = site();
    let files = StaticFiles::new("site", dir.path());

    assert_eq!(files.handle(&get("/site")).unwrap().body, b"home");
    assert_eq!(files.handle(&get("/site/")).unwrap().body, b"home");
    assert_eq!(files.handle(&get("/site/docs")).unwrap().body, b"docs home");
}

#[test]
fn test_static_files_missing_is_not_found() {
    let dir = site();
    let files = StaticFiles::new("site", dir.path());

    let err = files.handle(&get("/site/nope.txt")).unwrap_err();
    assert!(matches!(err, HandlerError::NotFound(_)));
}

#[test]
fn test_static_files_refuses_parent_segments() {
    let dir = site();
    let inner = dir.path().join("docs");
    let files = StaticFiles::new("site", &inner);

    let err = files.handle(&get("/site/../hello.txt")).unwrap_err();
    assert!(matches!(err, HandlerError::NotFound(_)));
}

#[test]
fn test_static_files_requires_exact_mount_segment() {
    let dir = site();
    let files = StaticFiles::new("site", dir.path());

    let err = files.handle(&get("/sitex/hello.txt")).unwrap_err();
    assert!(matches!(err, HandlerError::NotFound(_)));
}

#[test]
fn test_router_from_config() {
    let dir = site();
    let router = Router::from_config(&StaticFilesConfig {
        mount: "app".into(),
        root: dir.path().to_path_buf(),
    });

    let ok = router.respond(&get("/app/hello.txt"));
    assert_eq!(ok.status, StatusCode::Ok);
    assert_eq!(ok.body, b"hello there");

    assert_eq!(
        router.respond(&get("/app/missing")).status,
        StatusCode::NotFound
    );
    assert_eq!(
        router.respond(&get("/other/hello.txt")).status,
        StatusCode::NotFound
    );
    assert_eq!(
        router.respond(&get("/app/hello.txt?v=1")).status,
        StatusCode::BadRequest
    );
}

#[test]
fn test_router_later_mount_replaces_earlier() {
    let router = Router::new()
        .route("x", |_: &Request| -> Result<_, HandlerError> {
            Ok(switchyard::http::response::Response::ok("first"))
        })
        .route("x", |_: &Request| -> Result<_, HandlerError> {
            Ok(switchyard::http::response::Response::ok("second"))
        });

    assert_eq!(router.respond(&get("/x")).body, b"second");
}

#[test]
fn test_router_io_failure_is_500() {
    let router = Router::new().route("io", |_: &Request| -> Result<_, HandlerError> {
        Err(std::io::Error::other("disk on fire").into())
    });

    assert_eq!(
        router.respond(&get("/io")).status,
        StatusCode::InternalServerError
    );
}
