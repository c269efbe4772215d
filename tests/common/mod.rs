#![allow(dead_code)]

use bytes::Bytes;
use http::{header, Method, Request, Response};
use routeway::ErrorBody;
use serde_json::Value;

pub fn request(method: Method, uri: &str) -> Request<Bytes> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Bytes::new())
        .unwrap()
}

pub fn json_request(method: Method, uri: &str, body: &Value) -> Request<Bytes> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Bytes::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

/// Decodes the first JSON document of the body.
pub fn body_json(res: &Response<Bytes>) -> Value {
    let mut stream = serde_json::Deserializer::from_slice(res.body()).into_iter::<Value>();
    stream.next().expect("empty body").expect("invalid json")
}

pub fn error_message(res: &Response<Bytes>) -> String {
    serde_json::from_value::<ErrorBody>(body_json(res)).unwrap().error
}

/// Builds a multipart/form-data body from (field, filename, declared type, bytes).
pub fn multipart_body(boundary: &str, parts: &[(&str, &str, &str, &[u8])]) -> Bytes {
    let mut body = Vec::new();
    for (field, filename, content_type, data) in parts {
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n")
                .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    Bytes::from(body)
}

pub fn multipart_request(uri: &str, parts: &[(&str, &str, &str, &[u8])]) -> Request<Bytes> {
    let boundary = "X-ROUTEWAY-BOUNDARY";
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(multipart_body(boundary, parts))
        .unwrap()
}
