use bytes::Bytes;
use http_body_util::BodyExt;

pub(crate) async fn to_bytes<B>(body: B) -> Bytes
where
    B: http_body::Body,
    B::Error: std::fmt::Debug,
{
    body.collect().await.unwrap().to_bytes()
}

pub(crate) async fn body_text<B>(body: B) -> String
where
    B: http_body::Body,
    B::Error: std::fmt::Debug,
{
    String::from_utf8(to_bytes(body).await.to_vec()).unwrap()
}

pub(crate) async fn json_body<B>(body: B) -> serde_json::Value
where
    B: http_body::Body,
    B::Error: std::fmt::Debug,
{
    serde_json::from_slice(&to_bytes(body).await).unwrap()
}
