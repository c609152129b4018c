/// Body returned by `GET /abc`.
pub const GREETING: &str = ">>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>Hello World!";

/// Constant plain-text ping. `&'static str` responds with
/// `text/plain; charset=utf-8`.
pub async fn ping() -> &'static str {
    GREETING
}
