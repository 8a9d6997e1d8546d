use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockBuilder};

pub const GENERATE_CONTENT_PATH_REGEX: &str = r"^/v1beta/models/[^/]+:generateContent$";
pub const PREDICT_LONG_RUNNING_PATH_REGEX: &str = r"^/v1beta/models/[^/]+:predictLongRunning$";
pub const OPERATION_PATH_REGEX: &str = r"^/v1beta/models/[^/]+/operations/[^/]+$";

pub fn post_path_regex(regex: &str) -> MockBuilder {
    Mock::given(method("POST")).and(path_regex(regex))
}

pub fn get_path_regex(regex: &str) -> MockBuilder {
    Mock::given(method("GET")).and(path_regex(regex))
}
