//! Gemini REST bindings for the stylist, try-on compositing and video jobs.

/// Adds a `with_base_url` builder to a client wrapping a `GeminiHttpClient`
/// in a field named `http`.
macro_rules! impl_with_gemini_base_url {
    ($client:ty) => {
        impl $client {
            pub fn with_base_url(mut self, base_url: String) -> Self {
                self.http = self.http.with_base_url(base_url);
                self
            }
        }
    };
}
pub(crate) use impl_with_gemini_base_url;

pub mod chat;
pub mod client;
pub mod image;
pub mod types;
pub mod video;

#[cfg(test)]
pub(crate) mod test_support;

pub use chat::GeminiStylistClient;
pub use image::GeminiCompositeClient;
pub use video::GeminiVideoClient;
