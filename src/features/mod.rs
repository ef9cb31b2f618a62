//! Feature extraction shared by both scoring components.
//!
//! - **text** / **tfidf**: free text → L2-normalized TF-IDF vector
//! - **ratings**: rating map → summary statistics and raw values
//! - **scaler**: per-dimension standardization for batch clustering

pub mod ratings;
pub mod scaler;
pub mod text;
pub mod tfidf;

pub use ratings::RatingFeatures;
pub use scaler::StandardScaler;
pub use tfidf::TfidfVectorizer;
