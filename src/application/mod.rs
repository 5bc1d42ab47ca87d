pub mod use_cases;

pub use use_cases::auth::{AuthUseCase, LoginRequest, RegisterRequest};
pub use use_cases::datasets::DatasetUseCase;
