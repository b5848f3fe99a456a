mod jwks;
mod validator;

pub mod model;

pub use jwks::JwksClient;
pub use model::{AuthenticatedUser, CompanyOperation};
pub use validator::JwtValidator;
