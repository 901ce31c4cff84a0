pub mod extractors;
pub mod jwt;
pub mod password;

pub use extractors::{AdminUser, CurrentUser};
pub use jwt::{Claims, TokenIssuer};
pub use password::{hash_password, verify_password};
