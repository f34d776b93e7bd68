//! Authentication and authorization for Lectern
//!
//! Provides:
//! - JWT token generation and validation
//! - Password hashing with Argon2
//! - Account roles for operation authorization

pub mod jwt;
pub mod password;
pub mod roles;

pub use jwt::{extract_token_from_header, Claims, JwtValidator, TokenInput, TokenValidationResult};
pub use password::{hash_password, verify_password};
pub use roles::Role;
