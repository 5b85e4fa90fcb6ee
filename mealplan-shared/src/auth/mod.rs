/// Authentication and authorization utilities
///
/// # Modules
///
/// - [`jwt`]: JWT token generation and validation
/// - [`middleware`]: Caller authentication (`Authenticator`, `AuthContext`)
/// - [`authorization`]: Group-scoped role resolution and permission checks
/// - [`invite_token`]: Invite link token generation
///
/// # Example
///
/// ```
/// use mealplan_shared::auth::jwt::{create_token, Claims, TokenType};
/// use mealplan_shared::auth::middleware::{Authenticator, JwtAuthenticator};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let secret = "a-secret-of-at-least-thirty-two-bytes";
/// let user_id = Uuid::new_v4();
/// let token = create_token(&Claims::new(user_id, TokenType::Access), secret)?;
///
/// let authenticator = JwtAuthenticator::new(secret);
/// assert_eq!(authenticator.resolve_caller(&token)?, user_id);
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod invite_token;
pub mod jwt;
pub mod middleware;
