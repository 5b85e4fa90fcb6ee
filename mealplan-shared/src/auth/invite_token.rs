/// Invite token generation
///
/// Invite links carry an opaque token: `inv_` followed by 32 random base62 characters
/// (36 chars total). The token is the primary key of `group_invites`; anyone holding it
/// can join the group until it expires or is voided.
///
/// # Example
///
/// ```
/// use mealplan_shared::auth::invite_token::{generate_invite_token, validate_invite_token_format};
///
/// let token = generate_invite_token();
/// assert!(token.starts_with("inv_"));
/// assert!(validate_invite_token_format(&token));
/// ```

use rand::Rng;

/// Length of the random part of the token (characters)
const TOKEN_RANDOM_LENGTH: usize = 32;

const TOKEN_PREFIX: &str = "inv_";

/// Total length of an invite token
pub const INVITE_TOKEN_LENGTH: usize = TOKEN_PREFIX.len() + TOKEN_RANDOM_LENGTH;

/// Generates a new random invite token
pub fn generate_invite_token() -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();

    let random_part: String = (0..TOKEN_RANDOM_LENGTH)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect();

    format!("{}{}", TOKEN_PREFIX, random_part)
}

/// Checks that a string looks like an invite token
///
/// Lets callers reject garbage before touching the database. A well-formed token may
/// still be unknown, expired or voided.
pub fn validate_invite_token_format(token: &str) -> bool {
    token.len() == INVITE_TOKEN_LENGTH
        && token.starts_with(TOKEN_PREFIX)
        && token[TOKEN_PREFIX.len()..]
            .chars()
            .all(|c| c.is_ascii_alphanumeric())
}
