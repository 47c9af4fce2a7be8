use anyhow::{bail, Result};
use tracing::{debug, trace};

use crate::auth::password;

/// Returns the argon2 PHC string for `plain`.
pub fn hash_password(plain: &str) -> Result<String> {
    trace!("Entering hash_password command");
    if plain.is_empty() {
        bail!("Password must not be empty");
    }

    let hash = password::hash_password(plain)?;
    debug!("Password hashed");
    Ok(hash)
}
