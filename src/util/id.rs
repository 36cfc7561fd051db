//! Short opaque identifiers for games and players

use rand::distributions::Alphanumeric;
use rand::Rng;

/// Length of generated ids
pub const SHORT_ID_LEN: usize = 9;

/// Generate a short random alphanumeric id, e.g. `"aZ3kP0qLm"`
pub fn short_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SHORT_ID_LEN)
        .map(char::from)
        .collect()
}
