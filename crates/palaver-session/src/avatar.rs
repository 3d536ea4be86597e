use rand::Rng;

const AVATAR_BASE: &str = "https://i.pravatar.cc/200?img=";
const AVATAR_POOL: i32 = 70;

/// Deterministic fallback avatar for a username, used when the remote API
/// has none on record. Hashing runs over UTF-16 code units with wrapping
/// 32-bit arithmetic so existing accounts keep the avatars they have
/// always had.
pub fn avatar_for_username(username: &str) -> String {
    let mut hash: i32 = 0;
    for unit in username.encode_utf16() {
        hash = (unit as i32).wrapping_add(hash.wrapping_shl(5).wrapping_sub(hash));
    }
    let id = (hash % AVATAR_POOL).abs() + 1;
    format!("{AVATAR_BASE}{id}")
}

/// One-time random pick for the bot's avatar; the store persists it so the
/// bot keeps a stable face across sessions.
pub fn random_bot_avatar<R: Rng + ?Sized>(rng: &mut R) -> String {
    let id = rng.random_range(1..=AVATAR_POOL);
    format!("{AVATAR_BASE}{id}")
}
