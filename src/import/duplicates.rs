/// Whether `candidate` matches one of a user's existing track titles
///
/// Titles compare case-insensitively after trimming. This is a soft check:
/// two different songs that share a title also collide.
pub fn title_collides<'a>(existing: impl IntoIterator<Item = &'a str>, candidate: &str) -> bool {
    let candidate = normalize(candidate);
    existing
        .into_iter()
        .any(|title| normalize(title) == candidate)
}

fn normalize(title: &str) -> String {
    title.trim().to_lowercase()
}
