/// Length of every protocol-wide ranked list.
pub const RANKED_LIMIT: usize = 10;

/// Fold `next` into `acc`, keeping the `limit` items with the greatest key.
///
/// The sort is stable, so among equal keys items folded earlier stay ahead.
pub fn fold_top<T, K: Ord>(acc: &mut Vec<T>, next: impl IntoIterator<Item = T>, limit: usize, key: impl Fn(&T) -> K) {
    acc.extend(next);
    acc.sort_by(|a, b| key(b).cmp(&key(a)));
    acc.truncate(limit);
}
