//! Unread badge display rules.

/// Counts above this render as `"99+"`.
pub const BADGE_CAP: i64 = 99;

/// Label for the unread badge, or `None` when it should be hidden.
pub fn badge_label(unread: i64) -> Option<String> {
    match unread {
        n if n <= 0 => None,
        n if n > BADGE_CAP => Some(format!("{BADGE_CAP}+")),
        n => Some(n.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_hidden() {
        assert_eq!(badge_label(0), None);
    }

    #[test]
    fn small_counts_render_verbatim() {
        assert_eq!(badge_label(1).as_deref(), Some("1"));
        assert_eq!(badge_label(99).as_deref(), Some("99"));
    }

    #[test]
    fn large_counts_are_capped() {
        assert_eq!(badge_label(100).as_deref(), Some("99+"));
    }
}
