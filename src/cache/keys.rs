//! Versioned cache key construction.
//!
//! Every key carries a generation prefix so a payload-shape change can be
//! rolled out by bumping [`CACHE_VERSION`]: old entries become unreachable
//! and expire on their own, no flush required.

use uuid::Uuid;

/// Current cache generation. Bump to soft-invalidate every existing entry.
pub const CACHE_VERSION: &str = "v1";

/// Key holding the rendered content bundle for a lesson.
pub fn lesson_content(lesson_id: Uuid) -> String {
    format!("{CACHE_VERSION}:lesson:{lesson_id}")
}

/// Key holding the completion flag for a (user, lesson) pair.
pub fn completion_flag(user_id: Uuid, lesson_id: Uuid) -> String {
    format!("{CACHE_VERSION}:user:{user_id}:lesson:{lesson_id}:completed")
}

/// Pattern matching the completion flags of every user for one lesson.
///
/// The leading wildcard spans cache generations, so deleting by this pattern
/// clears entries written before a version bump as well.
pub fn completion_flag_pattern(lesson_id: Uuid) -> String {
    format!("*:user:*:lesson:{lesson_id}:completed")
}

/// Key marking an access token as revoked until its natural expiry.
pub fn revoked_token(token: &str) -> String {
    format!("{CACHE_VERSION}:revoked:{token}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lesson_key_format_is_stable() {
        let id = Uuid::parse_str("5f0c9ecb-5a8a-4c3c-9a49-2f0d6f4f6a01").unwrap();
        assert_eq!(
            lesson_content(id),
            "v1:lesson:5f0c9ecb-5a8a-4c3c-9a49-2f0d6f4f6a01"
        );
    }

    #[test]
    fn completion_key_format_is_stable() {
        let user = Uuid::parse_str("11111111-2222-3333-4444-555555555555").unwrap();
        let lesson = Uuid::parse_str("aaaaaaaa-bbbb-cccc-dddd-eeeeeeeeeeee").unwrap();
        assert_eq!(
            completion_flag(user, lesson),
            "v1:user:11111111-2222-3333-4444-555555555555:lesson:aaaaaaaa-bbbb-cccc-dddd-eeeeeeeeeeee:completed"
        );
    }

    #[test]
    fn completion_pattern_spans_generations() {
        let lesson = Uuid::parse_str("aaaaaaaa-bbbb-cccc-dddd-eeeeeeeeeeee").unwrap();
        let pattern = completion_flag_pattern(lesson);
        assert_eq!(
            pattern,
            "*:user:*:lesson:aaaaaaaa-bbbb-cccc-dddd-eeeeeeeeeeee:completed"
        );
        assert!(pattern.starts_with('*'), "pattern must span version prefixes");
    }
}
