//! Golden query vectors must render byte-for-byte as pinned.

use pkgsync_testkit::vectors::{all_vectors, verify_all_vectors};

#[test]
fn test_golden_query_vectors() {
    for (name, passed, rendered) in verify_all_vectors() {
        assert!(passed, "vector {:?} rendered as {}", name, rendered);
    }
}

#[test]
fn test_golden_templates() {
    for vector in all_vectors() {
        assert_eq!(vector.query.template(), vector.expected_template, "{}", vector.name);
        assert_eq!(vector.query.to_string(), vector.expected_text, "{}", vector.name);
    }
}
