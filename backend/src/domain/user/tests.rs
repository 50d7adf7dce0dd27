//! Tests for user contact records.

use super::*;
use rstest::rstest;

#[rstest]
#[case(None, None)]
#[case(Some(""), None)]
#[case(Some("   "), None)]
#[case(Some("token-1"), Some("token-1"))]
#[case(Some(" token-2 "), Some("token-2"))]
fn usable_push_token_filters_blank_values(
    #[case] stored: Option<&str>,
    #[case] expected: Option<&str>,
) {
    let contact = UserContact::new(UserId::random(), "mina", stored.map(str::to_owned));
    assert_eq!(contact.usable_push_token(), expected);
}
