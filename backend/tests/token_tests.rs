//! Asset QR token tests
//!
//! - Property 8: Token Shape And Uniqueness

use proptest::prelude::*;
use shared::{generate_asset_token, model_fragment, TOKEN_RANDOM_HEX_LEN};
use std::collections::HashSet;

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_fragment_strips_punctuation_and_truncates() {
        assert_eq!(model_fragment("nb-dell-5420"), "NBDELL");
        assert_eq!(model_fragment("pc1"), "PC1");
    }

    #[test]
    fn test_fragment_falls_back_for_non_ascii() {
        assert_eq!(model_fragment("--"), "GEN");
        assert_eq!(model_fragment("โต๊ะ"), "GEN");
    }

    #[test]
    fn test_token_layout() {
        let token = generate_asset_token("INV", "proj-4k");
        assert!(token.starts_with("INV-PROJ4K-"));
        let random = token.rsplit('-').next().unwrap();
        assert_eq!(random.len(), TOKEN_RANDOM_HEX_LEN);
        assert!(random.chars().all(|c| c.is_ascii_hexdigit()));
    }
}

// ============================================================================
// Property Tests
// ============================================================================

fn prefix_strategy() -> impl Strategy<Value = String> {
    "[A-Z]{2,6}"
}

fn model_code_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 _.-]{0,20}"
}

#[cfg(test)]
mod property_tests {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Property 8: Token Shape
        /// Every token is `<prefix>-<fragment>-<hex>` with the model fragment embedded
        #[test]
        fn prop_token_carries_prefix_and_fragment(
            prefix in prefix_strategy(),
            model_code in model_code_strategy()
        ) {
            let token = generate_asset_token(&prefix, &model_code);
            let fragment = model_fragment(&model_code);
            let expected_head = format!("{}-{}-", prefix, fragment);

            prop_assert!(token.starts_with(&expected_head));
            prop_assert_eq!(token.len(), expected_head.len() + TOKEN_RANDOM_HEX_LEN);
            prop_assert!(fragment.len() <= 6);
            prop_assert!(fragment.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        }

        /// Property 8: Token Uniqueness
        /// A batch generated for one model has no repeated tokens
        #[test]
        fn prop_tokens_unique_within_batch(
            model_code in model_code_strategy(),
            count in 1usize..300
        ) {
            let tokens: HashSet<String> = (0..count)
                .map(|_| generate_asset_token("INV", &model_code))
                .collect();
            prop_assert_eq!(tokens.len(), count);
        }
    }
}
