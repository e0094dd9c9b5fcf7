//! Property-based tests for balance effects.

use proptest::prelude::*;
use rust_decimal::Decimal;

use kasir_shared::types::AccountId;

use crate::reversal::effect::BalanceEffect;

fn arb_amount() -> impl Strategy<Value = Decimal> {
    (-1_000_000i64..1_000_000i64).prop_map(|n| Decimal::new(n, 2))
}

fn arb_effect() -> impl Strategy<Value = BalanceEffect> {
    arb_amount().prop_map(|amount| BalanceEffect {
        debit_account: AccountId::new(),
        credit_account: AccountId::new(),
        amount,
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // An effect followed by its inverse leaves every account unchanged.
    #[test]
    fn prop_inverse_cancels_effect(effect in arb_effect()) {
        let inverse = effect.inverse();
        for account in [effect.debit_account, effect.credit_account] {
            prop_assert_eq!(effect.net_change(account) + inverse.net_change(account), Decimal::ZERO);
        }
    }

    // Every effect is balanced: what one account gains the other loses.
    #[test]
    fn prop_effect_is_balanced(effect in arb_effect()) {
        let total = effect.net_change(effect.debit_account) + effect.net_change(effect.credit_account);
        prop_assert_eq!(total, Decimal::ZERO);
    }

    // Inverting twice gives back the original effect.
    #[test]
    fn prop_double_inverse_is_identity(effect in arb_effect()) {
        prop_assert_eq!(effect.inverse().inverse(), effect);
    }
}
