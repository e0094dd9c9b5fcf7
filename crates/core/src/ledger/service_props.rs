//! Property-based tests for the ledger service.
//!
//! Each case drives the service against a fresh in-memory store on a
//! current-thread runtime.

use proptest::prelude::*;
use rust_decimal::Decimal;

use kasir_shared::types::round_money;

use crate::ledger::{ItemUpdate, NewTransactionItem, TransactionStatus};
use crate::testing::Fixture;

#[derive(Debug, Clone)]
enum ItemOp {
    Add(NewTransactionItem),
    Update(usize, Decimal),
    Remove(usize),
}

fn arb_item() -> impl Strategy<Value = NewTransactionItem> {
    (1i64..100_000i64, 0i64..1_000_000i64, 0i64..=10_000i64).prop_map(|(q, p, t)| {
        NewTransactionItem {
            product: None,
            product_name: "Item".into(),
            quantity: Decimal::new(q, 3),
            unit_price: Decimal::new(p, 2),
            tax_rate: Decimal::new(t, 2),
        }
    })
}

fn arb_op() -> impl Strategy<Value = ItemOp> {
    prop_oneof![
        3 => arb_item().prop_map(ItemOp::Add),
        1 => (any::<usize>(), 1i64..10_000i64).prop_map(|(i, q)| ItemOp::Update(i, Decimal::new(q, 2))),
        1 => any::<usize>().prop_map(ItemOp::Remove),
    ]
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    // After every item mutation the total equals the rounded sum of item totals,
    // and the debit account balance follows it.
    #[test]
    fn prop_total_tracks_items(ops in prop::collection::vec(arb_op(), 1..12)) {
        runtime().block_on(async {
            let fx = Fixture::new();
            let cash = fx.cash_account().await;
            let sales = fx.sales_account().await;
            let service = fx.transactions();
            let txn = fx.post_fixed(cash.id, sales.id, Decimal::ZERO).await;
            let mut item_ids = Vec::new();

            for op in ops {
                match op {
                    ItemOp::Add(item) => {
                        let (item, _) = service.add_item(fx.actor, txn.id, item).await.unwrap();
                        item_ids.push(item.id());
                    }
                    ItemOp::Update(i, quantity) if !item_ids.is_empty() => {
                        let id = item_ids[i % item_ids.len()];
                        let update = ItemUpdate { quantity: Some(quantity), ..ItemUpdate::default() };
                        service.update_item(fx.actor, id, update).await.unwrap();
                    }
                    ItemOp::Remove(i) if !item_ids.is_empty() => {
                        let id = item_ids.remove(i % item_ids.len());
                        service.remove_item(fx.actor, id).await.unwrap();
                    }
                    _ => continue,
                }

                let stored = service.get_transaction(txn.id).await.unwrap();
                let items = service.list_items(txn.id).await.unwrap();
                let sum = round_money(items.iter().map(|i| i.total_price()).sum());
                prop_assert_eq!(stored.total_amount, sum);
                prop_assert_eq!(fx.balance(cash.id).await, stored.total_amount);
            }
            Ok(())
        })?;
    }

    // Voiding any number of times reverses the balance effect exactly once.
    #[test]
    fn prop_reversal_is_idempotent(
        cents in 0i64..10_000_000i64,
        repeats in 1usize..5,
    ) {
        runtime().block_on(async {
            let fx = Fixture::new();
            let cash = fx.cash_account().await;
            let sales = fx.sales_account().await;
            let service = fx.transactions();
            let txn = fx.post_fixed(cash.id, sales.id, Decimal::new(cents, 2)).await;

            for _ in 0..repeats {
                let voided = service
                    .change_status(fx.actor, txn.id, TransactionStatus::Voided)
                    .await
                    .unwrap();
                prop_assert!(voided.reversal_applied);
                prop_assert_eq!(fx.balance(cash.id).await, Decimal::ZERO);
                prop_assert_eq!(fx.balance(sales.id).await, Decimal::ZERO);
            }
            Ok(())
        })?;
    }
}
